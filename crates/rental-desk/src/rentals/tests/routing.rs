use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::rentals::domain::RentalStatus;
use crate::rentals::lifecycle::LifecycleError;
use crate::rentals::repository::RepositoryError;
use crate::rentals::router::{error_response, rental_router};
use crate::rentals::verification::VerificationOutcome;

fn router_for(service: TestService) -> Router {
    rental_router(Arc::new(service))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn submit_route_creates_pending_request() {
    let (service, _, _) = build_service();
    let payload = serde_json::to_value(submission()).expect("submission serializes");

    let response = router_for(service)
        .oneshot(json_request("POST", "/api/v1/rentals", payload))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["paymentStatus"], "pending");
    assert_eq!(body["rentalTerms"]["totalAmount"], 2500);
    assert_eq!(body["documents"]["nationalId"]["manuallyVerified"], false);
    assert_eq!(body["customerDetails"]["pincode"], "560034");
}

#[tokio::test]
async fn approval_without_documents_is_a_conflict() {
    let (service, _, _) = build_service();
    let record = request_in(&service, RentalStatus::DocumentVerification);
    let uri = format!("/api/v1/rentals/{}/status", record.id);

    let response = router_for(service)
        .oneshot(json_request("POST", &uri, json!({ "status": "approved" })))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["retryable"], false);
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("documents not verified")));
}

#[tokio::test]
async fn document_approval_route_accepts_missing_body() {
    let (service, repository, _) = build_service();
    let record = service.submit(submission()).expect("submitted");
    let uri = format!("/api/v1/rentals/{}/documents/tax_id/approve", record.id);

    let response = router_for(service)
        .oneshot(empty_request("POST", &uri))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(repository.stored(&record.id).documents.tax_id.manually_verified);
}

#[tokio::test]
async fn verify_route_reports_unavailable_as_retryable() {
    let (service, repository, _) =
        build_service_with(StubVerifier::returning(VerificationOutcome::unavailable()));
    let record = service.submit(submission()).expect("submitted");
    let uri = format!("/api/v1/rentals/{}/documents/national_id/verify", record.id);

    let response = router_for(service)
        .oneshot(empty_request("POST", &uri))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(body["isValid"], false);
    assert_eq!(body["retryable"], true);
    assert!(!repository.stored(&record.id).documents.national_id.manually_verified);
}

#[tokio::test]
async fn verify_route_reports_rejection_as_unprocessable() {
    let (service, _, _) =
        build_service_with(StubVerifier::returning(VerificationOutcome::rejected("no record")));
    let record = service.submit(submission()).expect("submitted");
    let uri = format!("/api/v1/rentals/{}/documents/tax_id/verify", record.id);

    let response = router_for(service)
        .oneshot(empty_request("POST", &uri))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "no record");
}

#[tokio::test]
async fn list_route_filters_by_status() {
    let (service, _, _) = build_service();
    request_in(&service, RentalStatus::Pending);
    let cancelled = request_in(&service, RentalStatus::Cancelled);

    let response = router_for(service)
        .oneshot(empty_request("GET", "/api/v1/rentals?status=cancelled"))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let items = body.as_array().expect("array body");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], cancelled.id.0);
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let (service, _, _) = build_service();

    let response = router_for(service)
        .oneshot(empty_request("GET", "/api/v1/rentals/rent-404"))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_route_reports_counts() {
    let (service, _, _) = build_service();
    request_in(&service, RentalStatus::Pending);

    let response = router_for(service)
        .oneshot(empty_request("GET", "/api/v1/rentals/summary"))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["byStatus"]["pending"], 1);
}

#[tokio::test]
async fn persistence_errors_map_to_service_unavailable() {
    let response = error_response(LifecycleError::from(RepositoryError::Unavailable(
        "store offline".to_string(),
    )));

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn cheque_route_sets_gate_flag() {
    let (service, _, _) = build_service();
    let record = request_in(&service, RentalStatus::Pending);
    let uri = format!("/api/v1/rentals/{}/cheque", record.id);

    let response = router_for(service)
        .oneshot(json_request("PUT", &uri, json!({ "submitted": true })))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["documents"]["chequeSubmitted"], true);
}

#[tokio::test]
async fn terms_route_refuses_revision_after_approval() {
    let (service, _, _) = build_service();
    let record = request_in(&service, RentalStatus::Approved);
    let uri = format!("/api/v1/rentals/{}/terms", record.id);

    let response = router_for(service)
        .oneshot(json_request("PUT", &uri, json!({ "rentAmount": 900 })))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["retryable"], false);
}
