use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CustomerDetails, DocumentKind, PaymentStatus, RentalRequestId, RentalStatus, RentalSubmission,
    TermsRevision,
};
use super::lifecycle::LifecycleError;
use super::repository::RentalRepository;
use super::service::RentalLifecycleService;
use super::verification::VerificationClient;

type SharedService<R, V> = Arc<RentalLifecycleService<R, V>>;

/// Router builder exposing the admin commands as JSON endpoints.
pub fn rental_router<R, V>(service: SharedService<R, V>) -> Router
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    Router::new()
        .route(
            "/api/v1/rentals",
            get(list_handler::<R, V>).post(submit_handler::<R, V>),
        )
        .route("/api/v1/rentals/summary", get(summary_handler::<R, V>))
        .route("/api/v1/rentals/:rental_id", get(get_handler::<R, V>))
        .route(
            "/api/v1/rentals/:rental_id/status",
            post(status_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/payment",
            post(payment_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/documents/:kind/approve",
            post(approve_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/documents/:kind/reject",
            post(reject_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/documents/:kind/verify",
            post(verify_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/cheque",
            put(cheque_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/terms",
            put(terms_handler::<R, V>),
        )
        .route(
            "/api/v1/rentals/:rental_id/customer",
            put(customer_handler::<R, V>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    status: Option<RentalStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusCommand {
    status: RentalStatus,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentCommand {
    payment_status: PaymentStatus,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NoteCommand {
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChequeCommand {
    submitted: bool,
}

/// Status code and JSON body for a lifecycle failure.
///
/// Semantic refusals and retryable failures get different codes so a client can
/// tell "not allowed" from "try again".
pub(crate) fn error_response(error: LifecycleError) -> Response {
    let status = match &error {
        LifecycleError::NotFound => StatusCode::NOT_FOUND,
        LifecycleError::InvalidTerms(_)
        | LifecycleError::InvalidDocumentFormat(_)
        | LifecycleError::IncompleteSubmission { .. }
        | LifecycleError::VerificationRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LifecycleError::DocumentsNotVerified { .. }
        | LifecycleError::InvalidTransition { .. }
        | LifecycleError::InvalidPaymentTransition { .. }
        | LifecycleError::RefundNotEligible { .. }
        | LifecycleError::TermsLocked { .. } => StatusCode::CONFLICT,
        LifecycleError::VerificationUnavailable { .. } | LifecycleError::PersistenceError(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    let payload = json!({
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, LifecycleError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    respond(StatusCode::OK, service.list(query.status))
}

pub(crate) async fn submit_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Json(submission): Json<RentalSubmission>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    respond(StatusCode::CREATED, service.submit(submission))
}

pub(crate) async fn summary_handler<R, V>(State(service): State<SharedService<R, V>>) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    respond(StatusCode::OK, service.summary())
}

pub(crate) async fn get_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path(rental_id): Path<String>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    respond(StatusCode::OK, service.get(&RentalRequestId(rental_id)))
}

pub(crate) async fn status_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path(rental_id): Path<String>,
    Json(command): Json<StatusCommand>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let id = RentalRequestId(rental_id);
    respond(
        StatusCode::OK,
        service.transition_status(&id, command.status, command.note.as_deref()),
    )
}

pub(crate) async fn payment_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path(rental_id): Path<String>,
    Json(command): Json<PaymentCommand>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let id = RentalRequestId(rental_id);
    respond(
        StatusCode::OK,
        service.record_payment_event(&id, command.payment_status, command.note.as_deref()),
    )
}

pub(crate) async fn approve_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path((rental_id, kind)): Path<(String, DocumentKind)>,
    command: Option<Json<NoteCommand>>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let Json(command) = command.unwrap_or_default();
    let id = RentalRequestId(rental_id);
    respond(
        StatusCode::OK,
        service.approve_document(&id, kind, command.note.as_deref()),
    )
}

pub(crate) async fn reject_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path((rental_id, kind)): Path<(String, DocumentKind)>,
    command: Option<Json<NoteCommand>>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let Json(command) = command.unwrap_or_default();
    let id = RentalRequestId(rental_id);
    respond(
        StatusCode::OK,
        service.reject_document(&id, kind, command.note.as_deref()),
    )
}

pub(crate) async fn verify_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path((rental_id, kind)): Path<(String, DocumentKind)>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let id = RentalRequestId(rental_id);
    match service.run_automated_verification(&id, kind).await {
        Ok(outcome) => {
            let status = match LifecycleError::from_outcome(kind, &outcome) {
                None => StatusCode::OK,
                Some(LifecycleError::VerificationUnavailable { .. }) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, Json(outcome)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cheque_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path(rental_id): Path<String>,
    Json(command): Json<ChequeCommand>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let id = RentalRequestId(rental_id);
    respond(
        StatusCode::OK,
        service.set_cheque_submitted(&id, command.submitted),
    )
}

pub(crate) async fn terms_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path(rental_id): Path<String>,
    Json(revision): Json<TermsRevision>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let id = RentalRequestId(rental_id);
    respond(StatusCode::OK, service.revise_terms(&id, &revision))
}

pub(crate) async fn customer_handler<R, V>(
    State(service): State<SharedService<R, V>>,
    Path(rental_id): Path<String>,
    Json(details): Json<CustomerDetails>,
) -> Response
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    let id = RentalRequestId(rental_id);
    respond(StatusCode::OK, service.correct_customer_details(&id, details))
}
