use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::rentals::domain::{
    CustomerDetails, DocumentKind, DocumentUpload, RentalRequest, RentalRequestId, RentalStatus,
    RentalSubmission,
};
use crate::rentals::repository::{RentalPatch, RentalRepository, RepositoryError};
use crate::rentals::service::RentalLifecycleService;
use crate::rentals::verification::{VerificationClient, VerificationOutcome};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn customer() -> CustomerDetails {
    CustomerDetails {
        full_name: "Asha Raman".to_string(),
        email: "asha@example.com".to_string(),
        phone: "+91 98450 12345".to_string(),
        address: "14 Lake View Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560034".to_string(),
    }
}

/// Rent 500, deposit 2000, advance 1000 over a ten day window.
pub(super) fn submission() -> RentalSubmission {
    RentalSubmission {
        user_id: "user-42".to_string(),
        product_id: "camera-a7".to_string(),
        product_name: Some("Mirrorless camera kit".to_string()),
        customer_details: customer(),
        national_id: DocumentUpload {
            number: "2345 6789 0123".to_string(),
            image_ref: Some("uploads/user-42/national-id.jpg".to_string()),
        },
        tax_id: DocumentUpload {
            number: "abcde1234f".to_string(),
            image_ref: None,
        },
        start_date: date(2026, 11, 1),
        end_date: date(2026, 11, 11),
        rent_amount: 500,
        security_deposit: 2000,
        advance_payment: 1000,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<RentalRequestId, RentalRequest>>>,
    pub(super) patches: Arc<Mutex<Vec<RentalPatch>>>,
    pub(super) fail_writes: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub(super) fn write_count(&self) -> usize {
        self.patches.lock().expect("patch mutex poisoned").len()
    }

    pub(super) fn stored(&self, id: &RentalRequestId) -> RentalRequest {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
            .expect("record present")
    }

    pub(super) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl RentalRepository for MemoryRepository {
    fn insert(&self, record: RentalRequest) -> Result<RentalRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<RentalRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn load_one(&self, id: &RentalRequestId) -> Result<RentalRequest, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        guard.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    fn apply_partial_update(
        &self,
        id: &RentalRequestId,
        patch: &RentalPatch,
    ) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("store offline".to_string()));
        }
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        patch.apply_to(record);
        self.patches
            .lock()
            .expect("patch mutex poisoned")
            .push(patch.clone());
        Ok(())
    }
}

/// Verification fake returning a fixed outcome and counting upstream lookups.
#[derive(Clone)]
pub(super) struct StubVerifier {
    outcome: VerificationOutcome,
    delay: Option<Duration>,
    pub(super) calls: Arc<AtomicUsize>,
}

impl StubVerifier {
    pub(super) fn returning(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn valid() -> Self {
        Self::returning(VerificationOutcome::verified(Some("ASHA RAMAN".to_string())))
    }

    pub(super) fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::valid()
        }
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationClient for StubVerifier {
    async fn lookup(&self, _kind: DocumentKind, _normalized: &str) -> VerificationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

pub(super) type TestService = RentalLifecycleService<MemoryRepository, StubVerifier>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<StubVerifier>) {
    build_service_with(StubVerifier::valid())
}

pub(super) fn build_service_with(
    verifier: StubVerifier,
) -> (TestService, Arc<MemoryRepository>, Arc<StubVerifier>) {
    let repository = Arc::new(MemoryRepository::default());
    let verifier = Arc::new(verifier);
    let service = RentalLifecycleService::new(repository.clone(), verifier.clone());
    (service, repository, verifier)
}

/// Approve both documents and mark the cheque as received.
pub(super) fn satisfy_gate(service: &TestService, id: &RentalRequestId) {
    service
        .approve_document(id, DocumentKind::NationalId, None)
        .expect("approve national id");
    service
        .approve_document(id, DocumentKind::TaxId, None)
        .expect("approve tax id");
    service
        .set_cheque_submitted(id, true)
        .expect("cheque recorded");
}

/// Submit a request and walk it along the happy path until it reaches `target`.
pub(super) fn request_in(service: &TestService, target: RentalStatus) -> RentalRequest {
    let mut record = service.submit(submission()).expect("submission accepted");
    let path = [
        RentalStatus::DocumentVerification,
        RentalStatus::Approved,
        RentalStatus::Delivered,
        RentalStatus::Returned,
    ];

    match target {
        RentalStatus::Pending => return record,
        RentalStatus::Rejected | RentalStatus::Cancelled => {
            return service
                .transition_status(&record.id, target, None)
                .expect("terminal transition");
        }
        _ => {}
    }

    for step in path {
        if step == RentalStatus::Approved {
            satisfy_gate(service, &record.id);
        }
        record = service
            .transition_status(&record.id, step, None)
            .expect("happy path transition");
        if step == target {
            break;
        }
    }
    record
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
