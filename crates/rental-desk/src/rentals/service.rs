use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    CustomerDetails, DocumentKind, DocumentRecord, Documents, PaymentStatus, RentalRequest,
    RentalRequestId, RentalStatus, RentalSubmission, RentalTerms, TermsRevision,
};
use super::financial::{FinancialTerms, RentalPeriod, TermsError};
use super::gate::DocumentGate;
use super::lifecycle::{check_payment_transition, check_status_transition, LifecycleError};
use super::repository::{RentalPatch, RentalRepository};
use super::verification::{normalize_document_number, VerificationClient, VerificationOutcome};

const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RentalRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RentalRequestId(format!("rent-{id:06}"))
}

/// Counts and money totals for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalSummary {
    pub total: usize,
    pub by_status: BTreeMap<RentalStatus, usize>,
    /// Balance still to collect across requests that are not terminal.
    pub outstanding_balance: i64,
    /// Deposits held and not yet refunded.
    pub refundable_deposits: i64,
}

/// Rental lifecycle state machine.
///
/// Each command loads the aggregate, validates against the transition tables and
/// gate, and writes one [`RentalPatch`]. The returned record reflects the write
/// only after the store has accepted it.
pub struct RentalLifecycleService<R, V> {
    repository: Arc<R>,
    verifier: Arc<V>,
    verification_timeout: Duration,
    outcomes: Mutex<HashMap<(RentalRequestId, DocumentKind), VerificationOutcome>>,
}

impl<R, V> RentalLifecycleService<R, V>
where
    R: RentalRepository + 'static,
    V: VerificationClient + 'static,
{
    pub fn new(repository: Arc<R>, verifier: Arc<V>) -> Self {
        Self {
            repository,
            verifier,
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// Upper bound for one automated check, whatever the client does internally.
    pub fn with_verification_timeout(mut self, timeout: Duration) -> Self {
        self.verification_timeout = timeout;
        self
    }

    /// Validate a customer submission and store it as a fresh `Pending` request.
    pub fn submit(&self, submission: RentalSubmission) -> Result<RentalRequest, LifecycleError> {
        let mut missing = submission.customer_details.missing_fields();
        if submission.user_id.trim().is_empty() {
            missing.push("userId");
        }
        if submission.product_id.trim().is_empty() {
            missing.push("productId");
        }
        if !missing.is_empty() {
            return Err(LifecycleError::IncompleteSubmission { fields: missing });
        }

        let national_id =
            normalize_document_number(DocumentKind::NationalId, &submission.national_id.number)?;
        let tax_id = normalize_document_number(DocumentKind::TaxId, &submission.tax_id.number)?;

        let period = RentalPeriod::new(submission.start_date, submission.end_date)?;
        let financials = FinancialTerms::new(
            submission.rent_amount,
            submission.security_deposit,
            submission.advance_payment,
        )?;

        let now = Utc::now();
        let record = RentalRequest {
            id: next_request_id(),
            user_id: submission.user_id,
            product_id: submission.product_id,
            product_name: submission.product_name,
            customer_details: submission.customer_details,
            documents: Documents {
                national_id: DocumentRecord::unverified(
                    national_id,
                    submission.national_id.image_ref,
                ),
                tax_id: DocumentRecord::unverified(tax_id, submission.tax_id.image_ref),
                cheque_submitted: false,
            },
            rental_terms: RentalTerms::new(period, financials),
            status: RentalStatus::Pending,
            payment_status: PaymentStatus::Pending,
            admin_notes: String::new(),
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(
            request_id = %stored.id,
            product_id = %stored.product_id,
            "rental request submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &RentalRequestId) -> Result<RentalRequest, LifecycleError> {
        Ok(self.repository.load_one(id)?)
    }

    /// Requests newest first, optionally narrowed to one status.
    pub fn list(&self, status: Option<RentalStatus>) -> Result<Vec<RentalRequest>, LifecycleError> {
        let records = self.repository.list_all()?;
        Ok(match status {
            Some(status) => records
                .into_iter()
                .filter(|record| record.status == status)
                .collect(),
            None => records,
        })
    }

    pub fn summary(&self) -> Result<RentalSummary, LifecycleError> {
        let records = self.repository.list_all()?;
        let mut by_status: BTreeMap<RentalStatus, usize> =
            RentalStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        let mut outstanding_balance: i64 = 0;
        let mut refundable_deposits: i64 = 0;

        for record in &records {
            *by_status.entry(record.status).or_default() += 1;
            let financials = record.rental_terms.financials()?;
            if record.status.is_active() && record.payment_status != PaymentStatus::FullyPaid {
                outstanding_balance = add_amount(
                    outstanding_balance,
                    financials.balance_due(),
                    "outstanding balance",
                )?;
            }
            if record.payment_status != PaymentStatus::Pending {
                refundable_deposits = add_amount(
                    refundable_deposits,
                    financials.refundable_amount(record.payment_status),
                    "refundable deposits",
                )?;
            }
        }

        Ok(RentalSummary {
            total: records.len(),
            by_status,
            outstanding_balance,
            refundable_deposits,
        })
    }

    /// Move the request to `next` if the transition table and gate allow it.
    pub fn transition_status(
        &self,
        id: &RentalRequestId,
        next: RentalStatus,
        note: Option<&str>,
    ) -> Result<RentalRequest, LifecycleError> {
        let record = self.repository.load_one(id)?;
        let gate = DocumentGate::new(record.documents.clone());

        if let Err(err) = check_status_transition(record.status, next, &gate) {
            warn!(
                request_id = %id,
                from = record.status.label(),
                to = next.label(),
                error = %err,
                "status transition refused"
            );
            return Err(err);
        }

        let now = Utc::now();
        let entry = format!("status {} -> {}", record.status.label(), next.label());
        let patch = RentalPatch::new(now)
            .status(next)
            .admin_notes(append_note(&record.admin_notes, now, &entry, note));

        let from = record.status;
        let updated = self.commit(record, patch)?;
        info!(request_id = %id, from = from.label(), to = next.label(), "rental status updated");
        Ok(updated)
    }

    /// Record a payment milestone. Refunds need a rental that is no longer active.
    pub fn record_payment_event(
        &self,
        id: &RentalRequestId,
        next: PaymentStatus,
        note: Option<&str>,
    ) -> Result<RentalRequest, LifecycleError> {
        let record = self.repository.load_one(id)?;

        if let Err(err) = check_payment_transition(record.status, record.payment_status, next) {
            warn!(
                request_id = %id,
                status = record.status.label(),
                payment = next.label(),
                error = %err,
                "payment event refused"
            );
            return Err(err);
        }

        let now = Utc::now();
        let entry = format!(
            "payment {} -> {}",
            record.payment_status.label(),
            next.label()
        );
        let patch = RentalPatch::new(now)
            .payment_status(next)
            .admin_notes(append_note(&record.admin_notes, now, &entry, note));

        let from = record.payment_status;
        let updated = self.commit(record, patch)?;
        info!(request_id = %id, from = from.label(), to = next.label(), "payment status updated");
        Ok(updated)
    }

    pub fn approve_document(
        &self,
        id: &RentalRequestId,
        kind: DocumentKind,
        note: Option<&str>,
    ) -> Result<RentalRequest, LifecycleError> {
        self.record_document_decision(id, kind, true, note)
    }

    pub fn reject_document(
        &self,
        id: &RentalRequestId,
        kind: DocumentKind,
        note: Option<&str>,
    ) -> Result<RentalRequest, LifecycleError> {
        self.record_document_decision(id, kind, false, note)
    }

    fn record_document_decision(
        &self,
        id: &RentalRequestId,
        kind: DocumentKind,
        approved: bool,
        note: Option<&str>,
    ) -> Result<RentalRequest, LifecycleError> {
        let record = self.repository.load_one(id)?;
        let mut gate = DocumentGate::new(record.documents.clone());
        if !gate.record_manual_decision(kind, approved) {
            return Ok(record);
        }

        let now = Utc::now();
        let decision = if approved { "approved" } else { "rejected" };
        let entry = format!("{} {decision}", kind.label());
        let patch = RentalPatch::new(now)
            .document_verified(kind, approved)
            .admin_notes(append_note(&record.admin_notes, now, &entry, note));

        let updated = self.commit(record, patch)?;
        info!(request_id = %id, document = kind.label(), decision, "document decision recorded");
        Ok(updated)
    }

    pub fn set_cheque_submitted(
        &self,
        id: &RentalRequestId,
        submitted: bool,
    ) -> Result<RentalRequest, LifecycleError> {
        let record = self.repository.load_one(id)?;
        let mut gate = DocumentGate::new(record.documents.clone());
        if !gate.set_cheque_submitted(submitted) {
            return Ok(record);
        }

        let patch = RentalPatch::new(Utc::now()).cheque_submitted(submitted);
        let updated = self.commit(record, patch)?;
        info!(request_id = %id, submitted, "cheque flag updated");
        Ok(updated)
    }

    /// Correct dates or money terms before approval, recomputing derived values.
    pub fn revise_terms(
        &self,
        id: &RentalRequestId,
        revision: &TermsRevision,
    ) -> Result<RentalRequest, LifecycleError> {
        let record = self.repository.load_one(id)?;
        if !record.status.allows_term_revision() {
            return Err(LifecycleError::TermsLocked {
                status: record.status,
            });
        }

        let terms = record.rental_terms.revise(revision)?;
        let patch = RentalPatch::new(Utc::now()).rental_terms(terms);
        let updated = self.commit(record, patch)?;
        info!(request_id = %id, total = terms.total_amount, "rental terms revised");
        Ok(updated)
    }

    pub fn correct_customer_details(
        &self,
        id: &RentalRequestId,
        details: CustomerDetails,
    ) -> Result<RentalRequest, LifecycleError> {
        let missing = details.missing_fields();
        if !missing.is_empty() {
            return Err(LifecycleError::IncompleteSubmission { fields: missing });
        }

        let record = self.repository.load_one(id)?;
        let patch = RentalPatch::new(Utc::now()).customer_details(details);
        let updated = self.commit(record, patch)?;
        info!(request_id = %id, "customer details corrected");
        Ok(updated)
    }

    /// Ask the verification service about one document and cache the advisory
    /// outcome. Persisted state is never touched.
    pub async fn run_automated_verification(
        &self,
        id: &RentalRequestId,
        kind: DocumentKind,
    ) -> Result<VerificationOutcome, LifecycleError> {
        let record = self.repository.load_one(id)?;
        let number = record.documents.get(kind).number.clone();

        let outcome = match tokio::time::timeout(
            self.verification_timeout,
            self.verifier.verify(kind, &number),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(request_id = %id, document = kind.label(), "verification timed out");
                VerificationOutcome::unavailable()
            }
        };

        info!(
            request_id = %id,
            document = kind.label(),
            valid = outcome.is_valid,
            retryable = outcome.retryable,
            "automated verification completed"
        );

        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((id.clone(), kind), outcome.clone());
        Ok(outcome)
    }

    pub fn last_verification(
        &self,
        id: &RentalRequestId,
        kind: DocumentKind,
    ) -> Option<VerificationOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(id.clone(), kind))
            .cloned()
    }

    /// Gate view for a request, including any cached automated outcomes.
    pub fn gate(&self, id: &RentalRequestId) -> Result<DocumentGate, LifecycleError> {
        let record = self.repository.load_one(id)?;
        let outcomes: Vec<_> = DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| self.last_verification(id, kind).map(|outcome| (kind, outcome)))
            .collect();
        Ok(DocumentGate::with_outcomes(record.documents, outcomes))
    }

    fn commit(
        &self,
        mut record: RentalRequest,
        patch: RentalPatch,
    ) -> Result<RentalRequest, LifecycleError> {
        if let Err(err) = self.repository.apply_partial_update(&record.id, &patch) {
            warn!(request_id = %record.id, error = %err, "rental update not persisted");
            return Err(err.into());
        }
        patch.apply_to(&mut record);
        Ok(record)
    }
}

fn add_amount(total: i64, amount: i64, label: &str) -> Result<i64, TermsError> {
    total
        .checked_add(amount)
        .ok_or_else(|| TermsError::financial(format!("{label} exceeds the supported range")))
}

fn append_note(existing: &str, at: DateTime<Utc>, entry: &str, note: Option<&str>) -> String {
    let mut line = format!("[{}] {entry}", at.to_rfc3339_opts(SecondsFormat::Secs, true));
    if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
        line.push_str(": ");
        line.push_str(note);
    }

    if existing.is_empty() {
        line
    } else {
        format!("{existing}\n{line}")
    }
}
