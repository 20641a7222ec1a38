use super::domain::{DocumentKind, PaymentStatus, RentalStatus};
use super::financial::TermsError;
use super::gate::DocumentGate;
use super::repository::RepositoryError;
use super::verification::{VerificationError, VerificationOutcome};

impl RentalStatus {
    pub const ALL: [RentalStatus; 7] = [
        RentalStatus::Pending,
        RentalStatus::DocumentVerification,
        RentalStatus::Approved,
        RentalStatus::Delivered,
        RentalStatus::Returned,
        RentalStatus::Rejected,
        RentalStatus::Cancelled,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::DocumentVerification => "document_verification",
            RentalStatus::Approved => "approved",
            RentalStatus::Delivered => "delivered",
            RentalStatus::Returned => "returned",
            RentalStatus::Rejected => "rejected",
            RentalStatus::Cancelled => "cancelled",
        }
    }

    pub const fn allowed_transitions(self) -> &'static [RentalStatus] {
        match self {
            RentalStatus::Pending => &[
                RentalStatus::DocumentVerification,
                RentalStatus::Rejected,
                RentalStatus::Cancelled,
            ],
            RentalStatus::DocumentVerification => &[
                RentalStatus::Approved,
                RentalStatus::Rejected,
                RentalStatus::Cancelled,
            ],
            RentalStatus::Approved => &[RentalStatus::Delivered, RentalStatus::Cancelled],
            RentalStatus::Delivered => &[RentalStatus::Returned],
            RentalStatus::Returned | RentalStatus::Rejected | RentalStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: RentalStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// The rental is still in flight; deposits are held and refunds are refused.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Terms may still be corrected before the request is approved.
    pub fn allows_term_revision(self) -> bool {
        matches!(
            self,
            RentalStatus::Pending | RentalStatus::DocumentVerification
        )
    }
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::AdvancePaid => "advance_paid",
            PaymentStatus::FullyPaid => "fully_paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub const fn allowed_transitions(self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[PaymentStatus::AdvancePaid],
            PaymentStatus::AdvancePaid => &[PaymentStatus::FullyPaid, PaymentStatus::Refunded],
            PaymentStatus::FullyPaid => &[PaymentStatus::Refunded],
            PaymentStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

/// Typed failures for every lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    InvalidTerms(#[from] TermsError),
    #[error(transparent)]
    InvalidDocumentFormat(#[from] VerificationError),
    #[error("incomplete submission: missing {}", .fields.join(", "))]
    IncompleteSubmission { fields: Vec<&'static str> },
    #[error("documents not verified: {}", .outstanding.join(", "))]
    DocumentsNotVerified { outstanding: Vec<&'static str> },
    #[error("cannot move rental from {} to {}", .from.label(), .to.label())]
    InvalidTransition { from: RentalStatus, to: RentalStatus },
    #[error("cannot move payment from {} to {}", .from.label(), .to.label())]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    #[error("refund not allowed while rental is {}", .status.label())]
    RefundNotEligible { status: RentalStatus },
    #[error("rental terms are locked once the request is {}", .status.label())]
    TermsLocked { status: RentalStatus },
    #[error("{} verification unavailable, retry later", .kind.label())]
    VerificationUnavailable { kind: DocumentKind },
    #[error("{} verification rejected: {reason}", .kind.label())]
    VerificationRejected { kind: DocumentKind, reason: String },
    #[error("rental request not found")]
    NotFound,
    #[error("persistence failure: {0}")]
    PersistenceError(#[source] RepositoryError),
}

impl From<RepositoryError> for LifecycleError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::PersistenceError(other),
        }
    }
}

impl LifecycleError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LifecycleError::PersistenceError(_) | LifecycleError::VerificationUnavailable { .. }
        )
    }

    /// Map a failed automated check onto the taxonomy. Valid outcomes map to `None`.
    pub fn from_outcome(kind: DocumentKind, outcome: &VerificationOutcome) -> Option<Self> {
        if outcome.is_valid {
            None
        } else if outcome.is_unavailable() {
            Some(Self::VerificationUnavailable { kind })
        } else {
            Some(Self::VerificationRejected {
                kind,
                reason: outcome.error.clone().unwrap_or_default(),
            })
        }
    }
}

/// Validate a status change against the transition table and the admission gate.
pub fn check_status_transition(
    current: RentalStatus,
    next: RentalStatus,
    gate: &DocumentGate,
) -> Result<(), LifecycleError> {
    if !current.can_transition_to(next) {
        return Err(LifecycleError::InvalidTransition {
            from: current,
            to: next,
        });
    }

    if next == RentalStatus::Approved && !gate.is_satisfied() {
        return Err(LifecycleError::DocumentsNotVerified {
            outstanding: gate.outstanding(),
        });
    }

    Ok(())
}

/// Validate a payment change. Refund eligibility is checked before the edge so an
/// active rental always reports `RefundNotEligible`.
pub fn check_payment_transition(
    status: RentalStatus,
    current: PaymentStatus,
    next: PaymentStatus,
) -> Result<(), LifecycleError> {
    if next == PaymentStatus::Refunded && status.is_active() {
        return Err(LifecycleError::RefundNotEligible { status });
    }

    if !current.can_transition_to(next) {
        return Err(LifecycleError::InvalidPaymentTransition {
            from: current,
            to: next,
        });
    }

    Ok(())
}
