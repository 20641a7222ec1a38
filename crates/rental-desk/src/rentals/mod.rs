//! Rental request lifecycle, document verification gate, and payment tracking.
//!
//! Admin commands enter through [`RentalLifecycleService`], which consults the
//! [`DocumentGate`] and [`FinancialTerms`] before writing a single
//! [`RentalPatch`] through the [`RentalRepository`]. Automated checks go through a
//! [`VerificationClient`] and only ever produce advisory outcomes.

pub mod domain;
pub mod financial;
pub mod gate;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;
pub mod verification;

#[cfg(test)]
mod tests;

pub use domain::{
    CustomerDetails, DocumentKind, DocumentRecord, DocumentUpload, Documents, PaymentStatus,
    RentalRequest, RentalRequestId, RentalStatus, RentalSubmission, RentalTerms, TermsRevision,
};
pub use financial::{FinancialTerms, RentalPeriod, TermsError};
pub use gate::DocumentGate;
pub use lifecycle::{check_payment_transition, check_status_transition, LifecycleError};
pub use repository::{set_json_path, RentalPatch, RentalRepository, RepositoryError};
pub use router::rental_router;
pub use service::{RentalLifecycleService, RentalSummary};
pub use verification::{
    normalize_document_number, HttpVerificationClient, VerificationClient, VerificationError,
    VerificationOutcome, SERVICE_UNAVAILABLE,
};
