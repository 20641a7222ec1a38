use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::{
    CustomerDetails, DocumentKind, PaymentStatus, RentalRequest, RentalRequestId, RentalStatus,
    RentalTerms,
};

/// Storage abstraction over a generic keyed document store.
///
/// Every mutating lifecycle operation issues exactly one
/// [`RentalRepository::apply_partial_update`] call carrying all the fields it changes.
pub trait RentalRepository: Send + Sync {
    fn insert(&self, record: RentalRequest) -> Result<RentalRequest, RepositoryError>;
    /// All requests, newest `createdAt` first.
    fn list_all(&self) -> Result<Vec<RentalRequest>, RepositoryError>;
    fn load_one(&self, id: &RentalRequestId) -> Result<RentalRequest, RepositoryError>;
    fn apply_partial_update(
        &self,
        id: &RentalRequestId,
        patch: &RentalPatch,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
}

/// The set of field changes a single lifecycle operation writes.
///
/// `updated_at` is always part of the write.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalPatch {
    pub status: Option<RentalStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub national_id_verified: Option<bool>,
    pub tax_id_verified: Option<bool>,
    pub cheque_submitted: Option<bool>,
    pub rental_terms: Option<RentalTerms>,
    pub customer_details: Option<CustomerDetails>,
    pub admin_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RentalPatch {
    pub fn new(updated_at: DateTime<Utc>) -> Self {
        Self {
            status: None,
            payment_status: None,
            national_id_verified: None,
            tax_id_verified: None,
            cheque_submitted: None,
            rental_terms: None,
            customer_details: None,
            admin_notes: None,
            updated_at,
        }
    }

    pub fn status(mut self, status: RentalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    pub fn document_verified(mut self, kind: DocumentKind, verified: bool) -> Self {
        match kind {
            DocumentKind::NationalId => self.national_id_verified = Some(verified),
            DocumentKind::TaxId => self.tax_id_verified = Some(verified),
        }
        self
    }

    pub fn cheque_submitted(mut self, submitted: bool) -> Self {
        self.cheque_submitted = Some(submitted);
        self
    }

    pub fn rental_terms(mut self, terms: RentalTerms) -> Self {
        self.rental_terms = Some(terms);
        self
    }

    pub fn customer_details(mut self, details: CustomerDetails) -> Self {
        self.customer_details = Some(details);
        self
    }

    pub fn admin_notes(mut self, notes: String) -> Self {
        self.admin_notes = Some(notes);
        self
    }

    /// Field path to value mapping, using dotted paths for nested document flags.
    pub fn fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = Map::new();
        insert_field(&mut fields, "status", self.status.as_ref())?;
        insert_field(&mut fields, "paymentStatus", self.payment_status.as_ref())?;
        insert_field(
            &mut fields,
            "documents.nationalId.manuallyVerified",
            self.national_id_verified.as_ref(),
        )?;
        insert_field(
            &mut fields,
            "documents.taxId.manuallyVerified",
            self.tax_id_verified.as_ref(),
        )?;
        insert_field(
            &mut fields,
            "documents.chequeSubmitted",
            self.cheque_submitted.as_ref(),
        )?;
        insert_field(&mut fields, "rentalTerms", self.rental_terms.as_ref())?;
        insert_field(&mut fields, "customerDetails", self.customer_details.as_ref())?;
        insert_field(&mut fields, "adminNotes", self.admin_notes.as_ref())?;
        insert_field(&mut fields, "updatedAt", Some(&self.updated_at))?;
        Ok(fields)
    }

    /// Apply the patch to an in-memory copy. Used after the store confirms the write.
    pub fn apply_to(&self, record: &mut RentalRequest) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(payment_status) = self.payment_status {
            record.payment_status = payment_status;
        }
        if let Some(verified) = self.national_id_verified {
            record.documents.national_id.manually_verified = verified;
        }
        if let Some(verified) = self.tax_id_verified {
            record.documents.tax_id.manually_verified = verified;
        }
        if let Some(submitted) = self.cheque_submitted {
            record.documents.cheque_submitted = submitted;
        }
        if let Some(terms) = self.rental_terms {
            record.rental_terms = terms;
        }
        if let Some(details) = &self.customer_details {
            record.customer_details = details.clone();
        }
        if let Some(notes) = &self.admin_notes {
            record.admin_notes = notes.clone();
        }
        record.updated_at = self.updated_at;
    }
}

fn insert_field<T: Serialize>(
    fields: &mut Map<String, Value>,
    path: &str,
    value: Option<&T>,
) -> Result<(), serde_json::Error> {
    if let Some(value) = value {
        fields.insert(path.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

/// Write `value` at a dotted `path` inside a JSON document, creating objects as needed.
pub fn set_json_path(document: &mut Value, path: &str, value: Value) -> Result<(), RepositoryError> {
    let mut segments = path.split('.').peekable();
    let mut cursor = document;
    while let Some(segment) = segments.next() {
        let object = cursor
            .as_object_mut()
            .ok_or_else(|| RepositoryError::Corrupt(format!("'{path}' crosses a non-object")))?;
        if segments.peek().is_none() {
            object.insert(segment.to_string(), value);
            return Ok(());
        }
        cursor = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Err(RepositoryError::Corrupt(format!("empty field path '{path}'")))
}
