use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for rental requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalRequestId(pub String);

impl std::fmt::Display for RentalRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contact and delivery details captured at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl CustomerDetails {
    /// Names of required fields left blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("pincode", &self.pincode),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// The two government identity documents every request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NationalId,
    TaxId,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::NationalId, DocumentKind::TaxId];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::NationalId => "national_id",
            DocumentKind::TaxId => "tax_id",
        }
    }

    /// Key of the document inside the persisted `documents` object.
    pub const fn field_name(self) -> &'static str {
        match self {
            DocumentKind::NationalId => "nationalId",
            DocumentKind::TaxId => "taxId",
        }
    }
}

/// A single identity document and its authoritative manual trust flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub manually_verified: bool,
}

impl DocumentRecord {
    pub fn unverified(number: impl Into<String>, image_ref: Option<String>) -> Self {
        Self {
            number: number.into(),
            image_ref,
            manually_verified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    pub national_id: DocumentRecord,
    pub tax_id: DocumentRecord,
    #[serde(default)]
    pub cheque_submitted: bool,
}

impl Documents {
    pub fn get(&self, kind: DocumentKind) -> &DocumentRecord {
        match kind {
            DocumentKind::NationalId => &self.national_id,
            DocumentKind::TaxId => &self.tax_id,
        }
    }

    pub fn get_mut(&mut self, kind: DocumentKind) -> &mut DocumentRecord {
        match kind {
            DocumentKind::NationalId => &mut self.national_id,
            DocumentKind::TaxId => &mut self.tax_id,
        }
    }
}

/// Rental window and money terms. Amounts are minor currency units.
///
/// Build through [`RentalTerms::new`] so the derived fields stay consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalTerms {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub rent_amount: i64,
    pub security_deposit: i64,
    pub advance_payment: i64,
    pub total_amount: i64,
}

/// Workflow status of a rental request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Pending,
    DocumentVerification,
    Approved,
    Delivered,
    Returned,
    Rejected,
    Cancelled,
}

/// Payment progress, tracked independently of [`RentalStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    AdvancePaid,
    FullyPaid,
    Refunded,
}

/// Aggregate root persisted by the store adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub id: RentalRequestId,
    pub user_id: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub customer_details: CustomerDetails,
    pub documents: Documents,
    pub rental_terms: RentalTerms,
    pub status: RentalStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub admin_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document number and optional upload reference supplied by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub number: String,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// Intake payload for a new rental request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalSubmission {
    pub user_id: String,
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub customer_details: CustomerDetails,
    pub national_id: DocumentUpload,
    pub tax_id: DocumentUpload,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: i64,
    pub security_deposit: i64,
    #[serde(default)]
    pub advance_payment: i64,
}

/// Admin correction of rental terms. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsRevision {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub rent_amount: Option<i64>,
    #[serde(default)]
    pub security_deposit: Option<i64>,
    #[serde(default)]
    pub advance_payment: Option<i64>,
}
