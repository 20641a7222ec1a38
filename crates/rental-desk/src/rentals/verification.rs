//! Government identity verification.
//!
//! Numbers are format-checked and normalized before any client sees them, so a
//! malformed document never costs a network round trip. Transport problems are
//! folded into an unavailable [`VerificationOutcome`] instead of an error; the
//! outcome is advisory and never changes the manual trust flags.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::DocumentKind;
use crate::config::VerificationConfig;

pub const SERVICE_UNAVAILABLE: &str = "verification service unavailable";
const DEFAULT_REJECTION: &str = "document could not be verified";

/// Local validation failure raised before contacting the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid {} number format: '{number}'", .kind.label())]
    InvalidDocumentFormat { kind: DocumentKind, number: String },
}

/// Result of one automated check. Lives only as long as the caller keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the upstream could not give an answer; retrying may help.
    #[serde(default)]
    pub retryable: bool,
}

impl VerificationOutcome {
    pub fn verified(matched_name: Option<String>) -> Self {
        Self {
            is_valid: true,
            matched_name,
            error: None,
            retryable: false,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            matched_name: None,
            error: Some(reason.into()),
            retryable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            is_valid: false,
            matched_name: None,
            error: Some(SERVICE_UNAVAILABLE.to_string()),
            retryable: true,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        !self.is_valid && self.retryable
    }
}

fn national_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{4}[ -]?[0-9]{4}[ -]?[0-9]{4}$").expect("national id pattern compiles")
    })
}

fn tax_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("tax id pattern compiles")
    })
}

/// Check a raw document number against the format for its kind and return the
/// canonical form sent upstream.
///
/// National ids are twelve digits, optionally grouped in fours by spaces or
/// hyphens; the canonical form drops the separators. Tax ids are five letters,
/// four digits, and a letter, compared case-insensitively and upper-cased.
pub fn normalize_document_number(
    kind: DocumentKind,
    raw: &str,
) -> Result<String, VerificationError> {
    let trimmed = raw.trim();
    let invalid = || VerificationError::InvalidDocumentFormat {
        kind,
        number: raw.to_string(),
    };

    match kind {
        DocumentKind::NationalId => {
            if !national_id_pattern().is_match(trimmed) {
                return Err(invalid());
            }
            Ok(trimmed.chars().filter(char::is_ascii_digit).collect())
        }
        DocumentKind::TaxId => {
            let upper = trimmed.to_ascii_uppercase();
            if !tax_id_pattern().is_match(&upper) {
                return Err(invalid());
            }
            Ok(upper)
        }
    }
}

/// Outbound verification seam. Implementors provide [`VerificationClient::lookup`];
/// callers use [`VerificationClient::verify`], which validates first.
#[async_trait]
pub trait VerificationClient: Send + Sync {
    /// Query the upstream with an already normalized number.
    async fn lookup(&self, kind: DocumentKind, normalized: &str) -> VerificationOutcome;

    async fn verify(
        &self,
        kind: DocumentKind,
        number: &str,
    ) -> Result<VerificationOutcome, VerificationError> {
        let normalized = normalize_document_number(kind, number)?;
        Ok(self.lookup(kind, &normalized).await)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    document_type: &'static str,
    document_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// JSON client for the government verification endpoint (`POST {base}/v1/verify`).
#[derive(Debug, Clone)]
pub struct HttpVerificationClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpVerificationClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Build a client when an upstream is configured.
    pub fn from_config(config: &VerificationConfig) -> Result<Option<Self>, reqwest::Error> {
        match &config.base_url {
            Some(base_url) => {
                Self::new(base_url.clone(), config.api_key.clone(), config.timeout).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn lookup(&self, kind: DocumentKind, normalized: &str) -> VerificationOutcome {
        let url = format!("{}/v1/verify", self.base_url);
        debug!(document = kind.label(), %url, "requesting government verification");

        let mut request = self.client.post(&url).json(&VerifyRequest {
            document_type: kind.label(),
            document_number: normalized,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    document = kind.label(),
                    timeout = err.is_timeout(),
                    error = %err,
                    "verification transport failure"
                );
                return VerificationOutcome::unavailable();
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<VerifyResponse>().await {
                Ok(body) if body.valid => VerificationOutcome::verified(body.name),
                Ok(body) => VerificationOutcome::rejected(
                    body.message.unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
                ),
                Err(err) => {
                    warn!(document = kind.label(), error = %err, "malformed verification payload");
                    VerificationOutcome::unavailable()
                }
            };
        }

        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            return VerificationOutcome::rejected(
                body.message.unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
            );
        }

        warn!(document = kind.label(), %status, "verification service returned an error status");
        VerificationOutcome::unavailable()
    }
}
