use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rental_desk::config::VerificationConfig;
use rental_desk::rentals::{
    set_json_path, DocumentKind, HttpVerificationClient, RentalPatch, RentalRepository,
    RentalRequest, RentalRequestId, RepositoryError, VerificationClient, VerificationOutcome,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keyed JSON document store. Records are kept as raw documents and patched field by field.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    documents: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Value>>, RepositoryError> {
        self.documents
            .lock()
            .map_err(|_| RepositoryError::Unavailable("document store mutex poisoned".to_string()))
    }
}

fn decode(document: &Value) -> Result<RentalRequest, RepositoryError> {
    serde_json::from_value(document.clone()).map_err(|err| RepositoryError::Corrupt(err.to_string()))
}

impl RentalRepository for InMemoryDocumentStore {
    fn insert(&self, record: RentalRequest) -> Result<RentalRequest, RepositoryError> {
        let document =
            serde_json::to_value(&record).map_err(|err| RepositoryError::Corrupt(err.to_string()))?;
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.0.clone(), document);
        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<RentalRequest>, RepositoryError> {
        let guard = self.lock()?;
        let mut records = guard.values().map(decode).collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn load_one(&self, id: &RentalRequestId) -> Result<RentalRequest, RepositoryError> {
        let guard = self.lock()?;
        guard
            .get(&id.0)
            .ok_or(RepositoryError::NotFound)
            .and_then(decode)
    }

    fn apply_partial_update(
        &self,
        id: &RentalRequestId,
        patch: &RentalPatch,
    ) -> Result<(), RepositoryError> {
        let fields = patch
            .fields()
            .map_err(|err| RepositoryError::Corrupt(err.to_string()))?;
        let mut guard = self.lock()?;
        let current = guard.get(&id.0).ok_or(RepositoryError::NotFound)?;

        // Staged on a copy so a bad path leaves the stored document untouched.
        let mut staged = current.clone();
        for (path, value) in fields {
            set_json_path(&mut staged, &path, value)?;
        }
        decode(&staged)?;
        guard.insert(id.0.clone(), staged);
        Ok(())
    }
}

/// Offline stand-in for the government endpoint. Accepts every well-formed number
/// except the ones it was told to refuse.
#[derive(Debug, Default, Clone)]
pub(crate) struct SandboxVerificationClient {
    refused: BTreeSet<String>,
}

impl SandboxVerificationClient {
    pub(crate) fn refusing<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            refused: numbers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl VerificationClient for SandboxVerificationClient {
    async fn lookup(&self, _kind: DocumentKind, normalized: &str) -> VerificationOutcome {
        if self.refused.contains(normalized) {
            VerificationOutcome::rejected("document not found in sandbox registry")
        } else {
            VerificationOutcome::verified(None)
        }
    }
}

/// Verifier chosen at startup: the configured upstream, or the sandbox when none is set.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredVerifier {
    Http(HttpVerificationClient),
    Sandbox(SandboxVerificationClient),
}

impl ConfiguredVerifier {
    pub(crate) fn from_config(config: &VerificationConfig) -> Result<Self, reqwest::Error> {
        Ok(match HttpVerificationClient::from_config(config)? {
            Some(client) => Self::Http(client),
            None => Self::Sandbox(SandboxVerificationClient::default()),
        })
    }

    pub(crate) fn describe(&self) -> &str {
        match self {
            Self::Http(client) => client.base_url(),
            Self::Sandbox(_) => "sandbox",
        }
    }
}

#[async_trait]
impl VerificationClient for ConfiguredVerifier {
    async fn lookup(&self, kind: DocumentKind, normalized: &str) -> VerificationOutcome {
        match self {
            Self::Http(client) => client.lookup(kind, normalized).await,
            Self::Sandbox(client) => client.lookup(kind, normalized).await,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
