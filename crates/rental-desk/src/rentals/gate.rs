use std::collections::BTreeMap;

use super::domain::{DocumentKind, Documents};
use super::verification::VerificationOutcome;

/// Admission gate guarding the move into `Approved`.
///
/// Manual decisions are authoritative. Automated outcomes are cached next to
/// them for display only and never feed [`DocumentGate::is_satisfied`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGate {
    documents: Documents,
    automated: BTreeMap<DocumentKind, VerificationOutcome>,
}

impl DocumentGate {
    pub fn new(documents: Documents) -> Self {
        Self {
            documents,
            automated: BTreeMap::new(),
        }
    }

    pub fn with_outcomes(
        documents: Documents,
        outcomes: impl IntoIterator<Item = (DocumentKind, VerificationOutcome)>,
    ) -> Self {
        Self {
            documents,
            automated: outcomes.into_iter().collect(),
        }
    }

    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    /// Set the manual flag for one document. Returns whether anything changed;
    /// repeating a decision is a successful no-op.
    pub fn record_manual_decision(&mut self, kind: DocumentKind, approved: bool) -> bool {
        let record = self.documents.get_mut(kind);
        if record.manually_verified == approved {
            return false;
        }
        record.manually_verified = approved;
        true
    }

    pub fn set_cheque_submitted(&mut self, submitted: bool) -> bool {
        if self.documents.cheque_submitted == submitted {
            return false;
        }
        self.documents.cheque_submitted = submitted;
        true
    }

    pub fn record_automated_outcome(&mut self, kind: DocumentKind, outcome: VerificationOutcome) {
        self.automated.insert(kind, outcome);
    }

    pub fn last_automated_outcome(&self, kind: DocumentKind) -> Option<&VerificationOutcome> {
        self.automated.get(&kind)
    }

    pub fn is_satisfied(&self) -> bool {
        self.outstanding().is_empty()
    }

    /// Requirements still blocking approval, named as persisted.
    pub fn outstanding(&self) -> Vec<&'static str> {
        let mut missing: Vec<&'static str> = DocumentKind::ALL
            .into_iter()
            .filter(|kind| !self.documents.get(*kind).manually_verified)
            .map(DocumentKind::field_name)
            .collect();
        if !self.documents.cheque_submitted {
            missing.push("chequeSubmitted");
        }
        missing
    }
}
