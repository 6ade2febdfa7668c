use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indicator::Indicator;
use crate::probe::Record;

/// One matched record explaining why a check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Name of the check that produced this evidence.
    pub check: String,
    /// Label of the probe whose output matched.
    pub source: String,
    /// The matching line, or the file path for file records.
    pub subject: String,
    /// Human-readable form of the indicator that fired.
    pub indicator: String,
    /// Modification time, for file records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Evidence {
    pub fn new(check: &str, source: &str, record: &Record, indicator: &Indicator) -> Self {
        Self {
            check: check.into(),
            source: source.into(),
            subject: record.text(),
            indicator: indicator.to_string(),
            modified: record.modified(),
        }
    }

    /// Cut the subject down to `limit` characters.
    pub fn truncate_subject(&mut self, limit: usize) {
        self.subject = preview(&self.subject, limit);
    }
}

/// Cut `text` to at most `limit` characters, marking the cut with `...`.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// Probe ran and nothing matched.
    Pass,
    /// At least one indicator matched.
    Fail,
    /// The probe could not run, or the check itself faulted.
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of running one check once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: String,
    pub description: String,
    pub status: CheckStatus,
    /// Empty unless `status == Fail`.
    pub evidence: Vec<Evidence>,
    /// Set only when `status == Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Records seen across all probes, after exclusions.
    pub records_inspected: usize,
    /// Matches dropped by the per-probe evidence cap.
    #[serde(default)]
    pub suppressed: usize,
    /// Raw lines kept by informational checks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl CheckResult {
    /// `Fail` iff `evidence` is non-empty, else `Pass`.
    pub fn from_evidence(check: &str, description: &str, evidence: Vec<Evidence>) -> Self {
        let status = if evidence.is_empty() {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };
        Self {
            check: check.into(),
            description: description.into(),
            status,
            evidence,
            error: None,
            records_inspected: 0,
            suppressed: 0,
            notes: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn errored(check: &str, description: &str, error: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            description: description.into(),
            status: CheckStatus::Error,
            evidence: Vec::new(),
            error: Some(error.into()),
            records_inspected: 0,
            suppressed: 0,
            notes: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn with_records_inspected(mut self, count: usize) -> Self {
        self.records_inspected = count;
        self
    }

    pub fn with_suppressed(mut self, count: usize) -> Self {
        self.suppressed = count;
        self
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}
