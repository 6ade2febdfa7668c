//! Report aggregation: per-check results → one verdict.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::checks::{CheckResult, CheckStatus};

/// Overall conclusion of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Clean,
    Suspicious,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "CLEAN"),
            Self::Suspicious => write!(f, "SUSPICIOUS"),
        }
    }
}

/// How results turn into a verdict and an exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Exit non-zero when the verdict is SUSPICIOUS.
    #[serde(default)]
    pub strict: bool,
    /// Checks that could not run don't spoil a CLEAN verdict. They are
    /// still counted and labelled as errors.
    #[serde(default)]
    pub ignore_errors: bool,
}

impl Policy {
    pub fn verdict(&self, results: &[CheckResult]) -> Verdict {
        let spoiled = results.iter().any(|r| match r.status {
            CheckStatus::Pass => false,
            CheckStatus::Fail => true,
            CheckStatus::Error => !self.ignore_errors,
        });
        if spoiled {
            Verdict::Suspicious
        } else {
            Verdict::Clean
        }
    }

    /// 0 unless strict and suspicious.
    pub fn exit_code(&self, report: &ScanReport) -> i32 {
        if self.strict && report.verdict == Verdict::Suspicious {
            1
        } else {
            0
        }
    }
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

impl Summary {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for r in results {
            match r.status {
                CheckStatus::Pass => summary.passed += 1,
                CheckStatus::Fail => summary.failed += 1,
                CheckStatus::Error => summary.errored += 1,
            }
        }
        summary
    }
}

/// When and where a scan ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMeta {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub platform: String,
    pub version: String,
}

impl ScanMeta {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            started_at,
            finished_at,
            platform: std::env::consts::OS.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// The terminal artifact of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub meta: ScanMeta,
    /// Results in registry order.
    pub results: Vec<CheckResult>,
    /// Registered checks that were disabled for this run.
    pub skipped: Vec<String>,
    pub summary: Summary,
    pub verdict: Verdict,
    /// SHA-256 over check names, statuses and evidence; equal across
    /// scans of an unchanged machine.
    pub fingerprint: String,
}

/// Reduce results into a report. Pure: runs nothing, reorders nothing.
pub fn aggregate(
    meta: ScanMeta,
    results: Vec<CheckResult>,
    skipped: Vec<String>,
    policy: &Policy,
) -> ScanReport {
    let summary = Summary::from_results(&results);
    let verdict = policy.verdict(&results);
    let fingerprint = fingerprint(&results);
    ScanReport {
        meta,
        results,
        skipped,
        summary,
        verdict,
        fingerprint,
    }
}

fn fingerprint(results: &[CheckResult]) -> String {
    let mut hasher = Sha256::new();
    for r in results {
        hasher.update(r.check.as_bytes());
        hasher.update(b"\t");
        hasher.update(r.status.to_string().as_bytes());
        hasher.update(b"\n");
        if let Some(err) = &r.error {
            hasher.update(err.as_bytes());
            hasher.update(b"\n");
        }
        for ev in &r.evidence {
            hasher.update(b"  ");
            hasher.update(ev.subject.as_bytes());
            hasher.update(b"\n");
        }
    }
    hex::encode(hasher.finalize())
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.verdict == Verdict::Clean
    }

    pub fn result(&self, check: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check == check)
    }
}
