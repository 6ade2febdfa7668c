pub mod builtin;
pub mod registry;
pub mod result;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::indicator::{Indicator, IndicatorSet};
use crate::probe::{Probe, ProbeSpec, RawOutput};

pub use registry::CheckRegistry;
pub use result::{CheckResult, CheckStatus, Evidence};

/// Raw lines kept on an informational check's result.
const NOTE_LIMIT: usize = 20;

/// A check runs its probes against a `Probe` adapter and turns the
/// output into a `CheckResult`.
///
/// `execute` must be total: probe failures become `CheckStatus::Error`.
/// Checks hold no mutable state, so calls are independent.
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// `std::env::consts::OS` values this check applies to. Empty means all.
    fn platforms(&self) -> &[&'static str] {
        &[]
    }

    fn execute(&self, probe: &dyn Probe) -> CheckResult;

    /// Metadata used by `list-checks`.
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            name: self.name().into(),
            description: self.description().into(),
            platforms: self.platforms().iter().map(|p| p.to_string()).collect(),
            probes: Vec::new(),
            indicators: Vec::new(),
        }
    }

    fn supports_current_platform(&self) -> bool {
        let platforms = self.platforms();
        platforms.is_empty() || platforms.contains(&std::env::consts::OS)
    }
}

/// Static description of a check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckMetadata {
    pub name: String,
    pub description: String,
    pub platforms: Vec<String>,
    pub probes: Vec<String>,
    pub indicators: Vec<Indicator>,
}

/// The stock check: one or more probes, one indicator set, FAIL on any
/// match.
#[derive(Debug, Clone)]
pub struct IndicatorCheck {
    name: String,
    description: String,
    probes: Vec<ProbeSpec>,
    indicators: IndicatorSet,
    exclusions: Vec<String>,
    max_evidence_per_probe: Option<usize>,
    preview_chars: Option<usize>,
    informational: bool,
    platforms: Vec<&'static str>,
}

impl IndicatorCheck {
    pub fn builder(name: &str) -> IndicatorCheckBuilder {
        IndicatorCheckBuilder {
            name: name.into(),
            description: String::new(),
            probes: Vec::new(),
            indicators: Vec::new(),
            exclusions: Vec::new(),
            max_evidence_per_probe: None,
            preview_chars: None,
            informational: false,
            platforms: Vec::new(),
        }
    }

    pub fn probes(&self) -> &[ProbeSpec] {
        &self.probes
    }

    fn is_excluded(&self, text: &str) -> bool {
        if self.exclusions.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.exclusions.iter().any(|e| lower.contains(e.as_str()))
    }

    fn without_excluded(&self, mut raw: RawOutput) -> RawOutput {
        raw.records.retain(|r| !self.is_excluded(&r.text()));
        raw
    }
}

impl Check for IndicatorCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn platforms(&self) -> &[&'static str] {
        &self.platforms
    }

    fn execute(&self, probe: &dyn Probe) -> CheckResult {
        let mut outputs = Vec::with_capacity(self.probes.len());
        for spec in &self.probes {
            match probe.run(spec) {
                Ok(out) => outputs.push(self.without_excluded(out)),
                Err(e) => {
                    tracing::warn!(check = %self.name, probe = %spec.label(), error = %e, "probe failed");
                    return CheckResult::errored(&self.name, &self.description, e.to_string());
                }
            }
        }

        let now = Utc::now();
        let mut evidence = Vec::new();
        let mut notes = Vec::new();
        let mut suppressed = 0;
        let mut inspected = 0;

        for out in &outputs {
            inspected += out.len();

            if self.informational {
                let room = NOTE_LIMIT.saturating_sub(notes.len());
                notes.extend(out.records.iter().take(room).map(|r| self.clip(r.text())));
                continue;
            }

            let mut found = self.indicators.match_at(&self.name, out, now);
            if let Some(cap) = self.max_evidence_per_probe {
                if found.len() > cap {
                    suppressed += found.len() - cap;
                    found.truncate(cap);
                }
            }
            if let Some(limit) = self.preview_chars {
                found.iter_mut().for_each(|ev| ev.truncate_subject(limit));
            }
            evidence.extend(found);
        }

        CheckResult::from_evidence(&self.name, &self.description, evidence)
            .with_records_inspected(inspected)
            .with_suppressed(suppressed)
            .with_notes(notes)
    }

    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            platforms: self.platforms.iter().map(|p| p.to_string()).collect(),
            probes: self.probes.iter().map(ProbeSpec::label).collect(),
            indicators: self.indicators.indicators().to_vec(),
        }
    }
}

impl IndicatorCheck {
    fn clip(&self, text: String) -> String {
        match self.preview_chars {
            Some(limit) => result::preview(&text, limit),
            None => text,
        }
    }
}

pub struct IndicatorCheckBuilder {
    name: String,
    description: String,
    probes: Vec<ProbeSpec>,
    indicators: Vec<Indicator>,
    exclusions: Vec<String>,
    max_evidence_per_probe: Option<usize>,
    preview_chars: Option<usize>,
    informational: bool,
    platforms: Vec<&'static str>,
}

impl IndicatorCheckBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.into();
        self
    }

    pub fn probe(mut self, spec: ProbeSpec) -> Self {
        self.probes.push(spec);
        self
    }

    pub fn indicator(mut self, indicator: Indicator) -> Self {
        self.indicators.push(indicator);
        self
    }

    pub fn indicators(mut self, indicators: impl IntoIterator<Item = Indicator>) -> Self {
        self.indicators.extend(indicators);
        self
    }

    /// Ignore records containing `pattern` (case insensitive).
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.exclusions.push(pattern.to_lowercase());
        self
    }

    pub fn max_evidence_per_probe(mut self, cap: usize) -> Self {
        self.max_evidence_per_probe = Some(cap);
        self
    }

    pub fn preview_chars(mut self, limit: usize) -> Self {
        self.preview_chars = Some(limit);
        self
    }

    /// No indicators; always passes when the probe succeeds and keeps
    /// the first lines of output as notes.
    pub fn informational(mut self) -> Self {
        self.informational = true;
        self
    }

    pub fn platform(mut self, os: &'static str) -> Self {
        self.platforms.push(os);
        self
    }

    pub fn build(self) -> Result<IndicatorCheck> {
        let invalid = |message: String| ScanError::InvalidIndicator {
            check: self.name.clone(),
            message,
        };

        if self.probes.is_empty() {
            return Err(ScanError::Config(format!("check {} has no probes", self.name)));
        }
        if self.informational && !self.indicators.is_empty() {
            return Err(invalid("informational checks take no indicators".into()));
        }
        if !self.informational && self.indicators.is_empty() {
            return Err(invalid("no indicators defined".into()));
        }
        if self.exclusions.iter().any(|e| e.trim().is_empty()) {
            return Err(invalid("exclusion pattern must not be blank".into()));
        }
        if self.max_evidence_per_probe == Some(0) || self.preview_chars == Some(0) {
            return Err(invalid("evidence limits must be at least 1".into()));
        }

        let indicators = IndicatorSet::compile(self.indicators.clone()).map_err(invalid)?;

        Ok(IndicatorCheck {
            name: self.name,
            description: self.description,
            probes: self.probes,
            indicators,
            exclusions: self.exclusions,
            max_evidence_per_probe: self.max_evidence_per_probe,
            preview_chars: self.preview_chars,
            informational: self.informational,
            platforms: self.platforms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{FixtureProbe, ProbeError, Record};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn lsof() -> ProbeSpec {
        ProbeSpec::command("lsof", ["-i"])
    }

    fn net_check() -> IndicatorCheck {
        IndicatorCheck::builder("net")
            .description("connections")
            .probe(lsof())
            .indicator(Indicator::substring("4444"))
            .build()
            .unwrap()
    }

    #[test]
    fn matching_line_fails_check() {
        let probe = FixtureProbe::new().with_text(
            &lsof(),
            "ssh 192.168.1.5:22->10.0.0.3:4444 ESTABLISHED",
        );
        let result = net_check().execute(&probe);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.evidence.len(), 1);
        assert_eq!(result.records_inspected, 1);
    }

    #[test]
    fn empty_output_passes() {
        let probe = FixtureProbe::new().with_text(&lsof(), "");
        let result = net_check().execute(&probe);
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(result.evidence.is_empty());
        assert!(result.error.is_none());
    }

    #[test]
    fn probe_error_short_circuits_to_error() {
        let second = ProbeSpec::command("netstat", ["-an"]);
        let check = IndicatorCheck::builder("net")
            .probe(lsof())
            .probe(second.clone())
            .indicator(Indicator::substring("4444"))
            .build()
            .unwrap();
        let probe = FixtureProbe::new()
            .with_text(&lsof(), "x:4444")
            .with_error(
                &second,
                ProbeError::PermissionDenied {
                    target: "netstat".into(),
                },
            );

        let result = check.execute(&probe);
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.evidence.is_empty());
        assert_eq!(result.error.as_deref(), Some("permission denied: netstat"));
    }

    #[test]
    fn exclusions_drop_records_before_matching() {
        let spec = ProbeSpec::command("log", ["show"]);
        let check = IndicatorCheck::builder("logs")
            .probe(spec.clone())
            .indicator(Indicator::substring("curl"))
            .exclude("Filtering the log data")
            .build()
            .unwrap();
        let probe = FixtureProbe::new().with_text(
            &spec,
            "Filtering the log data using \"eventMessage CONTAINS \"curl\"\"\n",
        );
        let result = check.execute(&probe);
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.records_inspected, 0);
    }

    #[test]
    fn cap_and_preview_bound_evidence() {
        let spec = ProbeSpec::command("log", ["show"]);
        let check = IndicatorCheck::builder("logs")
            .probe(spec.clone())
            .indicator(Indicator::substring("base64"))
            .max_evidence_per_probe(2)
            .preview_chars(10)
            .build()
            .unwrap();
        let text = (0..5)
            .map(|i| format!("{i} echo ZXZpbA== | base64 -d | sh"))
            .collect::<Vec<_>>()
            .join("\n");
        let probe = FixtureProbe::new().with_text(&spec, &text);

        let result = check.execute(&probe);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.evidence.len(), 2);
        assert_eq!(result.suppressed, 3);
        assert_eq!(result.evidence[0].subject, "0 echo ZXZ...");
    }

    #[test]
    fn informational_check_passes_with_notes() {
        let spec = ProbeSpec::command("systemextensionsctl", ["list"]);
        let check = IndicatorCheck::builder("ext")
            .probe(spec.clone())
            .informational()
            .build()
            .unwrap();
        let probe = FixtureProbe::new().with_text(&spec, "1 extension(s)\n* * com.vendor.net");
        let result = check.execute(&probe);
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.notes, vec!["1 extension(s)", "* * com.vendor.net"]);
    }

    #[test]
    fn informational_check_still_reports_probe_errors() {
        let spec = ProbeSpec::command("systemextensionsctl", ["list"]);
        let check = IndicatorCheck::builder("ext")
            .probe(spec.clone())
            .informational()
            .build()
            .unwrap();
        let probe = FixtureProbe::new().with_error(
            &spec,
            ProbeError::NotInstalled {
                program: "systemextensionsctl".into(),
            },
        );
        assert_eq!(check.execute(&probe).status, CheckStatus::Error);
    }

    #[test]
    fn builder_rejects_bad_definitions() {
        let no_probe = IndicatorCheck::builder("x").indicator(Indicator::substring("a")).build();
        assert!(matches!(no_probe, Err(ScanError::Config(_))));

        let no_indicators = IndicatorCheck::builder("x").probe(lsof()).build();
        assert!(matches!(no_indicators, Err(ScanError::InvalidIndicator { .. })));

        let blank = IndicatorCheck::builder("x")
            .probe(lsof())
            .indicator(Indicator::substring(""))
            .build();
        assert!(matches!(blank, Err(ScanError::InvalidIndicator { .. })));

        let zero_cap = IndicatorCheck::builder("x")
            .probe(lsof())
            .indicator(Indicator::substring("a"))
            .max_evidence_per_probe(0)
            .build();
        assert!(zero_cap.is_err());
    }

    #[test]
    fn age_threshold_check_scenario() {
        let spec = ProbeSpec::file_times(["/Library/LaunchAgents"]);
        let records = vec![Record::file(
            "/Library/LaunchAgents/com.evil.plist",
            Utc::now() - chrono::Duration::days(2),
        )];
        let probe = FixtureProbe::new().with_records(&spec, records);

        let build = |days| {
            IndicatorCheck::builder("launch")
                .probe(spec.clone())
                .indicator(Indicator::age_days(days))
                .build()
                .unwrap()
        };
        assert_eq!(build(7).execute(&probe).status, CheckStatus::Fail);
        assert_eq!(build(1).execute(&probe).status, CheckStatus::Pass);
    }

    #[test]
    fn metadata_lists_probes_and_indicators() {
        let meta = net_check().metadata();
        assert_eq!(meta.probes, vec!["lsof -i"]);
        assert_eq!(meta.indicators, vec![Indicator::substring("4444")]);
    }

    proptest! {
        #[test]
        fn execute_is_total(text in "[ -~\n]{0,400}") {
            let probe = FixtureProbe::new().with_text(&lsof(), &text);
            let result = net_check().execute(&probe);
            prop_assert_ne!(result.status, CheckStatus::Error);
            prop_assert_eq!(result.status == CheckStatus::Fail, !result.evidence.is_empty());
        }
    }
}
