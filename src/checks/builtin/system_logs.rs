use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

const KEYWORDS: &[&str] = &[
    "launchctl",
    "curl",
    "wget",
    "bash -i",
    "reverse shell",
    "base64",
    "python -m http.server",
];

const WINDOW: &str = "7d";

/// Characters of each log line kept in the report.
const PREVIEW_CHARS: usize = 1000;

/// Log lines kept per keyword.
const LINES_PER_KEYWORD: usize = 5;

/// `log show` over a week of history routinely outlasts the default budget.
const QUERY_TIMEOUT_SECS: u64 = 180;

/// One unified-log query per keyword.
pub fn probes() -> Vec<ProbeSpec> {
    KEYWORDS
        .iter()
        .map(|kw| {
            ProbeSpec::command(
                "log",
                [
                    "show".to_string(),
                    "--predicate".to_string(),
                    format!("eventMessage CONTAINS \"{kw}\""),
                    "--info".to_string(),
                    "--last".to_string(),
                    WINDOW.to_string(),
                ],
            )
            .min_timeout(QUERY_TIMEOUT_SECS)
        })
        .collect()
}

pub fn check() -> Result<IndicatorCheck> {
    let mut builder = IndicatorCheck::builder("system-logs")
        .description("Unified log entries mentioning download or shell tooling (last 7 days)");
    for spec in probes() {
        builder = builder.probe(spec);
    }
    builder
        .indicators(Indicator::substrings(KEYWORDS.iter().copied()))
        // `log show` echoes its own predicate
        .exclude("Filtering the log data using")
        .max_evidence_per_probe(LINES_PER_KEYWORD)
        .preview_chars(PREVIEW_CHARS)
        .platform("macos")
        .build()
}
