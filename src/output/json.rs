use crate::error::Result;
use crate::report::ScanReport;

/// Render the full report as pretty-printed JSON.
pub fn render(report: &ScanReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckResult;
    use crate::report::{aggregate, Policy, ScanMeta};
    use chrono::Utc;

    #[test]
    fn round_trips_through_serde() {
        let now = Utc::now();
        let report = aggregate(
            ScanMeta::new(now, now),
            vec![CheckResult::errored("scheduled-tasks", "cron", "`crontab` is not installed or not on PATH")],
            vec!["launch-items".into()],
            &Policy::default(),
        );
        let json = render(&report).unwrap();
        assert!(json.contains("\"verdict\": \"SUSPICIOUS\""));
        assert!(json.contains("\"status\": \"ERROR\""));
        let back: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
