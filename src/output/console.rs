use crate::checks::{CheckResult, CheckStatus};
use crate::report::{ScanReport, Verdict};

/// Render the report as plain text, one block per check in registry order.
pub fn render(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n  tamperscan {} on {} ({} check(s))\n\n",
        report.meta.version, report.meta.platform, report.summary.total
    ));

    for result in &report.results {
        render_result(&mut output, result);
    }

    if !report.skipped.is_empty() {
        output.push_str(&format!("  skipped: {}\n\n", report.skipped.join(", ")));
    }

    let s = &report.summary;
    output.push_str(&format!(
        "  {} passed, {} suspicious, {} could not check\n",
        s.passed, s.failed, s.errored
    ));

    let message = match (report.verdict, s.failed, s.errored) {
        (Verdict::Clean, _, 0) => "no obvious signs of compromise".to_string(),
        (Verdict::Clean, _, n) => format!("no obvious signs of compromise, but {n} check(s) could not run"),
        (Verdict::Suspicious, 0, _) => "some checks could not run; verify them manually".to_string(),
        (Verdict::Suspicious, _, _) => "suspicious indicators found; investigate now".to_string(),
    };
    output.push_str(&format!("  Result: {}, {}\n\n", report.verdict, message));

    output
}

fn render_result(output: &mut String, result: &CheckResult) {
    let tag = match result.status {
        CheckStatus::Pass => "[PASS] ",
        CheckStatus::Fail => "[FAIL] ",
        CheckStatus::Error => "[ERROR]",
    };
    output.push_str(&format!("  {} {:<22} {}\n", tag, result.check, result.description));

    match result.status {
        CheckStatus::Pass => {
            for note in &result.notes {
                output.push_str(&format!("           | {}\n", note));
            }
        }
        CheckStatus::Fail => {
            for ev in &result.evidence {
                output.push_str(&format!("           - {}\n", ev.subject));
                match ev.modified {
                    Some(modified) => output.push_str(&format!(
                        "             {} (modified {})\n",
                        ev.indicator,
                        modified.format("%Y-%m-%d %H:%M:%S UTC")
                    )),
                    None => output.push_str(&format!("             {}\n", ev.indicator)),
                }
            }
            if result.suppressed > 0 {
                output.push_str(&format!("           ... {} more match(es) not shown\n", result.suppressed));
            }
        }
        CheckStatus::Error => {
            let cause = result.error.as_deref().unwrap_or("unknown error");
            output.push_str(&format!("           could not check: {}\n", cause));
        }
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::Evidence;
    use crate::indicator::Indicator;
    use crate::probe::Record;
    use crate::report::{aggregate, Policy, ScanMeta};
    use chrono::Utc;

    fn report(results: Vec<CheckResult>) -> ScanReport {
        let now = Utc::now();
        aggregate(ScanMeta::new(now, now), results, vec![], &Policy::default())
    }

    #[test]
    fn distinguishes_fail_from_error() {
        let ev = Evidence::new(
            "network-connections",
            "lsof",
            &Record::line("bot 666 TCP 10.0.0.2:50300->198.51.100.7:6667"),
            &Indicator::substring(":6667"),
        );
        let text = render(&report(vec![
            CheckResult::from_evidence("network-connections", "ports", vec![ev]),
            CheckResult::errored("scheduled-tasks", "cron", "`crontab` is not installed or not on PATH"),
            CheckResult::from_evidence("logged-in-users", "who", vec![]),
        ]));

        assert!(text.contains("[FAIL]  network-connections"));
        assert!(text.contains("- bot 666 TCP 10.0.0.2:50300->198.51.100.7:6667"));
        assert!(text.contains("[ERROR] scheduled-tasks"));
        assert!(text.contains("could not check: `crontab` is not installed"));
        assert!(text.contains("[PASS]  logged-in-users"));
        assert!(text.contains("1 passed, 1 suspicious, 1 could not check"));
        assert!(text.contains("Result: SUSPICIOUS"));

        let fail_at = text.find("network-connections").unwrap();
        let error_at = text.find("scheduled-tasks").unwrap();
        assert!(fail_at < error_at);
    }

    #[test]
    fn clean_report() {
        let text = render(&report(vec![CheckResult::from_evidence("a", "b", vec![])]));
        assert!(text.contains("Result: CLEAN, no obvious signs of compromise"));
    }

    #[test]
    fn errors_only_says_so() {
        let text = render(&report(vec![CheckResult::errored("a", "b", "boom")]));
        assert!(text.contains("some checks could not run"));
    }
}
