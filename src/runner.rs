//! Scan runner: executes every enabled check with total isolation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::Utc;

use crate::checks::{Check, CheckRegistry, CheckResult};
use crate::probe::Probe;
use crate::report::{aggregate, Policy, ScanMeta, ScanReport};

/// Runs the registry against a probe adapter and aggregates the results.
///
/// A check that panics is recorded as `ERROR` for that check alone; the
/// rest of the scan carries on. With `jobs > 1` checks run on a bounded
/// pool of scoped threads, but results always come back in registry
/// order.
pub struct ScanRunner {
    probe: Arc<dyn Probe>,
    jobs: usize,
    policy: Policy,
}

impl ScanRunner {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            jobs: 1,
            policy: Policy::default(),
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(&self, registry: &CheckRegistry) -> ScanReport {
        let started = Utc::now();
        let checks: Vec<&dyn Check> = registry.all().collect();
        tracing::info!(checks = checks.len(), jobs = self.jobs, "scan started");

        let results = if self.jobs == 1 || checks.len() <= 1 {
            checks.iter().map(|c| self.execute_isolated(*c)).collect()
        } else {
            self.run_pool(&checks)
        };

        let report = aggregate(
            ScanMeta::new(started, Utc::now()),
            results,
            registry.skipped(),
            &self.policy,
        );
        tracing::info!(verdict = %report.verdict, fingerprint = %report.fingerprint, "scan finished");
        report
    }

    fn run_pool(&self, checks: &[&dyn Check]) -> Vec<CheckResult> {
        let next = AtomicUsize::new(0);
        let workers = self.jobs.min(checks.len());
        let mut slots: Vec<Option<CheckResult>> = vec![None; checks.len()];

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let idx = next.fetch_add(1, Ordering::Relaxed);
                            let Some(check) = checks.get(idx) else { break };
                            done.push((idx, self.execute_isolated(*check)));
                        }
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (idx, result) in done {
                            slots[idx] = Some(result);
                        }
                    }
                    Err(_) => tracing::warn!("scan worker died"),
                }
            }
        });

        slots
            .into_iter()
            .zip(checks)
            .map(|(slot, check)| {
                slot.unwrap_or_else(|| {
                    CheckResult::errored(check.name(), check.description(), "scan worker died")
                })
            })
            .collect()
    }

    fn execute_isolated(&self, check: &dyn Check) -> CheckResult {
        tracing::debug!(check = check.name(), "check started");
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| check.execute(self.probe.as_ref())));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(check = check.name(), panic = %message, "check panicked");
                CheckResult::errored(
                    check.name(),
                    check.description(),
                    format!("check panicked: {message}"),
                )
            }
        };

        tracing::info!(check = check.name(), status = %result.status, elapsed_ms, "check finished");
        result.with_duration_ms(elapsed_ms)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CheckStatus, IndicatorCheck};
    use crate::indicator::Indicator;
    use crate::probe::{FixtureProbe, ProbeSpec};
    use crate::report::Verdict;
    use pretty_assertions::assert_eq;

    struct Exploding;

    impl Check for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn execute(&self, _probe: &dyn Probe) -> CheckResult {
            panic!("index out of range");
        }
    }

    fn spec(n: usize) -> ProbeSpec {
        ProbeSpec::command("probe", [n.to_string()])
    }

    fn check(n: usize) -> Box<dyn Check> {
        Box::new(
            IndicatorCheck::builder(&format!("check-{n}"))
                .probe(spec(n))
                .indicator(Indicator::substring("bad"))
                .build()
                .unwrap(),
        )
    }

    fn setup(count: usize) -> (CheckRegistry, Arc<FixtureProbe>) {
        let mut registry = CheckRegistry::new();
        let mut probe = FixtureProbe::new();
        for n in 0..count {
            registry.register(check(n)).unwrap();
            let text = if n % 3 == 0 { "bad line" } else { "fine line" };
            probe = probe.with_text(&spec(n), text);
        }
        (registry, Arc::new(probe))
    }

    fn statuses(report: &ScanReport) -> Vec<(String, CheckStatus)> {
        report
            .results
            .iter()
            .map(|r| (r.check.clone(), r.status))
            .collect()
    }

    #[test]
    fn panicking_check_is_isolated() {
        let mut registry = CheckRegistry::new();
        registry.register(check(0)).unwrap();
        registry.register(Box::new(Exploding)).unwrap();
        registry.register(check(1)).unwrap();
        let probe = FixtureProbe::new()
            .with_text(&spec(0), "bad line")
            .with_text(&spec(1), "fine line");
        let report = ScanRunner::new(Arc::new(probe)).run(&registry);

        assert_eq!(
            statuses(&report),
            vec![
                ("check-0".to_string(), CheckStatus::Fail),
                ("exploding".to_string(), CheckStatus::Error),
                ("check-1".to_string(), CheckStatus::Pass),
            ]
        );
        let exploded = report.result("exploding").unwrap();
        assert_eq!(exploded.error.as_deref(), Some("check panicked: index out of range"));
    }

    #[test]
    fn order_is_deterministic_across_runs() {
        let (registry, probe) = setup(6);
        let runner = ScanRunner::new(probe);
        let first = runner.run(&registry);
        let second = runner.run(&registry);
        assert_eq!(statuses(&first), statuses(&second));
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn pool_matches_sequential() {
        let (mut registry, probe) = setup(10);
        registry.register(Box::new(Exploding)).unwrap();
        let sequential = ScanRunner::new(probe.clone()).run(&registry);
        let pooled = ScanRunner::new(probe).with_jobs(4).run(&registry);
        assert_eq!(statuses(&sequential), statuses(&pooled));
        assert_eq!(sequential.fingerprint, pooled.fingerprint);
    }

    #[test]
    fn probe_error_does_not_affect_other_checks() {
        let (mut registry, probe) = setup(2);
        // no fixture for probe 5 → Missing
        registry.register(check(5)).unwrap();
        let report = ScanRunner::new(probe).run(&registry);
        assert_eq!(report.result("check-5").unwrap().status, CheckStatus::Error);
        assert_eq!(report.result("check-1").unwrap().status, CheckStatus::Pass);
        assert_eq!(report.verdict, Verdict::Suspicious);
    }

    #[test]
    fn disabled_checks_are_skipped_not_run() {
        let (mut registry, probe) = setup(3);
        registry.disable("check-0").unwrap();
        let report = ScanRunner::new(probe.clone()).run(&registry);
        assert_eq!(report.skipped, vec!["check-0"]);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.verdict, Verdict::Clean);
        assert_eq!(probe.calls(), vec!["probe 1", "probe 2"]);
    }

    #[test]
    fn empty_registry_is_clean() {
        let report = ScanRunner::new(Arc::new(FixtureProbe::new())).run(&CheckRegistry::new());
        assert!(report.is_clean());
        assert_eq!(report.summary.total, 0);
    }
}
