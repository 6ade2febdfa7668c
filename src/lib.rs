//! tamperscan: heuristic host-compromise scanner.
//!
//! Probes live system state (sockets, processes, cron, launch items,
//! recently modified binaries, privacy grants, system extensions and the
//! unified log) and flags entries that match known indicators of
//! compromise. One on-demand pass, no daemon, nothing is blocked or killed.
//!
//! # Quick Start
//!
//! ```no_run
//! use tamperscan::{scan, ScanOptions};
//!
//! let report = scan(&ScanOptions::default()).unwrap();
//! println!("{} ({} suspicious)", report.verdict, report.summary.failed);
//! ```

pub mod checks;
pub mod config;
pub mod error;
pub mod indicator;
pub mod output;
pub mod probe;
pub mod report;
pub mod runner;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use checks::CheckRegistry;
use config::Config;
use error::Result;
use output::OutputFormat;
use probe::{Probe, SystemProbe};
use report::ScanReport;
use runner::ScanRunner;

/// Options for a scan invocation. `None`/empty fields defer to the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.tamperscan.toml` in the working dir).
    pub config_path: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub probe_timeout: Option<Duration>,
    /// Force strict exit codes on.
    pub strict: bool,
    /// Extra glob patterns of checks to skip.
    pub skip: Vec<String>,
    /// Glob patterns of the only checks to run.
    pub only: Vec<String>,
}

/// Load the config file and layer CLI overrides on top.
pub fn load_config(options: &ScanOptions) -> Result<Config> {
    let path = options
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let mut config = Config::load(&path)?;

    if let Some(jobs) = options.jobs {
        config.scan.jobs = jobs;
    }
    if let Some(timeout) = options.probe_timeout {
        config.scan.probe_timeout_secs = timeout.as_secs();
    }
    if options.strict {
        config.policy.strict = true;
    }
    config.checks.disable.extend(options.skip.iter().cloned());
    if !options.only.is_empty() {
        config.checks.only = options.only.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Built-in registry with the config's check selection applied.
pub fn build_registry(config: &Config) -> Result<CheckRegistry> {
    let mut registry = CheckRegistry::builtin()?;
    config.apply(&mut registry)?;
    Ok(registry)
}

/// Run a scan with an explicit probe adapter.
///
/// Configuration problems surface here, before any probe runs. Once the
/// scan starts it always produces a report.
pub fn scan_with(config: &Config, probe: Arc<dyn Probe>) -> Result<ScanReport> {
    let registry = build_registry(config)?;
    let runner = ScanRunner::new(probe)
        .with_jobs(config.scan.jobs)
        .with_policy(config.policy.clone());
    Ok(runner.run(&registry))
}

/// Run a complete scan against the live system.
pub fn scan(options: &ScanOptions) -> Result<ScanReport> {
    let config = load_config(options)?;
    let probe = Arc::new(SystemProbe::new(config.probe_timeout()));
    scan_with(&config, probe)
}

/// Render a scan report in the specified format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}
