//! Probe adapters: dumb I/O against the live system.
//!
//! A probe runs one external data-gathering operation and hands back
//! `RawOutput` without interpreting it. Every failure to gather data is
//! a `ProbeError`; probes never panic and never retry.

pub mod command;
pub mod filesystem;
pub mod fixture;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fixture::FixtureProbe;

/// Default per-probe timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifies one external data source and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeSpec {
    /// Spawn a program and capture stdout line by line.
    Command {
        program: String,
        args: Vec<String>,
        /// Exit codes treated as success besides 0.
        #[serde(default)]
        ok_exit_codes: Vec<i32>,
        /// If stderr contains this marker on failure, the source is
        /// empty rather than broken (e.g. "no crontab for").
        #[serde(default)]
        quiet_marker: Option<String>,
        /// Lower bound on the time budget, for tools known to be slow.
        #[serde(default)]
        min_timeout_secs: Option<u64>,
    },
    /// Walk directory trees and report every file's mtime.
    FileTimes { roots: Vec<PathBuf> },
    /// Query an SQLite database through the `sqlite3` CLI.
    Sqlite { database: PathBuf, query: String },
}

impl ProbeSpec {
    pub fn command<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Command {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ok_exit_codes: Vec::new(),
            quiet_marker: None,
            min_timeout_secs: None,
        }
    }

    /// Accept an extra exit code as success. No-op for non-command probes.
    pub fn accept_exit(mut self, code: i32) -> Self {
        if let Self::Command { ok_exit_codes, .. } = &mut self {
            ok_exit_codes.push(code);
        }
        self
    }

    /// Treat a failing command whose stderr contains `marker` as empty.
    pub fn quiet_when(mut self, marker: &str) -> Self {
        if let Self::Command { quiet_marker, .. } = &mut self {
            *quiet_marker = Some(marker.into());
        }
        self
    }

    /// Give a slow command at least `secs` seconds, even when the
    /// configured probe timeout is shorter.
    pub fn min_timeout(mut self, secs: u64) -> Self {
        if let Self::Command {
            min_timeout_secs, ..
        } = &mut self
        {
            *min_timeout_secs = Some(secs);
        }
        self
    }

    pub fn file_times<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::FileTimes {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn sqlite(database: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self::Sqlite {
            database: database.into(),
            query: query.into(),
        }
    }

    /// Stable, human-readable label. Used in evidence and as the key for
    /// canned output in `FixtureProbe`.
    pub fn label(&self) -> String {
        match self {
            Self::Command { program, args, .. } => {
                if args.is_empty() {
                    program.clone()
                } else {
                    format!("{} {}", program, args.join(" "))
                }
            }
            Self::FileTimes { roots } => {
                let roots: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
                format!("mtimes {}", roots.join(", "))
            }
            Self::Sqlite { database, query } => {
                format!("sqlite3 {} {}", database.display(), query)
            }
        }
    }
}

/// One record of probe output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Line { text: String },
    File {
        path: PathBuf,
        modified: DateTime<Utc>,
    },
}

impl Record {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line { text: text.into() }
    }

    pub fn file(path: impl Into<PathBuf>, modified: DateTime<Utc>) -> Self {
        Self::File {
            path: path.into(),
            modified,
        }
    }

    /// Text that substring and keyword indicators are tested against.
    pub fn text(&self) -> String {
        match self {
            Self::Line { text } => text.clone(),
            Self::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Line { .. } => None,
            Self::File { modified, .. } => Some(*modified),
        }
    }
}

/// Ordered output of one probe invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutput {
    /// Label of the probe that produced this output.
    pub source: String,
    pub records: Vec<Record>,
}

impl RawOutput {
    pub fn new(source: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    /// Split text into `Line` records, dropping blank lines.
    pub fn from_text(source: impl Into<String>, text: &str) -> Self {
        let records = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .map(Record::line)
            .collect();
        Self::new(source, records)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// The external data source could not be queried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("`{program}` is not installed or not on PATH")]
    NotInstalled { program: String },

    #[error("permission denied: {target}")]
    PermissionDenied { target: String },

    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("`{program}` exited with {status} and no output: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("`{program}` timed out after {seconds:.1}s")]
    TimedOut { program: String, seconds: f64 },

    #[error("{path} does not exist")]
    Missing { path: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// A probe adapter: runs one `ProbeSpec` against some data source.
///
/// `SystemProbe` talks to the live machine; `FixtureProbe` replays canned
/// output so checks can be exercised without touching the host.
pub trait Probe: Send + Sync {
    fn run(&self, spec: &ProbeSpec) -> Result<RawOutput, ProbeError>;
}

/// Probe adapter backed by the live system.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    timeout: Duration,
}

impl SystemProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time allowed for `spec`: the configured timeout, raised to the
    /// spec's own floor if it has one.
    pub fn budget(&self, spec: &ProbeSpec) -> Duration {
        match spec {
            ProbeSpec::Command {
                min_timeout_secs: Some(secs),
                ..
            } => self.timeout.max(Duration::from_secs(*secs)),
            _ => self.timeout,
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Probe for SystemProbe {
    fn run(&self, spec: &ProbeSpec) -> Result<RawOutput, ProbeError> {
        let label = spec.label();
        match spec {
            ProbeSpec::Command {
                program,
                args,
                ok_exit_codes,
                quiet_marker,
                ..
            } => {
                let out = command::run(program, args, self.budget(spec))?;
                let text = out.accept(program, ok_exit_codes, quiet_marker.as_deref())?;
                Ok(RawOutput::from_text(label, &text))
            }
            ProbeSpec::FileTimes { roots } => {
                let roots: Vec<PathBuf> = roots.iter().map(|r| filesystem::expand_home(r)).collect();
                let records = filesystem::file_times(&roots)?;
                Ok(RawOutput::new(label, records))
            }
            ProbeSpec::Sqlite { database, query } => {
                let database = filesystem::expand_home(database);
                if !database.exists() {
                    return Err(ProbeError::Missing {
                        path: database.display().to_string(),
                    });
                }
                let args = vec![database.display().to_string(), query.clone()];
                let out = command::run("sqlite3", &args, self.timeout)?;
                let text = out.accept("sqlite3", &[], None)?;
                Ok(RawOutput::from_text(label, &text))
            }
        }
    }
}
