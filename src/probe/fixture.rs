use std::collections::HashMap;
use std::sync::Mutex;

use super::{Probe, ProbeError, ProbeSpec, RawOutput, Record};

/// Replays canned probe output keyed by `ProbeSpec::label()`.
///
/// Lets checks and whole scans run against a frozen snapshot instead of
/// the live host. Unknown probes fail with `ProbeError::Missing`.
#[derive(Debug, Default)]
pub struct FixtureProbe {
    responses: HashMap<String, Result<Vec<Record>, ProbeError>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `spec` with the given text, split into lines.
    pub fn with_text(mut self, spec: &ProbeSpec, text: &str) -> Self {
        let out = RawOutput::from_text(spec.label(), text);
        self.responses.insert(spec.label(), Ok(out.records));
        self
    }

    /// Respond to `spec` with pre-built records.
    pub fn with_records(mut self, spec: &ProbeSpec, records: Vec<Record>) -> Self {
        self.responses.insert(spec.label(), Ok(records));
        self
    }

    /// Fail `spec` with the given error.
    pub fn with_error(mut self, spec: &ProbeSpec, error: ProbeError) -> Self {
        self.responses.insert(spec.label(), Err(error));
        self
    }

    /// Labels of every probe run so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Probe for FixtureProbe {
    fn run(&self, spec: &ProbeSpec) -> Result<RawOutput, ProbeError> {
        let label = spec.label();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(label.clone());
        }
        match self.responses.get(&label) {
            Some(Ok(records)) => Ok(RawOutput::new(label, records.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Err(ProbeError::Missing { path: label }),
        }
    }
}
