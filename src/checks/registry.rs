use once_cell::sync::Lazy;
use regex::Regex;

use super::{builtin, Check};
use crate::error::{Result, ScanError};

static CHECK_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap());

struct Entry {
    check: Box<dyn Check>,
    enabled: bool,
}

/// Ordered collection of checks. Registration order is report order.
#[derive(Default)]
pub struct CheckRegistry {
    entries: Vec<Entry>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in check. Checks tied to another OS are
    /// registered but disabled.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for check in builtin::all_checks()? {
            registry.register(check)?;
        }
        for entry in &mut registry.entries {
            if !entry.check.supports_current_platform() {
                tracing::debug!(check = entry.check.name(), os = std::env::consts::OS, "not applicable on this platform");
                entry.enabled = false;
            }
        }
        Ok(registry)
    }

    /// Append a check. Names must be unique and kebab-case.
    pub fn register(&mut self, check: Box<dyn Check>) -> Result<()> {
        let name = check.name();
        if !CHECK_NAME.is_match(name) {
            return Err(ScanError::InvalidCheckName(name.into()));
        }
        if self.get(name).is_some() {
            return Err(ScanError::DuplicateCheck(name.into()));
        }
        self.entries.push(Entry {
            check,
            enabled: true,
        });
        Ok(())
    }

    pub fn enable(&mut self, name: &str) -> Result<()> {
        self.set_enabled(name, true)
    }

    pub fn disable(&mut self, name: &str) -> Result<()> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.check.name() == name)
            .ok_or_else(|| ScanError::UnknownCheck(name.into()))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Disable every check whose name matches the glob `pattern`.
    /// Returns how many checks the pattern matched.
    pub fn disable_matching(&mut self, pattern: &str) -> Result<usize> {
        let pattern = compile_pattern(pattern)?;
        let mut matched = 0;
        for entry in &mut self.entries {
            if pattern.matches(entry.check.name()) {
                entry.enabled = false;
                matched += 1;
            }
        }
        Ok(matched)
    }

    /// Keep only checks matching at least one of `patterns` enabled.
    /// An empty list leaves the registry untouched. Returns the patterns
    /// that matched no registered check.
    pub fn retain_matching(&mut self, patterns: &[String]) -> Result<Vec<String>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        let compiled = patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>>>()?;
        let mut hits = vec![0usize; compiled.len()];
        for entry in &mut self.entries {
            let mut kept = false;
            for (pattern, hit) in compiled.iter().zip(&mut hits) {
                if pattern.matches(entry.check.name()) {
                    *hit += 1;
                    kept = true;
                }
            }
            if !kept {
                entry.enabled = false;
            }
        }
        Ok(patterns
            .iter()
            .zip(hits)
            .filter(|(_, hit)| *hit == 0)
            .map(|(p, _)| p.clone())
            .collect())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Check> {
        self.entries
            .iter()
            .find(|e| e.check.name() == name)
            .map(|e| e.check.as_ref())
    }

    /// Enabled checks, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &dyn Check> + '_ {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.check.as_ref())
    }

    /// Every check with its enabled flag, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&dyn Check, bool)> + '_ {
        self.entries.iter().map(|e| (e.check.as_ref(), e.enabled))
    }

    /// Names of disabled checks, in registration order.
    pub fn skipped(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.enabled)
            .map(|e| e.check.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compile_pattern(pattern: &str) -> Result<glob::Pattern> {
    glob::Pattern::new(pattern)
        .map_err(|e| ScanError::Config(format!("invalid check pattern '{pattern}': {e}")))
}
