use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checks::CheckRegistry;
use crate::error::{Result, ScanError};
use crate::report::Policy;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tamperscan.toml";

/// Top-level configuration from `.tamperscan.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub checks: CheckSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Worker threads. 1 runs checks sequentially.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Upper bound on each probe invocation.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_jobs() -> usize {
    1
}

fn default_probe_timeout() -> u64 {
    30
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

/// Which registered checks run. Patterns are globs over check names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSelection {
    #[serde(default)]
    pub disable: Vec<String>,
    /// If non-empty, only matching checks run.
    #[serde(default)]
    pub only: Vec<String>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.jobs == 0 {
            return Err(ScanError::Config("scan.jobs must be at least 1".into()));
        }
        if self.scan.probe_timeout_secs == 0 {
            return Err(ScanError::Config(
                "scan.probe_timeout_secs must be at least 1".into(),
            ));
        }
        for pattern in self.checks.disable.iter().chain(&self.checks.only) {
            glob::Pattern::new(pattern).map_err(|e| {
                ScanError::Config(format!("invalid check pattern '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.probe_timeout_secs)
    }

    /// Apply the check selection to a registry.
    ///
    /// An `only` selection that leaves nothing to run is an error rather
    /// than an empty, trivially clean scan.
    pub fn apply(&self, registry: &mut CheckRegistry) -> Result<()> {
        for pattern in &self.checks.disable {
            if registry.disable_matching(pattern)? == 0 {
                tracing::warn!(pattern = %pattern, "disable pattern matches no check");
            }
        }
        for pattern in registry.retain_matching(&self.checks.only)? {
            tracing::warn!(pattern = %pattern, "only pattern matches no check");
        }
        if !self.checks.only.is_empty() && registry.all().next().is_none() {
            return Err(ScanError::Config(format!(
                "checks.only [{}] leaves no check to run",
                self.checks.only.join(", ")
            )));
        }
        Ok(())
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# tamperscan configuration

[scan]
# Worker threads; 1 runs checks one after another.
jobs = 1
# Seconds before a hung probe is killed and reported as an error.
# The unified-log queries of system-logs always get at least 180.
probe_timeout_secs = 30

[policy]
# Exit with status 1 when the verdict is SUSPICIOUS.
strict = false
# Don't let checks that could not run spoil a CLEAN verdict.
ignore_errors = false

[checks]
# Glob patterns of checks to skip.
# disable = ["system-extensions", "logged-in-users"]

# Run only these checks.
# only = ["network-*", "suspicious-processes"]
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(Path::new("/tamperscan/none.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.jobs, 1);
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn starter_config_parses_to_defaults() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            "[policy]\nstrict = true\n\n[checks]\ndisable = [\"system-*\"]\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert!(config.policy.strict);
        assert!(!config.policy.ignore_errors);
        assert_eq!(config.scan, ScanSettings::default());
        assert_eq!(config.checks.disable, vec!["system-*"]);
    }

    #[test]
    fn rejects_zero_jobs_and_bad_globs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");

        fs::write(&path, "[scan]\njobs = 0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ScanError::Config(_))));

        fs::write(&path, "[checks]\nonly = [\"[\"]\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ScanError::Config(_))));

        fs::write(&path, "[scan\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ScanError::Toml(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn only_selection_matching_nothing_is_error() {
        let mut registry = CheckRegistry::builtin().unwrap();
        let config = Config {
            checks: CheckSelection {
                disable: vec![],
                only: vec!["netwrok-*".into()],
            },
            ..Config::default()
        };
        let err = config.apply(&mut registry).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("netwrok-*"));
    }

    #[test]
    fn apply_disables_and_restricts() {
        let mut registry = CheckRegistry::builtin().unwrap();
        let config = Config {
            checks: CheckSelection {
                disable: vec!["logged-in-users".into()],
                only: vec!["network-*".into(), "logged-*".into(), "suspicious-*".into()],
            },
            ..Config::default()
        };
        config.apply(&mut registry).unwrap();
        let enabled: Vec<&str> = registry.all().map(|c| c.name()).collect();
        assert_eq!(enabled, vec!["network-connections", "suspicious-processes"]);
    }
}
