//! Indicators of compromise and the matcher that applies them.

pub mod matcher;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use matcher::IndicatorSet;

/// An atomic suspicion rule. Immutable once a check is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Indicator {
    /// The record contains `pattern` anywhere.
    Substring {
        pattern: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// The record contains `pattern` as a whole word or phrase. Runs of
    /// whitespace between the phrase's words match any whitespace run.
    Keyword {
        pattern: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// A file record modified less than `days` ago.
    AgeThreshold { days: u32 },
    /// The output holds more than `max` records; all of them are flagged.
    RecordCount { max: usize },
}

impl Indicator {
    pub fn substring(pattern: impl Into<String>) -> Self {
        Self::Substring {
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    pub fn keyword(pattern: impl Into<String>) -> Self {
        Self::Keyword {
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    pub fn age_days(days: u32) -> Self {
        Self::AgeThreshold { days }
    }

    pub fn max_records(max: usize) -> Self {
        Self::RecordCount { max }
    }

    /// Make a text indicator case sensitive. No-op for the others.
    pub fn case_sensitive(mut self) -> Self {
        match &mut self {
            Self::Substring { case_sensitive, .. } | Self::Keyword { case_sensitive, .. } => {
                *case_sensitive = true;
            }
            Self::AgeThreshold { .. } | Self::RecordCount { .. } => {}
        }
        self
    }

    /// Build substring indicators from a list of literals.
    pub fn substrings<I, S>(patterns: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        patterns.into_iter().map(Self::substring).collect()
    }

    /// Build keyword indicators from a list of words or phrases.
    pub fn keywords<I, S>(patterns: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        patterns.into_iter().map(Self::keyword).collect()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Substring { .. } => "substring-match",
            Self::Keyword { .. } => "keyword-match",
            Self::AgeThreshold { .. } => "age-threshold",
            Self::RecordCount { .. } => "record-count",
        }
    }

    /// Reject definitions that could never match or would match
    /// everything by accident.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Substring { pattern, .. } | Self::Keyword { pattern, .. } => {
                if pattern.trim().is_empty() {
                    return Err(format!("{} pattern must not be blank", self.kind()));
                }
            }
            Self::AgeThreshold { days } => {
                if *days == 0 {
                    return Err("age-threshold must be at least 1 day".into());
                }
            }
            Self::RecordCount { .. } => {}
        }
        Ok(())
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring { pattern, .. } => write!(f, "substring \"{pattern}\""),
            Self::Keyword { pattern, .. } => write!(f, "keyword \"{pattern}\""),
            Self::AgeThreshold { days } => write!(f, "modified within {days} day(s)"),
            Self::RecordCount { max } => write!(f, "more than {max} record(s)"),
        }
    }
}
