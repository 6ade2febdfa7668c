use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};

use super::Indicator;
use crate::checks::Evidence;
use crate::probe::{RawOutput, Record};

/// Compiled form of one indicator.
#[derive(Debug, Clone)]
enum Rule {
    Literal { needle: String, case_sensitive: bool },
    Phrase(Regex),
    Age(Duration),
    Count(usize),
}

/// A validated, compiled list of indicators.
///
/// Matching is a pure function of the raw output, except for age
/// thresholds which compare against the `now` they are given.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    indicators: Vec<Indicator>,
    rules: Vec<Rule>,
}

impl IndicatorSet {
    /// Validate and compile `indicators`. The error names the first
    /// malformed definition.
    pub fn compile(indicators: Vec<Indicator>) -> Result<Self, String> {
        let mut rules = Vec::with_capacity(indicators.len());
        for indicator in &indicators {
            indicator.validate()?;
            rules.push(compile_rule(indicator)?);
        }
        Ok(Self { indicators, rules })
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    /// Match against wall-clock time. See [`IndicatorSet::match_at`].
    pub fn match_output(&self, check: &str, raw: &RawOutput) -> Vec<Evidence> {
        self.match_at(check, raw, Utc::now())
    }

    /// Produce one `Evidence` per record that any indicator flags, in
    /// record order. The first matching indicator is the one recorded,
    /// so a line hitting several patterns is reported once.
    pub fn match_at(&self, check: &str, raw: &RawOutput, now: DateTime<Utc>) -> Vec<Evidence> {
        let over_count: Vec<bool> = self
            .rules
            .iter()
            .map(|rule| matches!(rule, Rule::Count(max) if raw.records.len() > *max))
            .collect();

        let mut evidence = Vec::new();
        for record in &raw.records {
            let hit = self
                .rules
                .iter()
                .enumerate()
                .find(|(idx, rule)| over_count[*idx] || rule_matches(rule, record, now));

            if let Some((idx, _)) = hit {
                evidence.push(Evidence::new(
                    check,
                    &raw.source,
                    record,
                    &self.indicators[idx],
                ));
            }
        }
        evidence
    }
}

fn compile_rule(indicator: &Indicator) -> Result<Rule, String> {
    Ok(match indicator {
        Indicator::Substring {
            pattern,
            case_sensitive,
        } => Rule::Literal {
            needle: if *case_sensitive {
                pattern.clone()
            } else {
                pattern.to_lowercase()
            },
            case_sensitive: *case_sensitive,
        },
        Indicator::Keyword {
            pattern,
            case_sensitive,
        } => Rule::Phrase(phrase_regex(pattern, *case_sensitive)?),
        Indicator::AgeThreshold { days } => Rule::Age(Duration::days(i64::from(*days))),
        Indicator::RecordCount { max } => Rule::Count(*max),
    })
}

/// `curl` → `\bcurl\b`, `bash -i` → `\bbash\s+\-i`: word boundaries only
/// where the phrase starts or ends with a word character. A trailing
/// `-flag` token stays open so bundled short options (`nc -lvp`) match.
fn phrase_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, String> {
    let trimmed = pattern.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let body: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let ends_with_flag = tokens.len() > 1 && tokens.last().is_some_and(|t| t.starts_with('-'));

    let mut source = String::new();
    if is_word(trimmed.chars().next()) {
        source.push_str(r"\b");
    }
    source.push_str(&body.join(r"\s+"));
    if is_word(trimmed.chars().last()) && !ends_with_flag {
        source.push_str(r"\b");
    }

    RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| format!("keyword \"{pattern}\": {e}"))
}

fn rule_matches(rule: &Rule, record: &Record, now: DateTime<Utc>) -> bool {
    match rule {
        Rule::Literal {
            needle,
            case_sensitive,
        } => {
            let text = record.text();
            if *case_sensitive {
                text.contains(needle.as_str())
            } else {
                text.to_lowercase().contains(needle.as_str())
            }
        }
        Rule::Phrase(re) => re.is_match(&record.text()),
        Rule::Age(threshold) => record
            .modified()
            .is_some_and(|modified| now - modified < *threshold),
        // Decided per output, before the record loop.
        Rule::Count(_) => false,
    }
}
