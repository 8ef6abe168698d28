//! Regex: compiled matcher helpers and well-known noise patterns.

use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("at least one pattern required")]
    Empty,
}

/// Frequent, low-value lines that drown real events.
pub struct Patterns;

impl Patterns {
    pub const HEALTHCHECK: &'static str =
        r"(?i)(healthcheck|health.check|/health|/ready|/live|/ping)";

    /// Front-end polling endpoints that log on every request.
    pub const POLLING: &'static str = r"GET /(features|settings)\b";

    pub fn builtin_noise() -> &'static [&'static str] {
        &[Self::HEALTHCHECK, Self::POLLING]
    }
}

pub fn compile(pattern: &str, case_insensitive: bool) -> Result<RegexMatcher, PatternError> {
    RegexMatcherBuilder::new()
        .case_insensitive(case_insensitive)
        .multi_line(false)
        .build(pattern)
        .map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// One case-insensitive matcher that fires when **any** pattern matches.
///
/// Each pattern is wrapped in a non-capturing group before joining with `|`
/// so alternations inside a pattern stay scoped.
pub fn any_of<S: AsRef<str>>(patterns: &[S]) -> Result<RegexMatcher, PatternError> {
    match patterns {
        [] => Err(PatternError::Empty),
        [only] => compile(only.as_ref(), true),
        many => {
            // Validate individually first so the error names the bad pattern.
            for p in many {
                compile(p.as_ref(), true)?;
            }
            let combined = many
                .iter()
                .map(|p| format!("(?:{})", p.as_ref()))
                .collect::<Vec<_>>()
                .join("|");
            compile(&combined, true)
        }
    }
}
