//! Ordered severity rules. First matching rule wins; nothing matching is
//! `unknown`.

use grep_matcher::Matcher;
use grep_regex::RegexMatcher;

use crate::filter::regex::{any_of, compile, PatternError};
use crate::record::Severity;

pub const ERROR_PATTERN: &str = r"(?i)(error|failure|failed|fatal|crit|panic|emerg|alert)";
pub const WARNING_PATTERN: &str = r"(?i)(warning|warn)";
pub const INFO_PATTERN: &str = r"(?i)(\binfo\b|\bnotice\b)";

const ERROR_IGNORE: &[&str] = &[
    r"(?i)\bno errors?\b",
    r"(?i)\b0 errors?\b",
    r"(?i)success(fully)?",
    r"INFO:",
    r"(?i)errors?[=:] ?(0|none|null)\b",
];

const WARNING_IGNORE: &[&str] = &[r"(?i)\bno warnings?\b"];

pub struct SeverityRule {
    severity: Severity,
    matcher: RegexMatcher,
    ignore: Option<RegexMatcher>,
}

impl SeverityRule {
    pub fn new(severity: Severity, pattern: &str, ignore: &[&str]) -> Result<Self, PatternError> {
        Ok(Self {
            severity,
            matcher: compile(pattern, true)?,
            ignore: if ignore.is_empty() { None } else { Some(any_of(ignore)?) },
        })
    }

    /// The rule fires when its pattern matches and no ignore pattern does.
    fn fires(&self, text: &[u8]) -> bool {
        if !self.matcher.is_match(text).unwrap_or(false) {
            return false;
        }
        match &self.ignore {
            Some(ignore) => !ignore.is_match(text).unwrap_or(false),
            None => true,
        }
    }
}

pub struct SeverityRules {
    rules: Vec<SeverityRule>,
}

impl SeverityRules {
    /// error → warning → info.
    pub fn baseline() -> Result<Self, PatternError> {
        Ok(Self {
            rules: vec![
                SeverityRule::new(Severity::Error, ERROR_PATTERN, ERROR_IGNORE)?,
                SeverityRule::new(Severity::Warning, WARNING_PATTERN, WARNING_IGNORE)?,
                SeverityRule::new(Severity::Info, INFO_PATTERN, &[])?,
            ],
        })
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn push(&mut self, rule: SeverityRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn classify(&self, text: &str) -> Severity {
        let bytes = text.as_bytes();
        self.rules
            .iter()
            .find(|r| r.fires(bytes))
            .map(|r| r.severity)
            .unwrap_or(Severity::Unknown)
    }
}
