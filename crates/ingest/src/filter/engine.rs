use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use grep_matcher::Matcher;
use grep_regex::RegexMatcher;
use serde::Serialize;

use crate::filter::regex::{any_of, PatternError, Patterns};
use crate::record::{Record, Severity};

// ── Severity filter ─────────────────────────────────────────────

/// Severities a run keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeveritySet(BTreeSet<Severity>);

impl SeveritySet {
    pub fn all() -> Self {
        Self(Severity::ALL.into_iter().collect())
    }

    pub fn only<I: IntoIterator<Item = Severity>>(severities: I) -> Self {
        Self(severities.into_iter().collect())
    }

    #[inline]
    pub fn contains(&self, severity: Severity) -> bool {
        self.0.contains(&severity)
    }

    pub fn is_all(&self) -> bool {
        self.0.len() == Severity::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The set minus `severity`.
    pub fn without(mut self, severity: Severity) -> Self {
        self.0.remove(&severity);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Severity> + '_ {
        self.0.iter().copied()
    }
}

impl Default for SeveritySet {
    fn default() -> Self {
        Self::all()
    }
}

/// `"errors"`, `"error,warning"`, `"all"`.
impl FromStr for SeveritySet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        let set = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Severity::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if set.is_empty() {
            return Err("severity list is empty".to_string());
        }
        Ok(Self(set))
    }
}

// ── Exclusion filter ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FilterStats {
    pub records_scanned: AtomicU64,
    pub records_dropped: AtomicU64,
}

/// Snapshot of [`FilterStats`] for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    /// Records that reached the exclusion pass.
    pub scanned: u64,
    /// Records an exclusion pattern dropped.
    pub excluded: u64,
}

/// Drops records whose `normalized_message` matches any exclusion pattern.
pub struct ExclusionFilter {
    matcher: Option<RegexMatcher>,
    stats: FilterStats,
}

impl ExclusionFilter {
    /// Filter that drops nothing.
    pub fn none() -> Self {
        Self { matcher: None, stats: FilterStats::default() }
    }

    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        if patterns.is_empty() {
            return Ok(Self::none());
        }
        Ok(Self {
            matcher: Some(any_of(patterns)?),
            stats: FilterStats::default(),
        })
    }

    /// User patterns plus, optionally, the built-in noise patterns.
    pub fn with_builtin_noise(patterns: &[String], builtin: bool) -> Result<Self, PatternError> {
        let mut all: Vec<&str> = patterns.iter().map(String::as_str).collect();
        if builtin {
            all.extend_from_slice(Patterns::builtin_noise());
        }
        Self::new(&all)
    }

    #[inline]
    pub fn excludes(&self, record: &Record) -> bool {
        self.stats.records_scanned.fetch_add(1, Ordering::Relaxed);
        let hit = self
            .matcher
            .as_ref()
            .is_some_and(|m| m.is_match(record.normalized_message.as_bytes()).unwrap_or(false));
        if hit {
            self.stats.records_dropped.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn stats(&self) -> FilterCounts {
        FilterCounts {
            scanned: self.stats.records_scanned.load(Ordering::Relaxed),
            excluded: self.stats.records_dropped.load(Ordering::Relaxed),
        }
    }
}
