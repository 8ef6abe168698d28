//! Normalizer: raw source lines to [`Record`]s.

use crate::conf::NormalizerConfig;
use crate::filter::regex::PatternError;
use crate::parser::ansi::strip_ansi_codes;
use crate::parser::severity::SeverityRules;
use crate::parser::structured::level_hint;
use crate::parser::timestamp::{split_header, split_timestamp};
use crate::parser::volatile::VolatileStripper;
use crate::record::{LineFormat, RawLine, Record, Window};

pub struct Normalizer {
    window: Window,
    severity: SeverityRules,
    volatile: VolatileStripper,
}

/// journalctl banner lines (`-- No entries --`, `-- Boot abc --`, …).
fn is_journal_meta(line: &str) -> bool {
    line.starts_with("-- ")
        && (line.ends_with(" --")
            || line.starts_with("-- No entries")
            || line.starts_with("-- Logs begin at")
            || line.starts_with("-- Journal begins at"))
}

impl Normalizer {
    pub fn new(window: Window, severity: SeverityRules, volatile: VolatileStripper) -> Self {
        Self { window, severity, volatile }
    }

    pub fn from_config(window: Window, config: &NormalizerConfig) -> Result<Self, PatternError> {
        let mut volatile = VolatileStripper::baseline()?;
        for rule in &config.extra_volatile {
            volatile = volatile.with_rule(&rule.pattern, &rule.replacement)?;
        }
        Ok(Self::new(window, SeverityRules::baseline()?, volatile))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// `None` when the line is empty, banner noise, or outside the window.
    ///
    /// An unparsable timestamp never drops the line: it is stamped with the
    /// last instant of the window and flagged `timestamp_inferred`.
    pub fn normalize(&self, raw: &RawLine) -> Option<Record> {
        let cleaned = strip_ansi_codes(&raw.content);
        let text = String::from_utf8_lossy(&cleaned);
        let line = text.trim();
        if line.is_empty() {
            return None;
        }
        if raw.format != LineFormat::Docker && is_journal_meta(line) {
            return None;
        }

        let (timestamp, inferred, rest) = match raw.timestamp {
            Some(ts) => (ts, false, line),
            None => match split_timestamp(line, raw.format, self.window.end) {
                Some((ts, rest)) => (ts, false, rest),
                None => (self.window.latest(), true, line),
            },
        };
        if !self.window.contains(timestamp) {
            return None;
        }

        let (process, body) = match raw.format {
            LineFormat::Docker => (None, rest),
            LineFormat::Journal | LineFormat::Syslog => {
                let header = split_header(rest);
                (header.process, header.body)
            }
        };
        if body.is_empty() {
            return None;
        }

        let severity = level_hint(body).unwrap_or_else(|| self.severity.classify(body));
        let stripped = self.volatile.strip(body);
        let normalized = match process {
            Some(p) => format!("{}: {}", p, stripped),
            None => stripped,
        };

        let mut record = Record::new(timestamp, raw.origin.clone(), severity, line, normalized);
        record.timestamp_inferred = inferred;
        record.process = process.map(str::to_string);
        Some(record)
    }
}
