//! Volatile-token stripping for `normalized_message`.
//!
//! Replaces substrings that differ between otherwise identical events
//! (timestamps, PIDs, addresses, counters) with fixed placeholders so the
//! grouping key collapses them.

use grep_matcher::Matcher;
use grep_regex::RegexMatcher;

use crate::filter::regex::{compile, PatternError};

type Guard = fn(&[u8]) -> bool;

struct VolatileRule {
    matcher: RegexMatcher,
    replacement: String,
    /// Extra check on the matched bytes; a rejected match is kept verbatim.
    guard: Option<Guard>,
}

pub struct VolatileStripper {
    rules: Vec<VolatileRule>,
}

/// Hex run long enough to be an identifier and holding at least one digit,
/// so ordinary words like `deadbeef` or `facade` survive.
fn looks_like_hex_id(m: &[u8]) -> bool {
    m.len() >= 8 && m.iter().any(u8::is_ascii_digit)
}

const BASELINE: &[(&str, &str, Option<Guard>)] = &[
    (
        r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?",
        "<TS>",
        None,
    ),
    (r"\b\d{1,2}:\d{2}:\d{2}(\.\d+)?\b", "<TIME>", None),
    (
        r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
        "<UUID>",
        None,
    ),
    (r"\b0x[0-9a-fA-F]+\b", "<HEX>", None),
    (r"\b\d{1,3}(\.\d{1,3}){3}(:\d+)?\b", "<IP>", None),
    (r"\[\d+\]", "[<PID>]", None),
    (r"\b(?:[0-9a-f]+|[0-9A-F]+)\b", "<ID>", Some(looks_like_hex_id)),
    (r"\b\d+\b", "<N>", None),
];

impl VolatileStripper {
    /// Fixed baseline rule set.
    pub fn baseline() -> Result<Self, PatternError> {
        let rules = BASELINE
            .iter()
            .map(|(pattern, replacement, guard)| {
                Ok(VolatileRule {
                    matcher: compile(pattern, false)?,
                    replacement: replacement.to_string(),
                    guard: *guard,
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self { rules })
    }

    /// Append a rule evaluated after the baseline.
    pub fn with_rule(mut self, pattern: &str, replacement: &str) -> Result<Self, PatternError> {
        self.rules.push(VolatileRule {
            matcher: compile(pattern, false)?,
            replacement: replacement.to_string(),
            guard: None,
        });
        Ok(self)
    }

    pub fn strip(&self, message: &str) -> String {
        let mut current = message.as_bytes().to_vec();
        let mut scratch = Vec::with_capacity(current.len());

        for rule in &self.rules {
            if !rule.matcher.is_match(&current).unwrap_or(false) {
                continue;
            }
            scratch.clear();
            let haystack: &[u8] = &current;
            let replaced = rule.matcher.replace(haystack, &mut scratch, |m, dst| {
                let matched = &haystack[m.start()..m.end()];
                match rule.guard {
                    Some(guard) if !guard(matched) => dst.extend_from_slice(matched),
                    _ => dst.extend_from_slice(rule.replacement.as_bytes()),
                }
                true
            });
            if replaced.is_ok() {
                std::mem::swap(&mut current, &mut scratch);
            }
        }

        String::from_utf8_lossy(&current)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
