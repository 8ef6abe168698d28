//! Reading a completion back: `=== Section ===` blocks and an overall
//! severity level from a keyword scan.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentLevel {
    Critical,
    Warning,
    Info,
}

impl AssessmentLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentLevel::Critical => "critical",
            AssessmentLevel::Warning => "warning",
            AssessmentLevel::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub level: AssessmentLevel,
    pub sections: Vec<Section>,
}

impl Assessment {
    pub fn from_text(text: &str) -> Self {
        Self { level: assess_level(text), sections: parse_sections(text) }
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title.eq_ignore_ascii_case(title))
    }
}

const CRITICAL_TERMS: &[&[&str]] = &[
    &["critical"],
    &["severe"],
    &["urgent"],
    &["failure"],
    &["failures"],
    &["immediate", "attention"],
    &["lost", "lock"],
];

const WARNING_TERMS: &[&[&str]] = &[
    &["warning"],
    &["warnings"],
    &["attention", "needed"],
    &["moderate"],
    &["should", "be", "addressed"],
];

/// Words that cancel a term when they appear shortly before it.
const NEGATIONS: &[&str] = &["no", "not", "without", "zero", "none"];
const NEGATION_REACH: usize = 3;

fn header_title(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.len() >= 6 && line.starts_with("===") && line.ends_with("===") {
        Some(line.trim_matches(|c| c == '=' || c == ' '))
    } else {
        None
    }
}

/// Drops a leading `-`, `•`, `*` or `12.` / `12)` marker.
fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '•', '*']);
    if trimmed.len() != line.len() {
        return trimmed.trim();
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return after.trim();
        }
    }
    line
}

/// Lines under each `=== Title ===` header, bullets stripped. Text before
/// the first header and sections with no items are left out.
pub fn parse_sections(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(title) = header_title(line) {
            if let Some(done) = current.take().filter(|s| !s.items.is_empty()) {
                sections.push(done);
            }
            current = Some(Section { title: title.to_string(), items: Vec::new() });
        } else if let Some(section) = current.as_mut() {
            let item = strip_bullet(line);
            if !item.is_empty() {
                section.items.push(item.to_string());
            }
        }
    }
    if let Some(done) = current.filter(|s| !s.items.is_empty()) {
        sections.push(done);
    }
    sections
}

fn mentions(words: &[String], terms: &[&[&str]]) -> bool {
    terms.iter().any(|term| {
        words.windows(term.len()).enumerate().any(|(i, window)| {
            let matched = window.iter().zip(term.iter()).all(|(w, t)| w == t);
            let negated = words[i.saturating_sub(NEGATION_REACH)..i]
                .iter()
                .any(|w| NEGATIONS.contains(&w.as_str()));
            matched && !negated
        })
    })
}

/// Keyword scan over the body. Section headers are skipped since every
/// completion carries a "Critical Issues" header.
pub fn assess_level(text: &str) -> AssessmentLevel {
    let mut warning = false;
    for line in text.lines().filter(|l| header_title(l).is_none()) {
        let words: Vec<String> = line
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        if mentions(&words, CRITICAL_TERMS) {
            return AssessmentLevel::Critical;
        }
        warning = warning || mentions(&words, WARNING_TERMS);
    }
    if warning {
        AssessmentLevel::Warning
    } else {
        AssessmentLevel::Info
    }
}
