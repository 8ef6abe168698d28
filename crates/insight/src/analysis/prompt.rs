//! Prompt assembly: one bounded text block shared by every provider.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use ingest::filter::group;
use ingest::record::{Record, Severity, SourceTag};

use super::context::AnalysisContext;
use super::AnalysisError;
use crate::provider::Prompt;

pub const SYSTEM_PROMPT: &str = "\
You are an expert system administrator analyzing Linux host and container logs.
Focus on service stability, resource exhaustion, cluster and high-availability health,
and recurring error patterns. Provide actionable recommendations.

Structure your response exactly like this:
=== Overall Assessment ===
[1-2 sentence summary of system state]

=== Critical Issues ===
[List any critical issues, if none state \"No critical issues detected\"]

=== Service Issues ===
[List service-related issues]

=== Recommendations ===
[Specific actions to take]

=== Preventive Measures ===
[Ways to prevent similar issues]";

pub const DEFAULT_MAX_BYTES: usize = 100_000;
pub const DEFAULT_MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    /// Ceiling for system plus user text, in bytes.
    pub max_bytes: usize,
    /// Distinct raw lines shown under each group.
    pub max_examples: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_BYTES, max_examples: DEFAULT_MAX_EXAMPLES }
    }
}

type GroupKey<'a> = (&'a SourceTag, Severity, &'a str);

struct Block {
    text: String,
    rank: usize,
    record: Record,
}

impl PromptBuilder {
    pub fn new(max_bytes: usize, max_examples: usize) -> Self {
        Self { max_bytes, max_examples }
    }

    /// `records` are the selected, not yet grouped, records: examples are
    /// drawn from the distinct raw lines inside each group.
    pub fn build(&self, records: &[Record], context: &AnalysisContext) -> Result<Prompt, AnalysisError> {
        let examples = self.examples(records);
        let groups = group(records.to_vec());

        let header = stats_header(&groups, context);
        let footer = context_footer(context);
        let fixed = SYSTEM_PROMPT.len() + header.len() + footer.len();

        let blocks: Vec<Block> = groups
            .into_iter()
            .enumerate()
            .map(|(rank, record)| {
                let key = (&record.source, record.severity, record.normalized_message.as_str());
                let text = format_group(&record, examples.get(&key).map(Vec::as_slice).unwrap_or(&[]));
                Block { text, rank, record }
            })
            .collect();

        let mut kept_bytes: usize = blocks.iter().map(|b| b.text.len()).sum();
        let mut dropped = vec![false; blocks.len()];
        let mut truncated = 0usize;

        // Oldest first; among equal timestamps the lower-ranked group goes first.
        let mut by_age: Vec<&Block> = blocks.iter().collect();
        by_age.sort_by(|a, b| {
            a.record
                .timestamp
                .cmp(&b.record.timestamp)
                .then_with(|| b.rank.cmp(&a.rank))
        });

        let mut oldest = by_age.into_iter();
        while fixed + kept_bytes + omitted_note(truncated).len() > self.max_bytes {
            let Some(block) = oldest.next() else {
                let size = fixed + omitted_note(truncated).len();
                return Err(AnalysisError::PayloadTooLarge { size, limit: self.max_bytes });
            };
            dropped[block.rank] = true;
            kept_bytes -= block.text.len();
            truncated += 1;
        }

        if truncated > 0 {
            tracing::info!(truncated, limit = self.max_bytes, "dropped oldest log groups to fit the prompt");
        }

        let mut user = header;
        let mut included = 0;
        for block in blocks.iter().filter(|b| !dropped[b.rank]) {
            user.push_str(&block.text);
            included += 1;
        }
        user.push_str(&omitted_note(truncated));
        user.push_str(&footer);

        Ok(Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
            groups_included: included,
            truncated_groups: truncated,
        })
    }

    fn examples<'a>(&self, records: &'a [Record]) -> HashMap<GroupKey<'a>, Vec<&'a str>> {
        let mut examples: HashMap<GroupKey<'a>, Vec<&'a str>> = HashMap::new();
        if self.max_examples == 0 {
            return examples;
        }
        for r in records {
            let entry = examples
                .entry((&r.source, r.severity, r.normalized_message.as_str()))
                .or_default();
            if entry.len() < self.max_examples && !entry.contains(&r.raw_message.as_str()) {
                entry.push(r.raw_message.as_str());
            }
        }
        examples
    }
}

fn stats_header(groups: &[Record], context: &AnalysisContext) -> String {
    let mut per_severity: BTreeMap<Severity, u64> = BTreeMap::new();
    let mut total = 0u64;
    for g in groups {
        *per_severity.entry(g.severity).or_default() += u64::from(g.occurrence_count);
        total += u64::from(g.occurrence_count);
    }

    let mut out = String::from("Please analyze these system logs:\n\nStatistics:\n");
    if let Some(window) = &context.window {
        let _ = writeln!(
            out,
            "- Window: {} to {}",
            window.start.format("%Y-%m-%d %H:%M:%S UTC"),
            window.end.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    let _ = writeln!(out, "- Total records: {}", total);
    let _ = writeln!(out, "- Distinct groups: {}", groups.len());
    for (severity, count) in &per_severity {
        let _ = writeln!(out, "- {}: {}", severity, count);
    }
    out.push_str("\nLog groups (most frequent first):\n");
    out
}

fn format_group(record: &Record, examples: &[&str]) -> String {
    let mut out = format!(
        "\n[{}] {} \u{00d7}{}",
        record.severity, record.source, record.occurrence_count
    );
    if let Some(process) = &record.process {
        let _ = write!(out, " {}", process);
    }
    let _ = writeln!(out, ": {}", record.normalized_message);
    for example in examples {
        let _ = writeln!(out, "  Example: {}", example);
    }
    out
}

fn omitted_note(truncated: usize) -> String {
    if truncated == 0 {
        String::new()
    } else {
        format!("\n({} older groups omitted to fit the size limit)\n", truncated)
    }
}

fn context_footer(context: &AnalysisContext) -> String {
    match context.merged() {
        Some(info) => match serde_json::to_string_pretty(&info) {
            Ok(json) => format!("\nSystem Information:\n{}\n", json),
            Err(e) => {
                tracing::warn!(error = %e, "system info could not be serialized, leaving it out");
                String::new()
            }
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn rec(severity: Severity, raw: &str, normalized: &str, min: i64) -> Record {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap() + Duration::minutes(min);
        Record::new(ts, SourceTag::local("web01"), severity, raw, normalized)
    }

    fn sample() -> Vec<Record> {
        vec![
            rec(Severity::Error, "conn 17 refused", "conn <N> refused", 1),
            rec(Severity::Error, "conn 18 refused", "conn <N> refused", 2),
            rec(Severity::Error, "conn 18 refused", "conn <N> refused", 3),
            rec(Severity::Warning, "disk 91% full", "disk <N>% full", 4),
        ]
    }

    // ── Layout ──

    #[test]
    fn test_groups_stats_and_examples() {
        let prompt = PromptBuilder::default().build(&sample(), &AnalysisContext::default()).unwrap();
        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.user.starts_with("Please analyze these system logs:"));
        assert!(prompt.user.contains("- Total records: 4"));
        assert!(prompt.user.contains("- error: 3"));
        assert!(prompt.user.contains("- warning: 1"));
        assert!(
            prompt.user.contains("[error] local:web01 \u{00d7}3: conn <N> refused"),
            "group line format: {}",
            prompt.user
        );
        assert_eq!(
            prompt.user.matches("Example: conn 18 refused").count(),
            1,
            "examples are distinct"
        );
        assert!(prompt.user.contains("Example: conn 17 refused"));
        assert_eq!(prompt.groups_included, 2);
        assert_eq!(prompt.truncated_groups, 0);
    }

    #[test]
    fn test_example_cap() {
        let records: Vec<Record> = (0..6)
            .map(|i| rec(Severity::Info, &format!("job {} done", i), "job <N> done", i))
            .collect();
        let prompt = PromptBuilder::new(DEFAULT_MAX_BYTES, 2)
            .build(&records, &AnalysisContext::default())
            .unwrap();
        assert_eq!(prompt.user.matches("Example:").count(), 2);
    }

    #[test]
    fn test_process_and_context_included() {
        let mut r = rec(Severity::Error, "oom", "oom", 0);
        r.process = Some("kernel".into());
        let ctx = AnalysisContext::default().with_system_info(json!({ "hostname": "pve1" }));
        let prompt = PromptBuilder::default().build(&[r], &ctx).unwrap();
        assert!(prompt.user.contains("\u{00d7}1 kernel: oom"));
        assert!(prompt.user.contains("System Information:"));
        assert!(prompt.user.contains("\"hostname\": \"pve1\""));
    }

    // ── Truncation ──

    #[test]
    fn test_oldest_groups_dropped_first() {
        let records: Vec<Record> = (0..20)
            .map(|i| {
                let msg = format!("distinct failure number {:02} with some padding text", i);
                rec(Severity::Error, &msg, &msg, i)
            })
            .collect();
        let full = PromptBuilder::default().build(&records, &AnalysisContext::default()).unwrap();
        let limit = full.len_bytes() - 200;

        let prompt = PromptBuilder::new(limit, 3).build(&records, &AnalysisContext::default()).unwrap();
        assert!(prompt.len_bytes() <= limit, "{} > {}", prompt.len_bytes(), limit);
        assert!(prompt.truncated_groups > 0);
        assert_eq!(prompt.groups_included + prompt.truncated_groups, 20);
        assert!(!prompt.user.contains("number 00"), "oldest group goes first");
        assert!(prompt.user.contains("number 19"), "newest group survives");
        assert!(prompt.user.contains("older groups omitted"));
    }

    #[test]
    fn test_fixed_part_over_ceiling_fails() {
        let err = PromptBuilder::new(100, 3)
            .build(&sample(), &AnalysisContext::default())
            .unwrap_err();
        match err {
            AnalysisError::PayloadTooLarge { size, limit } => {
                assert_eq!(limit, 100);
                assert!(size > limit);
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_records_still_build() {
        let prompt = PromptBuilder::default().build(&[], &AnalysisContext::default()).unwrap();
        assert!(prompt.user.contains("- Total records: 0"));
        assert_eq!(prompt.groups_included, 0);
    }
}
