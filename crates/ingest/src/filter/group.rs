//! Grouping: collapse structurally identical records.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::record::{Record, Severity, SourceTag};

type GroupKey = (SourceTag, Severity, String);

/// Emission order: count desc, latest timestamp desc, source id asc.
/// Severity and message break the remaining ties so the order is total.
fn emission_order(a: &Record, b: &Record) -> Ordering {
    b.occurrence_count
        .cmp(&a.occurrence_count)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.severity.cmp(&b.severity))
        .then_with(|| a.normalized_message.cmp(&b.normalized_message))
}

/// Partition by `(source, severity, normalized_message)` and collapse each
/// partition into one record.
///
/// The merged count is the sum of member counts, which equals the partition
/// size for fresh records and makes regrouping a no-op. The representative
/// raw message comes from the latest member.
pub fn group(records: Vec<Record>) -> Vec<Record> {
    let mut partitions: HashMap<GroupKey, Record> = HashMap::with_capacity(records.len());

    for record in records {
        let key = (
            record.source.clone(),
            record.severity,
            record.normalized_message.clone(),
        );
        match partitions.get_mut(&key) {
            Some(existing) => merge(existing, record),
            None => {
                partitions.insert(key, record);
            }
        }
    }

    let mut grouped: Vec<Record> = partitions.into_values().collect();
    grouped.sort_by(emission_order);
    grouped
}

fn merge(into: &mut Record, other: Record) {
    let count = into.occurrence_count.saturating_add(other.occurrence_count);
    // Latest wins; on equal timestamps the lexically smaller raw message
    // wins so the result does not depend on input order.
    let replace = other.timestamp > into.timestamp
        || (other.timestamp == into.timestamp && other.raw_message < into.raw_message);
    if replace {
        *into = other;
    }
    into.occurrence_count = count;
}

/// Keep the first `top_n` groups of each severity, preserving input order.
/// `None` keeps everything.
pub fn summarize(groups: Vec<Record>, top_n: Option<usize>) -> Vec<Record> {
    let Some(limit) = top_n else {
        return groups;
    };
    let mut seen: HashMap<Severity, usize> = HashMap::new();
    groups
        .into_iter()
        .filter(|r| {
            let n = seen.entry(r.severity).or_insert(0);
            *n += 1;
            *n <= limit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn rec(source: &str, severity: Severity, msg: &str, min: i64) -> Record {
        Record::new(t(min), SourceTag::docker(source), severity, format!("{} @{}", msg, min), msg)
    }

    // ── Grouping ────────────────────────────────────────────────

    #[test]
    fn test_duplicates_collapse_with_latest_timestamp() {
        let out = group(vec![
            rec("api", Severity::Error, "db timeout", 5),
            rec("api", Severity::Error, "db timeout", 20),
            rec("api", Severity::Error, "db timeout", 10),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].occurrence_count, 3);
        assert_eq!(out[0].timestamp, t(20));
        assert_eq!(out[0].raw_message, "db timeout @20", "representative is the latest member");
    }

    #[test]
    fn test_key_includes_source_and_severity() {
        let out = group(vec![
            rec("api", Severity::Error, "x", 1),
            rec("web", Severity::Error, "x", 1),
            rec("api", Severity::Warning, "x", 1),
        ]);
        assert_eq!(out.len(), 3, "different source or severity never merges");
    }

    #[test]
    fn test_ordering_count_then_time_then_source() {
        let out = group(vec![
            rec("zeta", Severity::Info, "a", 1),
            rec("alpha", Severity::Info, "b", 1),
            rec("mid", Severity::Info, "c", 30),
            rec("mid", Severity::Error, "d", 2),
            rec("mid", Severity::Error, "d", 3),
        ]);
        let order: Vec<(&str, u32)> = out
            .iter()
            .map(|r| (r.source.id.as_str(), r.occurrence_count))
            .collect();
        assert_eq!(
            order,
            vec![("mid", 2), ("mid", 1), ("alpha", 1), ("zeta", 1)],
            "count desc, then newest first, then source id asc"
        );
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let once = group(vec![
            rec("api", Severity::Error, "db timeout", 5),
            rec("api", Severity::Error, "db timeout", 6),
            rec("web", Severity::Warning, "slow", 7),
            rec("web", Severity::Warning, "slow", 7),
            rec("web", Severity::Info, "hello", 8),
        ]);
        let twice = group(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut records = vec![
            rec("api", Severity::Error, "x", 5),
            rec("api", Severity::Error, "x", 5),
            rec("b", Severity::Info, "y", 1),
            rec("a", Severity::Info, "y", 1),
        ];
        records[1].raw_message = "other raw".into();
        let forward = group(records.clone());
        records.reverse();
        assert_eq!(forward, group(records));
    }

    #[test]
    fn test_empty_input() {
        assert!(group(Vec::new()).is_empty());
    }

    // ── Summary ─────────────────────────────────────────────────

    #[test]
    fn test_summary_top_n_per_severity() {
        let groups = vec![
            rec("a", Severity::Error, "e1", 1),
            rec("a", Severity::Warning, "w1", 1),
            rec("a", Severity::Error, "e2", 1),
            rec("a", Severity::Error, "e3", 1),
            rec("a", Severity::Warning, "w2", 1),
        ];
        let out = summarize(groups, Some(1));
        let msgs: Vec<&str> = out.iter().map(|r| r.normalized_message.as_str()).collect();
        assert_eq!(msgs, vec!["e1", "w1"]);
    }

    #[test]
    fn test_summary_unlimited_by_default() {
        let groups = vec![rec("a", Severity::Error, "e1", 1), rec("a", Severity::Error, "e2", 1)];
        assert_eq!(summarize(groups.clone(), None), groups);
    }
}
