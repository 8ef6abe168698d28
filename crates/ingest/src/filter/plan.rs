//! FilterPlan: the full filter/group pass, in order: severity, exclusion,
//! grouping, summary.

use crate::conf::FilterConfig;
use crate::filter::engine::{ExclusionFilter, FilterCounts, SeveritySet};
use crate::filter::group::{group, summarize};
use crate::filter::regex::PatternError;
use crate::record::Record;

pub struct FilterPlan {
    pub severities: SeveritySet,
    pub exclusions: ExclusionFilter,
    pub top_n: Option<usize>,
}

impl FilterPlan {
    pub fn new(severities: SeveritySet, exclusions: ExclusionFilter, top_n: Option<usize>) -> Self {
        Self { severities, exclusions, top_n }
    }

    /// Keeps every severity, no exclusions, no summary cutoff.
    pub fn passthrough() -> Self {
        Self::new(SeveritySet::all(), ExclusionFilter::none(), None)
    }

    /// `extra_exclusions` (e.g. `--exclude`) are added to the configured ones.
    pub fn from_config(
        config: &FilterConfig,
        severities: SeveritySet,
        extra_exclusions: &[String],
        summary: bool,
    ) -> Result<Self, PatternError> {
        let mut patterns = config.exclude_patterns.clone();
        patterns.extend(extra_exclusions.iter().cloned());
        let exclusions = ExclusionFilter::with_builtin_noise(&patterns, config.builtin_noise)?;
        let top_n = if summary { config.summary_top_n } else { None };
        Ok(Self::new(severities, exclusions, top_n))
    }

    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        self.condense(self.select(records))
    }

    /// Severity and exclusion passes only; records stay ungrouped.
    pub fn select(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|r| self.severities.contains(r.severity))
            .filter(|r| !self.exclusions.excludes(r))
            .collect()
    }

    /// What the exclusion pass has seen and dropped so far.
    pub fn exclusion_counts(&self) -> FilterCounts {
        self.exclusions.stats()
    }

    /// Grouping and summary cutoff over already selected records.
    pub fn condense(&self, selected: Vec<Record>) -> Vec<Record> {
        summarize(group(selected), self.top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Severity, SourceTag};
    use chrono::{Duration, TimeZone, Utc};

    fn rec(severity: Severity, msg: &str, min: i64) -> Record {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap() + Duration::minutes(min);
        Record::new(ts, SourceTag::local("web01"), severity, msg, msg)
    }

    #[test]
    fn test_output_respects_severity_set() {
        let plan = FilterPlan::new(SeveritySet::only([Severity::Error]), ExclusionFilter::none(), None);
        let out = plan.apply(vec![
            rec(Severity::Error, "a", 1),
            rec(Severity::Warning, "b", 2),
            rec(Severity::Info, "c", 3),
            rec(Severity::Unknown, "d", 4),
        ]);
        assert!(out.iter().all(|r| r.severity == Severity::Error), "no record outside the set");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_exclusion_runs_before_grouping() {
        let plan = FilterPlan::new(SeveritySet::all(), ExclusionFilter::new(&["heartbeat"]).unwrap(), None);
        let out = plan.apply(vec![
            rec(Severity::Info, "heartbeat ok", 1),
            rec(Severity::Info, "heartbeat ok", 2),
            rec(Severity::Error, "disk full", 3),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].normalized_message, "disk full");
    }

    #[test]
    fn test_exclusion_counts_skip_severity_drops() {
        let plan = FilterPlan::new(
            SeveritySet::only([Severity::Error, Severity::Info]),
            ExclusionFilter::new(&["heartbeat"]).unwrap(),
            None,
        );
        let selected = plan.select(vec![
            rec(Severity::Info, "heartbeat ok", 1),
            rec(Severity::Warning, "heartbeat late", 2),
            rec(Severity::Error, "disk full", 3),
        ]);
        assert_eq!(selected.len(), 1);
        assert_eq!(
            plan.exclusion_counts(),
            FilterCounts { scanned: 2, excluded: 1 },
            "the warning is dropped by severity before exclusion sees it"
        );
    }

    #[test]
    fn test_warning_scenario() {
        // Two warnings identical after normalization, three distinct errors.
        let plan = FilterPlan::new(SeveritySet::only([Severity::Warning]), ExclusionFilter::none(), None);
        let out = plan.apply(vec![
            rec(Severity::Warning, "disk <N>% full", 10),
            rec(Severity::Warning, "disk <N>% full", 20),
            rec(Severity::Error, "e1", 30),
            rec(Severity::Error, "e2", 40),
            rec(Severity::Error, "e3", 50),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].occurrence_count, 2);
        assert_eq!(out[0].severity, Severity::Warning);
    }

    #[test]
    fn test_from_config_summary_toggle() {
        let cfg = FilterConfig { summary_top_n: Some(1), ..Default::default() };
        let summary = FilterPlan::from_config(&cfg, SeveritySet::all(), &[], true).unwrap();
        assert_eq!(summary.top_n, Some(1));

        let full = FilterPlan::from_config(&cfg, SeveritySet::all(), &[], false).unwrap();
        assert_eq!(full.top_n, None, "cutoff only applies in summary mode");
    }

    #[test]
    fn test_from_config_merges_extra_exclusions() {
        let cfg = FilterConfig { exclude_patterns: vec!["cron".into()], builtin_noise: false, ..Default::default() };
        let plan = FilterPlan::from_config(&cfg, SeveritySet::all(), &["sshd".to_string()], false).unwrap();
        let out = plan.apply(vec![
            rec(Severity::Info, "cron ran", 1),
            rec(Severity::Info, "sshd accepted", 2),
            rec(Severity::Info, "kept", 3),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_passthrough_only_groups() {
        let out = FilterPlan::passthrough().apply(vec![rec(Severity::Unknown, "x", 1), rec(Severity::Unknown, "x", 2)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].occurrence_count, 2);
    }

    #[test]
    fn test_select_keeps_duplicates_ungrouped() {
        let plan = FilterPlan::new(SeveritySet::only([Severity::Error]), ExclusionFilter::none(), None);
        let selected = plan.select(vec![
            rec(Severity::Error, "x", 1),
            rec(Severity::Error, "x", 2),
            rec(Severity::Info, "y", 3),
        ]);
        assert_eq!(selected.len(), 2, "select does not group");
        assert_eq!(plan.condense(selected).len(), 1);
    }
}
