use anyhow::{Context, Result};
use ingest::docker::ContainerStats;
use ingest::filter::FilterCounts;
use ingest::record::{Record, Window};
use ingest::source::SourceWarning;
use serde::Serialize;

use super::RunReport;
use crate::analysis::AnalysisResult;

#[derive(Serialize)]
struct JsonReport<'a> {
    window: &'a Window,
    records: &'a [Record],
    warnings: &'a [SourceWarning],
    container_stats: &'a [ContainerStats],
    filter: FilterCounts,
    analysis: &'a [AnalysisResult],
}

pub fn render(report: &RunReport) -> Result<String> {
    let view = JsonReport {
        window: &report.window,
        records: &report.records,
        warnings: &report.warnings,
        container_stats: &report.container_stats,
        filter: report.filter,
        analysis: &report.analysis.results,
    };
    let mut out = serde_json::to_string_pretty(&view).context("Failed to serialize report")?;
    out.push('\n');
    Ok(out)
}
