//! Report rendering: text and JSON are both pure projections of a
//! [`RunReport`].

pub mod json;
pub mod text;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ingest::collect::CollectStats;
use ingest::docker::ContainerStats;
use ingest::filter::FilterCounts;
use ingest::record::{Record, Window};
use ingest::source::SourceWarning;

use crate::analysis::ComparisonReport;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub window: Window,
    /// Source names, for the header.
    pub sources: Vec<String>,
    /// Filtered and grouped records.
    pub records: Vec<Record>,
    pub warnings: Vec<SourceWarning>,
    pub container_stats: Vec<ContainerStats>,
    pub stats: CollectStats,
    /// Exclusion pass of the filter plan.
    pub filter: FilterCounts,
    /// Empty when no analysis was requested.
    pub analysis: ComparisonReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub json: bool,
    pub color: bool,
    pub full: bool,
}

pub fn render(report: &RunReport, options: &RenderOptions) -> Result<String> {
    if options.json {
        json::render(report)
    } else {
        Ok(text::render(report, options))
    }
}

/// Stdout, or the given file (created or truncated).
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = content.len(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write report to stdout")?;
        }
    }
    Ok(())
}
