//! Human-readable report.

use std::fmt::Write as _;

use ingest::docker::ContainerStats;
use ingest::record::{Record, Severity};

use super::{RenderOptions, RunReport};
use crate::analysis::{AnalysisResult, AssessmentLevel, ResultStatus};

const MESSAGE_WIDTH: usize = 120;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const DIM: &str = "\x1b[2m";

struct Painter {
    enabled: bool,
}

impl Painter {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn severity(&self, severity: Severity) -> String {
        let label = format!("[{}]", severity.as_str().to_uppercase());
        match severity {
            Severity::Error => self.paint(RED, &label),
            Severity::Warning => self.paint(YELLOW, &label),
            Severity::Info => self.paint(BLUE, &label),
            Severity::Unknown => label,
        }
    }

    fn level(&self, level: AssessmentLevel) -> String {
        match level {
            AssessmentLevel::Critical => self.paint(RED, level.as_str()),
            AssessmentLevel::Warning => self.paint(YELLOW, level.as_str()),
            AssessmentLevel::Info => self.paint(GREEN, level.as_str()),
        }
    }
}

/// 117 characters plus `...` once a message passes 120.
pub fn truncate_message(message: &str, full: bool) -> String {
    if full || message.chars().count() <= MESSAGE_WIDTH {
        return message.to_string();
    }
    let head: String = message.chars().take(MESSAGE_WIDTH - 3).collect();
    format!("{}...", head)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn render(report: &RunReport, options: &RenderOptions) -> String {
    let p = Painter { enabled: options.color };
    let mut out = String::new();

    let hours = report.window.duration().num_seconds() as f64 / 3600.0;
    let _ = writeln!(
        out,
        "{} {} to {} ({:.1}h)",
        p.paint(BOLD, "Log window:"),
        report.window.start.format("%Y-%m-%d %H:%M:%S UTC"),
        report.window.end.format("%Y-%m-%d %H:%M:%S UTC"),
        hours
    );
    let _ = writeln!(out, "{} {}", p.paint(BOLD, "Sources:"), report.sources.join(", "));
    let lines: u64 = report.records.iter().map(|r| u64::from(r.occurrence_count)).sum();
    let _ = writeln!(
        out,
        "{} {} groups from {} lines ({} read, {} dropped, {} excluded)",
        p.paint(BOLD, "Records:"),
        report.records.len(),
        lines,
        report.stats.lines_read,
        report.stats.lines_dropped,
        report.filter.excluded
    );

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\n{}", p.paint(YELLOW, "Warnings:"));
        for w in &report.warnings {
            let _ = writeln!(out, "  ! [{}] {}: {}", w.kind, w.source, w.message);
        }
    }

    out.push('\n');
    if report.records.is_empty() {
        let _ = writeln!(out, "No matching log entries in this window.");
    }
    for record in &report.records {
        render_record(&mut out, &p, record, options.full);
    }

    if !report.container_stats.is_empty() {
        let _ = writeln!(out, "\n{}", p.paint(BOLD, "Container stats:"));
        render_stats(&mut out, &report.container_stats);
    }

    for result in &report.analysis.results {
        render_result(&mut out, &p, result);
    }
    out
}

fn render_record(out: &mut String, p: &Painter, record: &Record, full: bool) {
    let mut line = format!(
        "{} {} {}",
        p.severity(record.severity),
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.source
    );
    if record.occurrence_count > 1 {
        let _ = write!(line, " (\u{00d7}{})", record.occurrence_count);
    }
    if record.timestamp_inferred {
        line.push_str(&p.paint(DIM, " ~time"));
    }
    let _ = writeln!(out, "{} {}", line, truncate_message(&record.raw_message, full));
}

fn render_stats(out: &mut String, stats: &[ContainerStats]) {
    let width = stats.iter().map(|s| s.container.len()).max().unwrap_or(4).max(4);
    let _ = writeln!(
        out,
        "  {:<width$}  {:>7}  {:>21}  {:>6}  {:>21}  {:>21}  {:>5}",
        "NAME", "CPU %", "MEM USAGE / LIMIT", "MEM %", "NET RX / TX", "BLOCK R / W", "PIDS",
        width = width
    );
    for s in stats {
        let pids = s.pids.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:<width$}  {:>6.2}%  {:>21}  {:>5.1}%  {:>21}  {:>21}  {:>5}",
            s.container,
            s.cpu_percent,
            format!("{} / {}", format_bytes(s.memory_usage), format_bytes(s.memory_limit)),
            s.memory_percent,
            format!("{} / {}", format_bytes(s.net_rx_bytes), format_bytes(s.net_tx_bytes)),
            format!("{} / {}", format_bytes(s.block_read_bytes), format_bytes(s.block_write_bytes)),
            pids,
            width = width
        );
    }
}

fn render_result(out: &mut String, p: &Painter, result: &AnalysisResult) {
    let attempts = if result.attempts == 1 { "attempt" } else { "attempts" };
    let name = result.provider.display_name();
    match result.status {
        ResultStatus::Success => {
            let level = result
                .assessment
                .as_ref()
                .map(|a| format!(", assessment: {}", p.level(a.level)))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "\n{} {}",
                p.paint(BOLD, &format!("── AI analysis: {} ──", name)),
                p.paint(DIM, &format!("({} ms, {} {}{})", result.latency_ms, result.attempts, attempts, level))
            );
            let _ = writeln!(out, "{}", result.text.as_deref().unwrap_or_default().trim_end());
        }
        ResultStatus::Failed => {
            let kind = result.error_kind.map(|k| k.to_string()).unwrap_or_else(|| "failed".to_string());
            let _ = writeln!(
                out,
                "\n{} {}",
                p.paint(BOLD, &format!("── AI analysis: {} ──", name)),
                p.paint(DIM, &format!("({} ms, {} {})", result.latency_ms, result.attempts, attempts))
            );
            let _ = writeln!(
                out,
                "{} {}",
                p.paint(RED, &format!("failed [{}]:", kind)),
                result.error_message.as_deref().unwrap_or_default()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures;

    fn plain() -> RenderOptions {
        RenderOptions { json: false, color: false, full: false }
    }

    // ── Layout ──

    #[test]
    fn test_header_warnings_records_in_order() {
        let out = render(&fixtures::report(), &plain());
        let header = out.find("Log window:").unwrap();
        let warnings = out.find("Warnings:").unwrap();
        let first = out.find("[ERROR] 2024-06-01 11:42:07 docker-container:api (\u{00d7}4)").unwrap();
        let second = out.find("[WARNING] 2024-06-01 11:10:00 local:web01 disk 91% full").unwrap();
        assert!(header < warnings && warnings < first && first < second, "section order:\n{}", out);
        assert!(out.contains("! [partial_source_failure] docker-container:db: log stream interrupted"));
        assert!(out.contains("2 groups from 5 lines (40 read, 3 dropped, 6 excluded)"), "{}", out);
    }

    #[test]
    fn test_provider_blocks() {
        let out = render(&fixtures::report(), &plain());
        assert!(out.contains("── AI analysis: Claude ──"));
        assert!(out.contains("Upstream timeouts need attention."));
        assert!(out.contains("(1830 ms, 1 attempt, assessment: "));
        assert!(out.contains("failed [rate_limited]: HTTP 429: quota exceeded"));
        assert!(out.contains("2 attempts"));
    }

    #[test]
    fn test_stats_table() {
        let out = render(&fixtures::report(), &plain());
        assert!(out.contains("Container stats:"));
        assert!(out.contains("256.0 MiB / 1.0 GiB"), "{}", out);
        assert!(out.contains("12.50%"));
    }

    // ── Color ──

    #[test]
    fn test_no_color_has_no_escapes() {
        let out = render(&fixtures::report(), &plain());
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_color_marks_severities() {
        let out = render(&fixtures::report(), &RenderOptions { color: true, ..plain() });
        assert!(out.contains("\x1b[31m[ERROR]\x1b[0m"), "error is red");
        assert!(out.contains("\x1b[33m[WARNING]\x1b[0m"), "warning is yellow");
    }

    // ── Helpers ──

    #[test]
    fn test_truncate_message() {
        let long = "x".repeat(200);
        let cut = truncate_message(&long, false);
        assert_eq!(cut.chars().count(), 120);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_message(&long, true), long, "--full keeps everything");
        let exact = "y".repeat(120);
        assert_eq!(truncate_message(&exact, false), exact);
        let wide = "é".repeat(130);
        assert_eq!(truncate_message(&wide, false).chars().count(), 120, "counts characters, not bytes");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.0 GiB");
    }
}
