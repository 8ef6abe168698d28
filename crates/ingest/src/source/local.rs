//! Local journal: `journalctl` on Linux, `log show` on macOS.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Local, Utc};
use tokio::process::Command;

use crate::deadline::Deadline;
use crate::record::{LineFormat, SourceTag, Window};
use crate::source::command::{stream_lines, CommandFailure};
use crate::source::{FetchHints, LogSource, SourceError, SourceFetch};

/// Messages kept by default on macOS: anything mentioning a failure plus
/// system process output.
pub const MACOS_DEFAULT_PREDICATE: &str = "(eventMessage CONTAINS[c] \"error\" OR eventMessage CONTAINS[c] \"warning\" OR eventMessage CONTAINS[c] \"failure\" OR eventMessage CONTAINS[c] \"failed\" OR process == \"system\")";

/// Which local logging facility to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalFlavor {
    Journalctl,
    MacosLog { predicate: Option<String> },
}

impl LocalFlavor {
    /// Picks by the compile target.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            LocalFlavor::MacosLog { predicate: Some(MACOS_DEFAULT_PREDICATE.to_string()) }
        } else {
            LocalFlavor::Journalctl
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            LocalFlavor::Journalctl => "journalctl",
            LocalFlavor::MacosLog { .. } => "log",
        }
    }

    pub fn line_format(&self) -> LineFormat {
        match self {
            LocalFlavor::Journalctl => LineFormat::Journal,
            LocalFlavor::MacosLog { .. } => LineFormat::Syslog,
        }
    }
}

/// `journalctl` arguments for a window. Shared with the SSH adapter.
pub fn journalctl_args(window: &Window, tail: Option<u32>) -> Vec<String> {
    let mut args = vec![
        format!("--since=@{}", window.start.timestamp()),
        format!("--until=@{}", window.end.timestamp()),
        "--output=short-iso".to_string(),
        "--utc".to_string(),
        "--no-pager".to_string(),
        "--quiet".to_string(),
    ];
    if let Some(n) = tail {
        args.push(format!("--lines={}", n));
    }
    args
}

/// `log show` wants local wall-clock time.
fn macos_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn macos_log_args(window: &Window, predicate: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "show".to_string(),
        "--start".to_string(),
        macos_time(window.start),
        "--end".to_string(),
        macos_time(window.end),
        "--style".to_string(),
        "syslog".to_string(),
    ];
    if let Some(p) = predicate {
        args.push("--predicate".to_string());
        args.push(p.to_string());
    }
    args
}

/// Any local failure means the local source is unusable.
fn classify(origin: &SourceTag, program: &str, failure: CommandFailure) -> SourceError {
    SourceError::Unavailable {
        source_id: origin.id.clone(),
        reason: failure.describe(program),
    }
}

/// Reads the system journal of the machine this binary runs on.
pub struct LocalJournal {
    hostname: String,
    flavor: LocalFlavor,
}

impl LocalJournal {
    pub fn new(hostname: impl Into<String>, flavor: LocalFlavor) -> Self {
        Self { hostname: hostname.into(), flavor }
    }

    /// Hostname from `$HOSTNAME` / `/etc/hostname`, else `localhost`.
    pub fn detect() -> Self {
        Self::new(local_hostname(), LocalFlavor::detect())
    }

    pub fn flavor(&self) -> &LocalFlavor {
        &self.flavor
    }

    pub fn command(&self, window: &Window, hints: &FetchHints) -> Command {
        let mut cmd = Command::new(self.flavor.program());
        match &self.flavor {
            LocalFlavor::Journalctl => cmd.args(journalctl_args(window, hints.tail_lines)),
            LocalFlavor::MacosLog { predicate } => {
                cmd.args(macos_log_args(window, predicate.as_deref()))
            }
        };
        cmd
    }
}

pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

impl LogSource for LocalJournal {
    fn name(&self) -> String {
        format!("local journal ({})", self.hostname)
    }

    fn tag(&self) -> SourceTag {
        SourceTag::local(self.hostname.clone())
    }

    fn fetch<'a>(
        &'a self,
        window: Window,
        hints: &'a FetchHints,
        deadline: &'a Deadline,
    ) -> Pin<Box<dyn Future<Output = Result<SourceFetch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if deadline.is_cancelled() {
                return Err(SourceError::Cancelled {
                    source_id: self.hostname.clone(),
                    reason: crate::deadline::Cancelled::Interrupted,
                });
            }
            tracing::info!(
                host = %self.hostname,
                program = self.flavor.program(),
                start = %window.start,
                end = %window.end,
                "reading local journal"
            );
            let lines = stream_lines(
                self.command(&window, hints),
                self.tag(),
                self.flavor.line_format(),
                classify,
            )?;
            Ok(SourceFetch::lines(lines))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_journalctl_args_use_unix_bounds() {
        let args = journalctl_args(&window(), None);
        assert_eq!(args[0], "--since=@1717239600");
        assert_eq!(args[1], "--until=@1717243200");
        assert!(args.contains(&"--output=short-iso".to_string()));
        assert!(args.contains(&"--utc".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--lines")));
    }

    #[test]
    fn test_journalctl_args_tail() {
        let args = journalctl_args(&window(), Some(500));
        assert_eq!(args.last().map(String::as_str), Some("--lines=500"));
    }

    #[test]
    fn test_macos_args_carry_predicate() {
        let args = macos_log_args(&window(), Some(MACOS_DEFAULT_PREDICATE));
        assert_eq!(args[0], "show");
        assert_eq!(args[5..7], ["--style".to_string(), "syslog".to_string()]);
        assert_eq!(args[7], "--predicate");
        let without = macos_log_args(&window(), None);
        assert_eq!(without.len(), 7);
    }

    #[test]
    fn test_flavor_formats() {
        assert_eq!(LocalFlavor::Journalctl.line_format(), LineFormat::Journal);
        assert_eq!(
            LocalFlavor::MacosLog { predicate: None }.line_format(),
            LineFormat::Syslog
        );
    }

    #[test]
    fn test_tag_is_local_host() {
        let src = LocalJournal::new("box", LocalFlavor::Journalctl);
        assert_eq!(src.tag(), SourceTag::local("box"));
        assert_eq!(src.name(), "local journal (box)");
    }

    #[tokio::test]
    async fn test_cancelled_deadline_refuses_fetch() {
        let src = LocalJournal::new("box", LocalFlavor::Journalctl);
        let deadline = Deadline::unbounded();
        deadline.cancel();
        let hints = FetchHints::default();
        let result = src.fetch(window(), &hints, &deadline).await;
        assert!(matches!(result, Err(SourceError::Cancelled { .. })));
    }
}
