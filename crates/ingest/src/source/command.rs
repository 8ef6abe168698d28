//! Command runner: stream a child process's stdout as raw lines.
//!
//! The child is spawned with `kill_on_drop(true)` and owned by the returned
//! stream, so dropping the stream early (deadline, cancellation, consumer
//! error) terminates the process.

use std::process::Stdio;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::record::{LineFormat, RawLine, SourceTag};
use crate::source::{RawLineStream, SourceError};

/// Cap on captured stderr, enough for a diagnostic line or two.
const STDERR_LIMIT: usize = 4096;

/// Why a command did not produce a clean stream.
#[derive(Debug)]
pub enum CommandFailure {
    /// The binary could not be started (missing, not executable).
    Spawn(std::io::Error),
    /// Reading stdout or waiting on the child failed.
    Io(std::io::Error),
    /// The process ran and exited unsuccessfully.
    Exit { code: Option<i32>, stderr: String },
}

impl CommandFailure {
    /// One-line human description.
    pub fn describe(&self, program: &str) -> String {
        match self {
            CommandFailure::Spawn(e) => format!("failed to run {}: {}", program, e),
            CommandFailure::Io(e) => format!("{} I/O error: {}", program, e),
            CommandFailure::Exit { code, stderr } => {
                let code = code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into());
                if stderr.is_empty() {
                    format!("{} exited with status {}", program, code)
                } else {
                    format!("{} exited with status {}: {}", program, code, stderr)
                }
            }
        }
    }
}

/// Maps a command failure to the adapter's error taxonomy.
pub type FailureClassifier = fn(&SourceTag, &str, CommandFailure) -> SourceError;

/// Spawn `command` and return a lazy stream of its stdout lines.
///
/// Trailing `\n`/`\r\n` are stripped. Stderr is drained concurrently so a
/// chatty child never blocks on a full pipe. A non-zero exit is reported as
/// the final stream item, after every line already produced.
pub fn stream_lines(
    mut command: Command,
    origin: SourceTag,
    format: LineFormat,
    classify: FailureClassifier,
) -> Result<RawLineStream, SourceError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let mut child = command
        .spawn()
        .map_err(|e| classify(&origin, &program, CommandFailure::Spawn(e)))?;

    let stdout = child.stdout.take().ok_or_else(|| {
        classify(
            &origin,
            &program,
            CommandFailure::Spawn(std::io::Error::other("stdout was not captured")),
        )
    })?;

    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut collected = Vec::new();
            let mut limited = stderr.take(STDERR_LIMIT as u64);
            let _ = limited.read_to_end(&mut collected).await;
            // Keep reading past the cap so the child never blocks.
            let mut rest = limited.into_inner();
            let _ = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await;
            String::from_utf8_lossy(&collected).trim().to_string()
        })
    });

    let stream = async_stream::stream! {
        let mut reader = BufReader::new(stdout);
        let mut lines_read: u64 = 0;
        loop {
            let mut buf = Vec::with_capacity(256);
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                    }
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    lines_read += 1;
                    yield Ok(RawLine::new(origin.clone(), format, Bytes::from(buf)));
                }
                Err(e) => {
                    yield Err(classify(&origin, &program, CommandFailure::Io(e)));
                    return;
                }
            }
        }

        let status = child.wait().await;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        tracing::debug!(source = %origin, lines_read, "command output drained");

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                yield Err(classify(&origin, &program, CommandFailure::Exit { code: status.code(), stderr }));
            }
            Err(e) => {
                yield Err(classify(&origin, &program, CommandFailure::Io(e)));
            }
        }
    };

    Ok(Box::pin(stream))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn classify(origin: &SourceTag, program: &str, failure: CommandFailure) -> SourceError {
        SourceError::Unavailable {
            source_id: origin.id.clone(),
            reason: failure.describe(program),
        }
    }

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[tokio::test]
    async fn test_streams_stdout_lines() {
        let stream = stream_lines(
            sh("printf 'one\\ntwo\\r\\nthree'"),
            SourceTag::local("host"),
            LineFormat::Journal,
            classify,
        )
        .unwrap();
        let lines: Vec<_> = stream.collect().await;
        let contents: Vec<Bytes> = lines.into_iter().map(|l| l.unwrap().content).collect();
        assert_eq!(
            contents,
            vec![Bytes::from("one"), Bytes::from("two"), Bytes::from("three")],
            "newline and CRLF endings are stripped, last line kept without terminator"
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_last_item() {
        let stream = stream_lines(
            sh("echo partial; echo 'no journal' >&2; exit 3"),
            SourceTag::local("host"),
            LineFormat::Journal,
            classify,
        )
        .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok(), "lines before the failure are kept");
        match &items[1] {
            Err(SourceError::Unavailable { reason, .. }) => {
                assert!(reason.contains("status 3"), "got {}", reason);
                assert!(reason.contains("no journal"), "stderr is attached: {}", reason);
            }
            other => panic!("expected Unavailable, got {:?}", other.as_ref().map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_fails_at_spawn() {
        let result = stream_lines(
            Command::new("/nonexistent/definitely-not-here"),
            SourceTag::local("host"),
            LineFormat::Journal,
            classify,
        );
        assert!(matches!(result, Err(SourceError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_child() {
        let mut stream = stream_lines(
            sh("echo first; sleep 30; echo never"),
            SourceTag::local("host"),
            LineFormat::Journal,
            classify,
        )
        .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content, Bytes::from("first"));
        let started = std::time::Instant::now();
        drop(stream);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_describe_failure() {
        let f = CommandFailure::Exit { code: Some(255), stderr: String::new() };
        assert_eq!(f.describe("ssh"), "ssh exited with status 255");
        let f = CommandFailure::Exit { code: None, stderr: "killed".into() };
        assert_eq!(f.describe("ssh"), "ssh exited with status signal: killed");
    }
}
