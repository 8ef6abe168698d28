//! Ssh: implements `DockerOps` by running the `docker` CLI on a remote host
//! over an `ssh` session.
//!
//! Each call is one ssh invocation. Listing and stats run to completion;
//! logs stream through the shared command runner, so dropping the stream
//! kills the session. The daemon socket on the remote side is selected with
//! `DOCKER_HOST`.

use std::pin::Pin;
use std::process::Stdio;

use futures_util::StreamExt;

use crate::client::docker::DockerOps;
use crate::conf::SshConfig;
use crate::docker::client::DockerError;
use crate::docker::inventory::ContainerInfo;
use crate::docker::stats::ContainerStats;
use crate::docker::stream::{split_timestamp, LogLine, LogLineStream, LogRequest, StreamKind};
use crate::record::{LineFormat, SourceTag};
use crate::source::command::{stream_lines, CommandFailure};
use crate::source::remote::{classify, is_transport_failure, SshTarget};
use crate::source::SourceError;

/// Untimestamped lines kept from a logs session for the failure message.
const DIAGNOSTIC_LINES: usize = 4;

const JSON_FORMAT: &str = "'{{json .}}'";

pub struct SshDocker {
    target: SshTarget,
    ssh: SshConfig,
    /// Socket path on the remote host; empty leaves the CLI default.
    socket: String,
}

impl SshDocker {
    pub fn new(target: SshTarget, ssh: SshConfig, socket: impl Into<String>) -> Self {
        Self { target, ssh, socket: socket.into() }
    }

    pub fn host(&self) -> &str {
        &self.target.host
    }

    /// `docker <args>` as the remote shell command.
    pub fn remote_command(&self, args: &[String]) -> Vec<String> {
        let mut remote = Vec::with_capacity(args.len() + 3);
        if !self.socket.is_empty() {
            let path = self.socket.trim_start_matches("unix://");
            remote.push("env".to_string());
            remote.push(shell_quote(&format!("DOCKER_HOST=unix://{}", path)));
        }
        remote.push("docker".to_string());
        remote.extend(args.iter().cloned());
        remote
    }

    fn command(&self, args: &[String]) -> tokio::process::Command {
        self.target.command(&self.ssh, self.remote_command(args))
    }

    /// Run to completion and return stdout.
    async fn output(&self, args: &[String], container: &str) -> Result<String, DockerError> {
        let mut cmd = self.command(args);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        let program = cmd.as_std().get_program().to_string_lossy().into_owned();

        let output = cmd
            .output()
            .await
            .map_err(|e| DockerError::ConnectionFailed(CommandFailure::Spawn(e).describe(&program)))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let failure = CommandFailure::Exit {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        Err(classify_exit(&program, failure, container))
    }

    /// Arguments of the `docker logs` call for `request`. Stderr of the
    /// container is folded into the stream.
    pub fn logs_args(request: &LogRequest) -> Vec<String> {
        let mut args = vec![
            "logs".to_string(),
            "--timestamps".to_string(),
            "--since".to_string(),
            request.since.to_string(),
        ];
        if request.until > 0 {
            args.push("--until".to_string());
            args.push(request.until.to_string());
        }
        args.push("--tail".to_string());
        args.push(request.tail.map(|n| n.to_string()).unwrap_or_else(|| "all".into()));
        args.push(shell_quote(&request.container));
        args.push("2>&1".to_string());
        args
    }
}

impl DockerOps for SshDocker {
    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ContainerInfo>, DockerError>> + Send + '_>> {
        Box::pin(async move {
            let args: Vec<String> =
                ["ps", "--no-trunc", "--format", JSON_FORMAT].iter().map(|s| s.to_string()).collect();
            let stdout = self.output(&args, "").await?;
            stdout
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| {
                    ContainerInfo::from_cli_json(l).map_err(|e| {
                        DockerError::CommandFailed(format!("unexpected docker ps output on {}: {}", self.host(), e))
                    })
                })
                .collect()
        })
    }

    fn fetch_logs(
        &self,
        request: LogRequest,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<LogLineStream, DockerError>> + Send + '_>> {
        Box::pin(async move {
            let container = request.container.clone();
            let cmd = self.command(&Self::logs_args(&request));
            let mut lines = stream_lines(cmd, SourceTag::docker(container.clone()), LineFormat::Docker, classify)
                .map_err(connection_lost)?;

            let stream = async_stream::stream! {
                let mut diagnostics: Vec<String> = Vec::new();
                while let Some(item) = lines.next().await {
                    match item {
                        Ok(raw) => match split_timestamp(raw.content) {
                            (Some(ts), content) => {
                                yield Ok(LogLine { timestamp: Some(ts), stream: StreamKind::Stdout, content });
                            }
                            (None, content) => {
                                if diagnostics.len() < DIAGNOSTIC_LINES {
                                    diagnostics.push(String::from_utf8_lossy(&content).trim().to_string());
                                }
                            }
                        },
                        Err(e) => {
                            yield Err(logs_failure(e, &container, &diagnostics));
                            return;
                        }
                    }
                }
                if !diagnostics.is_empty() {
                    tracing::debug!(container = %container, dropped = diagnostics.len(), "untimestamped docker logs output");
                }
            };
            Ok(Box::pin(stream) as LogLineStream)
        })
    }

    fn stats_snapshot<'a>(
        &'a self,
        container: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let args = vec![
                "stats".to_string(),
                "--no-stream".to_string(),
                "--format".to_string(),
                JSON_FORMAT.to_string(),
                shell_quote(container),
            ];
            let stdout = self.output(&args, container).await?;
            let line = stdout
                .lines()
                .find(|l| !l.trim().is_empty())
                .ok_or_else(|| DockerError::StreamClosed(format!("no stats sample for {}", container)))?;
            ContainerStats::from_cli_json(container, line)
                .map_err(|e| DockerError::CommandFailed(format!("unexpected docker stats output: {}", e)))
        })
    }
}

/// Single-quote `s` for the remote login shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn connection_lost(e: SourceError) -> DockerError {
    DockerError::ConnectionFailed(e.to_string())
}

/// Map a failed run-to-completion call.
fn classify_exit(program: &str, failure: CommandFailure, container: &str) -> DockerError {
    let reason = failure.describe(program);
    if is_transport_failure(program, &failure) {
        return DockerError::ConnectionFailed(reason);
    }
    let detail = match &failure {
        CommandFailure::Exit { stderr, .. } => stderr.as_str(),
        _ => "",
    };
    from_cli_message(detail, container, reason)
}

/// Map the end of a logs session, using the untimestamped output as detail.
fn logs_failure(e: SourceError, container: &str, diagnostics: &[String]) -> DockerError {
    match e {
        SourceError::Connection { reason, .. } => DockerError::ConnectionFailed(reason),
        other => {
            let detail = diagnostics.join("; ");
            let reason = if detail.is_empty() { other.to_string() } else { format!("{}: {}", other, detail) };
            from_cli_message(&detail, container, reason)
        }
    }
}

/// The CLI reports daemon errors as text; match the stable phrases.
fn from_cli_message(detail: &str, container: &str, reason: String) -> DockerError {
    let lowered = detail.to_ascii_lowercase();
    if lowered.contains("no such container") {
        DockerError::ContainerNotFound(container.to_string())
    } else if lowered.contains("permission denied") {
        DockerError::PermissionDenied
    } else if lowered.contains("cannot connect to the docker daemon") || lowered.contains("command not found") {
        DockerError::ConnectionFailed(reason)
    } else {
        DockerError::CommandFailed(reason)
    }
}
