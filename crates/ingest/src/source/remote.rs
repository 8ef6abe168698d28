//! Remote journal: `journalctl` over an `ssh` session.
//!
//! The session is the child process behind the line stream; it is killed
//! when the stream is dropped. Password authentication goes through
//! `sshpass -e`, which reads the secret from `SSHPASS` so it never appears
//! on a command line or in a process listing.

use std::ffi::OsStr;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::process::Command;

use crate::conf::SshConfig;
use crate::deadline::{Cancelled, Deadline};
use crate::record::{LineFormat, SourceTag, Window};
use crate::source::command::{stream_lines, CommandFailure};
use crate::source::local::journalctl_args;
use crate::source::{FetchHints, LogSource, SourceError, SourceFetch};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// `ssh` reserves 255 for its own failures (resolve, connect, auth).
const SSH_EXIT_CONNECTION: i32 = 255;
/// `sshpass`: wrong password / unknown host key.
const SSHPASS_EXIT_AUTH: [i32; 2] = [5, 6];

#[derive(Clone, PartialEq, Eq)]
pub enum SshCredential {
    /// Whatever the local ssh-agent offers.
    Agent,
    KeyFile(PathBuf),
    Password(String),
}

impl fmt::Debug for SshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshCredential::Agent => f.write_str("Agent"),
            SshCredential::KeyFile(p) => f.debug_tuple("KeyFile").field(p).finish(),
            SshCredential::Password(_) => f.write_str("Password(****)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    /// `None` lets ssh pick the current user.
    pub user: Option<String>,
    pub credential: SshCredential,
}

impl SshTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: None,
            credential: SshCredential::Agent,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_credential(mut self, credential: SshCredential) -> Self {
        self.credential = credential;
        self
    }

    /// `user@host`, or bare `host`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Options and destination, ending with `--`; the remote command follows.
    pub fn ssh_args(&self, config: &SshConfig) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", config.connect_timeout_secs),
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", config.strict_host_key_checking),
        ];
        match &self.credential {
            SshCredential::Agent => {
                args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
            }
            SshCredential::KeyFile(path) => {
                args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
                args.push("-i".to_string());
                args.push(expand_tilde(path).to_string_lossy().into_owned());
            }
            SshCredential::Password(_) => {
                args.extend([
                    "-o".to_string(),
                    "PreferredAuthentications=password,keyboard-interactive".to_string(),
                    "-o".to_string(),
                    "NumberOfPasswordPrompts=1".to_string(),
                ]);
            }
        }
        args.push(self.destination());
        args.push("--".to_string());
        args
    }

    /// `ssh`, or `sshpass -e ssh` for password auth, running `remote` on the
    /// target. The remote side joins `remote` with spaces and hands it to
    /// the login shell.
    pub fn command<I, S>(&self, config: &SshConfig, remote: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = match &self.credential {
            SshCredential::Password(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg("ssh").env("SSHPASS", password);
                cmd
            }
            _ => Command::new("ssh"),
        };
        cmd.args(self.ssh_args(config)).args(remote);
        cmd
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Whether a failed ssh invocation never reached the remote command.
pub(crate) fn is_transport_failure(program: &str, failure: &CommandFailure) -> bool {
    match failure {
        CommandFailure::Spawn(_) | CommandFailure::Io(_) => true,
        CommandFailure::Exit { code: None, .. } => true,
        CommandFailure::Exit { code: Some(code), .. } => {
            *code == SSH_EXIT_CONNECTION || (program == "sshpass" && SSHPASS_EXIT_AUTH.contains(code))
        }
    }
}

/// Failures of the transport are connection errors; a remote command that
/// ran and failed means the remote log facility is unavailable.
pub(crate) fn classify(origin: &SourceTag, program: &str, failure: CommandFailure) -> SourceError {
    let reason = failure.describe(program);
    let source_id = origin.id.clone();
    if is_transport_failure(program, &failure) {
        SourceError::Connection { source_id, reason }
    } else {
        SourceError::Unavailable { source_id, reason }
    }
}

/// Reads the journal of a remote host through the system `ssh` client.
pub struct RemoteJournal {
    target: SshTarget,
    config: SshConfig,
}

impl RemoteJournal {
    pub fn new(target: SshTarget, config: SshConfig) -> Self {
        Self { target, config }
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// The full argument vector after the program name.
    pub fn ssh_args(&self, window: &Window, hints: &FetchHints) -> Vec<String> {
        let mut args = self.target.ssh_args(&self.config);
        args.extend(self.remote_command(window, hints));
        args
    }

    fn remote_command(&self, window: &Window, hints: &FetchHints) -> Vec<String> {
        let mut remote = vec!["journalctl".to_string()];
        remote.extend(journalctl_args(window, hints.tail_lines));
        remote
    }

    pub fn command(&self, window: &Window, hints: &FetchHints) -> Command {
        self.target.command(&self.config, self.remote_command(window, hints))
    }
}

impl LogSource for RemoteJournal {
    fn name(&self) -> String {
        format!("remote journal ({}:{})", self.target.host, self.target.port)
    }

    fn tag(&self) -> SourceTag {
        SourceTag::remote(self.target.host.clone())
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
                    source_id: self.target.host.clone(),
                    reason: Cancelled::Interrupted,
                });
            }
            tracing::info!(
                host = %self.target.host,
                port = self.target.port,
                user = ?self.target.user,
                auth = ?self.target.credential,
                "opening ssh session"
            );
            let lines = stream_lines(
                self.command(&window, hints),
                self.tag(),
                LineFormat::Journal,
                classify,
            )?;
            Ok(SourceFetch::lines(lines))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn exit(code: Option<i32>) -> CommandFailure {
        CommandFailure::Exit { code, stderr: String::new() }
    }

    // ── Target ──────────────────────────────────────────────────

    #[test]
    fn test_destination() {
        assert_eq!(SshTarget::new("db-1").destination(), "db-1");
        assert_eq!(SshTarget::new("db-1").with_user("ops").destination(), "ops@db-1");
        assert_eq!(SshTarget::new("db-1").port, 22, "default port");
    }

    #[test]
    fn test_password_is_masked_in_debug() {
        let target = SshTarget::new("db-1")
            .with_credential(SshCredential::Password("hunter2".into()));
        let printed = format!("{:?}", target);
        assert!(!printed.contains("hunter2"), "password leaked: {}", printed);
        assert!(printed.contains("Password(****)"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir();
        let expanded = expand_tilde(Path::new("~/.ssh/id_ed25519"));
        match home {
            Some(home) => assert_eq!(expanded, home.join(".ssh/id_ed25519")),
            None => assert_eq!(expanded, PathBuf::from("~/.ssh/id_ed25519")),
        }
        assert_eq!(expand_tilde(Path::new("/etc/key")), PathBuf::from("/etc/key"));
    }

    // ── Command line ────────────────────────────────────────────

    #[test]
    fn test_key_auth_args() {
        let remote = RemoteJournal::new(
            SshTarget::new("db-1")
                .with_port(2222)
                .with_user("ops")
                .with_credential(SshCredential::KeyFile(PathBuf::from("/keys/id"))),
            SshConfig::default(),
        );
        let args = remote.ssh_args(&window(), &FetchHints::default());
        assert_eq!(&args[..2], ["-p", "2222"]);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        let i = args.iter().position(|a| a == "-i").expect("-i present");
        assert_eq!(args[i + 1], "/keys/id");
        let sep = args.iter().position(|a| a == "--").expect("separator present");
        assert_eq!(args[sep - 1], "ops@db-1");
        assert_eq!(args[sep + 1], "journalctl");
        assert_eq!(args[sep + 2], "--since=@1717239600");
    }

    #[test]
    fn test_password_never_on_command_line() {
        let remote = RemoteJournal::new(
            SshTarget::new("db-1").with_credential(SshCredential::Password("hunter2".into())),
            SshConfig::default(),
        );
        let cmd = remote.command(&window(), &FetchHints::default());
        let std = cmd.as_std();
        assert_eq!(std.get_program(), "sshpass");
        assert!(std.get_args().all(|a| a != "hunter2"));
        assert!(!remote
            .ssh_args(&window(), &FetchHints::default())
            .contains(&"BatchMode=yes".to_string()));
        let env: Vec<_> = std.get_envs().collect();
        assert!(env.iter().any(|(k, v)| *k == "SSHPASS" && v.is_some()));
    }

    // ── Classification ──────────────────────────────────────────

    #[test]
    fn test_exit_255_is_connection_error() {
        let tag = SourceTag::remote("db-1");
        assert!(matches!(classify(&tag, "ssh", exit(Some(255))), SourceError::Connection { .. }));
        assert!(matches!(classify(&tag, "ssh", exit(None)), SourceError::Connection { .. }));
    }

    #[test]
    fn test_missing_binary_is_connection_error() {
        let tag = SourceTag::remote("db-1");
        let failure = CommandFailure::Spawn(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(classify(&tag, "sshpass", failure), SourceError::Connection { .. }));
    }

    #[test]
    fn test_remote_journal_failure_is_unavailable() {
        let tag = SourceTag::remote("db-1");
        assert!(matches!(classify(&tag, "ssh", exit(Some(1))), SourceError::Unavailable { .. }));
        assert!(
            matches!(classify(&tag, "ssh", exit(Some(5))), SourceError::Unavailable { .. }),
            "5 is only an auth failure when sshpass ran"
        );
        assert!(matches!(classify(&tag, "sshpass", exit(Some(5))), SourceError::Connection { .. }));
    }

    #[test]
    fn test_tag_is_remote_host() {
        let remote = RemoteJournal::new(SshTarget::new("db-1"), SshConfig::default());
        assert_eq!(remote.tag(), SourceTag::remote("db-1"));
    }
}
