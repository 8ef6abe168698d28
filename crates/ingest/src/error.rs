//! Shared error taxonomy.
//!
//! Every component error maps onto an [`ErrorKind`] so callers (the
//! orchestrator, the renderer) never branch on source- or provider-specific
//! error types.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Log facility absent or inaccessible.
    SourceUnavailable,
    /// Transport to a remote host failed (auth, timeout, unreachable).
    ConnectionError,
    /// Some containers/hosts failed while others succeeded.
    PartialSourceFailure,
    MissingCredential,
    RateLimited,
    ProviderTimeout,
    /// Provider refused the request (auth, malformed request or response).
    ProviderRejected,
    /// Provider could not be reached or answered with a server error.
    ProviderUnreachable,
    PayloadTooLarge,
    /// Run deadline expired or the user interrupted.
    Cancelled,
}

impl ErrorKind {
    /// Transient kinds are eligible for the single provider retry. Server
    /// errors and refused connections are surfaced at once.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::ProviderTimeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::PartialSourceFailure => "partial_source_failure",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ProviderTimeout => "provider_timeout",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::ProviderUnreachable => "provider_unreachable",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
