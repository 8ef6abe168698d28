use ingest::error::ErrorKind;
use thiserror::Error;

/// A provider failure, already classified onto the shared taxonomy so
/// callers never branch on provider-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn missing_credential(provider: &str) -> Self {
        Self::new(ErrorKind::MissingCredential, format!("no API key configured for {}", provider))
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderRejected, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderTimeout, message)
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderUnreachable, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Non-success HTTP status to error kind.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        413 => ErrorKind::PayloadTooLarge,
        408 | 504 => ErrorKind::ProviderTimeout,
        429 => ErrorKind::RateLimited,
        // 529: Anthropic "overloaded".
        500..=599 => ErrorKind::ProviderUnreachable,
        _ => ErrorKind::ProviderRejected,
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let (timeout, connect, decode) = (err.is_timeout(), err.is_connect(), err.is_decode() || err.is_body());
        let message = err.without_url().to_string();
        if timeout {
            ProviderError::timeout(format!("request timed out: {}", message))
        } else if connect {
            ProviderError::unreachable(format!("connection failed: {}", message))
        } else if decode {
            ProviderError::rejected(format!("unreadable response: {}", message))
        } else if let Some(status) = status {
            ProviderError::new(classify_status(status), message)
        } else {
            ProviderError::unreachable(format!("transport error: {}", message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        for status in [400, 401, 403, 404, 422] {
            assert_eq!(classify_status(status), ErrorKind::ProviderRejected, "status {}", status);
        }
        assert_eq!(classify_status(413), ErrorKind::PayloadTooLarge);
        assert_eq!(classify_status(408), ErrorKind::ProviderTimeout);
        assert_eq!(classify_status(504), ErrorKind::ProviderTimeout);
        assert_eq!(classify_status(429), ErrorKind::RateLimited);
        for status in [500, 502, 503, 529, 599] {
            assert_eq!(classify_status(status), ErrorKind::ProviderUnreachable, "status {}", status);
        }
    }

    #[test]
    fn test_transient_follows_kind() {
        assert!(ProviderError::timeout("slow").is_transient());
        assert!(ProviderError::new(ErrorKind::RateLimited, "429").is_transient());
        assert!(!ProviderError::unreachable("dns").is_transient());
        assert!(!ProviderError::rejected("401").is_transient());
        assert!(!ProviderError::missing_credential("claude").is_transient());
    }

    #[test]
    fn test_display() {
        let err = ProviderError::rejected("invalid x-api-key");
        assert_eq!(err.to_string(), "provider_rejected: invalid x-api-key");
    }
}
