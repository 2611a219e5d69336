//! Error types for chainwatch
//!
//! Failures are layered: [`ProviderError`] describes a single attempt against
//! one provider, [`FetchError`] describes the outcome of walking a whole
//! fallback chain, and [`CommandError`] is what an operation surfaces to the
//! runner. Nothing in this crate panics past its boundary; the runner turns a
//! `CommandError` into a failed envelope and an exit code.

use serde::Serialize;
use thiserror::Error;

/// Errors from a single request against a single provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request exceeded the per-attempt timeout
    #[error("request timed out")]
    Timeout,

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimited,

    /// Provider answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match what the parser expected
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Creates an InvalidResponse error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Folds a reqwest error into the taxonomy, keeping timeouts distinct
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

/// One failed attempt while walking a fallback chain, in call order
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailureRecord {
    /// Which provider was attempted
    pub provider_id: String,
    /// Why the attempt failed
    pub reason: String,
}

impl FailureRecord {
    pub fn new(provider_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from executing a fetch across an ordered fallback chain
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every provider in the chain failed; records are kept in call order
    /// and the first one is the primary cause (the chain head is the
    /// preferred source)
    #[error("all {} provider(s) failed; {}", .failures.len(), primary_cause(.failures))]
    AllProvidersFailed { failures: Vec<FailureRecord> },

    /// The chain for this endpoint was empty
    #[error("no providers configured for this endpoint")]
    NoProviders,
}

impl FetchError {
    /// The ordered failure records, empty for [`FetchError::NoProviders`]
    pub fn failures(&self) -> &[FailureRecord] {
        match self {
            Self::AllProvidersFailed { failures } => failures,
            Self::NoProviders => &[],
        }
    }
}

fn primary_cause(failures: &[FailureRecord]) -> String {
    match failures.first() {
        Some(first) => format!("{}: {}", first.provider_id, first.reason),
        None => "no attempts were made".to_string(),
    }
}

/// Errors surfaced by an operation to the command runner
#[derive(Debug, Error)]
pub enum CommandError {
    /// The underlying fetch (through cache and fallback chain) failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The operation was invoked with arguments it cannot use
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Catch-all for faults that should never happen in normal operation
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Creates an InvalidArgument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable tag used in JSON error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::AllProvidersFailed { .. }) => "all_providers_failed",
            Self::Fetch(FetchError::NoProviders) => "no_providers",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_providers_failed_names_the_first_failure() {
        let err = FetchError::AllProvidersFailed {
            failures: vec![
                FailureRecord::new("mempool.space", "HTTP 502: bad gateway"),
                FailureRecord::new("blockstream.info", "request timed out"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("all 2 provider(s) failed"));
        assert!(msg.contains("mempool.space: HTTP 502"));
        assert!(!msg.contains("blockstream.info"));
    }

    #[test]
    fn command_error_kinds_are_stable() {
        let err: CommandError = FetchError::NoProviders.into();
        assert_eq!(err.kind(), "no_providers");
        assert_eq!(
            CommandError::invalid_argument("bad hash").kind(),
            "invalid_argument"
        );
    }
}
