//! Uniform result envelope returned by every operation
//!
//! The envelope is the one shape the runner, the renderers and the JSON modes
//! all agree on: either `data` or `error` is present (never both, never
//! neither), plus when the operation ran and how long it took.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Instant;

use crate::error::{CommandError, FailureRecord};

/// Serializable view of a failed operation
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Stable machine-readable tag, see [`CommandError::kind`]
    pub kind: &'static str,
    /// Human-readable description
    pub message: String,
    /// Per-provider failures when a whole fallback chain was exhausted,
    /// in call order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
}

impl From<&CommandError> for ErrorInfo {
    fn from(err: &CommandError) -> Self {
        let failures = match err {
            CommandError::Fetch(fetch) => fetch.failures().to_vec(),
            _ => Vec::new(),
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            failures,
        }
    }
}

/// Success/failure wrapper with timing metadata
///
/// Constructed only through [`Envelope::ok`], [`Envelope::fail`] or
/// [`Envelope::capture`], which keep the data-xor-error invariant; the fields
/// stay private so no caller can produce an envelope that claims success
/// while carrying an error.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
    timestamp: DateTime<Utc>,
    execution_time_ms: u64,
}

impl<T> Envelope<T> {
    /// Wraps a successful result
    pub fn ok(data: T, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            execution_time_ms,
        }
    }

    /// Wraps a failed result
    pub fn fail(err: &CommandError, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorInfo::from(err)),
            timestamp: Utc::now(),
            execution_time_ms,
        }
    }

    /// Runs a fallible future and wraps its outcome, measuring wall time
    pub async fn capture<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, CommandError>>,
    {
        let started = Instant::now();
        let outcome = fut.await;
        let execution_time_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(data) => Self::ok(data, execution_time_ms),
            Err(err) => Self::fail(&err, execution_time_ms),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }
}
