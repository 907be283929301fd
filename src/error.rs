//! Failure taxonomy for request processing
//!
//! Every expected failure on the request path is a [`Failure`] carrying a stable
//! [`FailureKind`] tag and a human-readable reason. Failures are values, returned
//! through [`Outcome`], and are passed up unchanged by every wrapping stage unless
//! that stage is explicitly responsible for replacing them with a more specific one.
//!
//! Startup wiring errors are not failures; see [`crate::config::ConfigError`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result of any request-path operation
pub type Outcome<T> = Result<T, Failure>;

/// Stable tag identifying why a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The classifier could not produce a category
    ClassificationFailed,
    /// A routed name or the fallback name has no registry entry
    AgentNotFound,
    /// A middleware deliberately short-circuited the pipeline
    PipelineAborted,
    /// A handler reported its own failure
    DownstreamAgentFailure,
    /// The cancellation signal fired before the request completed
    Cancelled,
    /// A typed context read found no value, or a value of another type
    ContextMismatch,
    /// A write-once context fact was written a second time
    ContractViolation,
}

impl FailureKind {
    /// Snake-case tag, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ClassificationFailed => "classification_failed",
            FailureKind::AgentNotFound => "agent_not_found",
            FailureKind::PipelineAborted => "pipeline_aborted",
            FailureKind::DownstreamAgentFailure => "downstream_agent_failure",
            FailureKind::Cancelled => "cancelled",
            FailureKind::ContextMismatch => "context_mismatch",
            FailureKind::ContractViolation => "contract_violation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expected request failure
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {reason}")]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

/// Serializable failure shape handed to the hosting transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new<S: Into<String>>(kind: FailureKind, reason: S) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Create classification failure
    pub fn classification_failed<S: Into<String>>(reason: S) -> Self {
        Self::new(FailureKind::ClassificationFailed, reason)
    }

    /// Create agent-not-found failure naming the missing agent
    pub fn agent_not_found(name: &str) -> Self {
        Self::new(
            FailureKind::AgentNotFound,
            format!("Agent '{name}' is not registered"),
        )
    }

    /// Create pipeline-aborted failure
    pub fn pipeline_aborted<S: Into<String>>(reason: S) -> Self {
        Self::new(FailureKind::PipelineAborted, reason)
    }

    /// Create failure reported by a handler about its own work
    pub fn downstream<S: Into<String>>(reason: S) -> Self {
        Self::new(FailureKind::DownstreamAgentFailure, reason)
    }

    /// Create cancellation failure naming the stage that observed it
    pub fn cancelled(stage: &str) -> Self {
        Self::new(
            FailureKind::Cancelled,
            format!("Request cancelled at stage '{stage}'"),
        )
    }

    /// Create typed context read failure
    pub fn context_mismatch<S: Into<String>>(reason: S) -> Self {
        Self::new(FailureKind::ContextMismatch, reason)
    }

    /// Create write-once violation failure
    pub fn contract_violation<S: Into<String>>(reason: S) -> Self {
        Self::new(FailureKind::ContractViolation, reason)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }

    /// Convert into the transport-facing shape with a sanitized message
    pub fn to_error_details(&self) -> ErrorDetails {
        ErrorDetails {
            code: self.kind,
            message: sanitize_error_message(&self.reason),
        }
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("static regex is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("static regex is valid")
});

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Redact secret-looking values and sensitive paths, then cap the length
fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_ERROR_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}
