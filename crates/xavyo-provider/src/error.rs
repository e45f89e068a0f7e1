//! Provider error types
//!
//! Every failure the reconciliation core reports is reduced to a closed
//! [`ErrorKind`] taxonomy so callers branch on structure, never on rendered
//! text. HTTP failures carry an [`ApiError`] (kind, stable code, message and
//! originating status); pre-HTTP failures carry a [`TransportFailure`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Closed set of classified error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AuthFailed,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    InvalidInput,
    Internal,
    Unavailable,
    DeadlineExceeded,
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::AuthFailed,
        ErrorKind::PermissionDenied,
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
        ErrorKind::InvalidInput,
        ErrorKind::Internal,
        ErrorKind::Unavailable,
        ErrorKind::DeadlineExceeded,
        ErrorKind::Unknown,
    ];

    /// Stable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::AuthFailed => "AUTH_FAILED",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Look up a kind by its stable code.
    ///
    /// Matching ignores case and accepts camel-case spellings such as
    /// `NotFound` or `alreadyExists`, which the v1 API emits.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized: String = code
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL.into_iter().find(|kind| {
            let candidate: String = kind
                .code()
                .chars()
                .filter(|c| *c != '_')
                .flat_map(char::to_lowercase)
                .collect();
            candidate == normalized
        })
    }

    /// Kind implied by an HTTP status when the server gives no code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::InvalidInput,
            401 => ErrorKind::AuthFailed,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::AlreadyExists,
            500 => ErrorKind::Internal,
            503 => ErrorKind::Unavailable,
            504 => ErrorKind::DeadlineExceeded,
            _ => ErrorKind::Unknown,
        }
    }

    /// Whether a caller may reasonably retry an operation that failed with this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Unavailable | ErrorKind::DeadlineExceeded)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified API error: one entry of the error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    /// Server-supplied code, or the kind's code when the server omitted one.
    pub code: String,
    pub message: String,
    /// Originating HTTP status.
    pub status: u16,
}

impl ApiError {
    pub fn new(
        kind: ErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            status,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} (HTTP {})", self.code, self.status)
        } else {
            write!(f, "{} (HTTP {}): {}", self.code, self.status, self.message)
        }
    }
}

/// Kind of a failure that happened before an HTTP status was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportFailureKind {
    /// Connection refused, reset, DNS failure and similar.
    Unavailable,
    /// The per-call timeout or caller deadline elapsed.
    DeadlineExceeded,
    /// The caller cancelled the call.
    Cancelled,
}

impl TransportFailureKind {
    pub fn code(&self) -> &'static str {
        match self {
            TransportFailureKind::Unavailable => "TRANSPORT_UNAVAILABLE",
            TransportFailureKind::DeadlineExceeded => "TRANSPORT_DEADLINE_EXCEEDED",
            TransportFailureKind::Cancelled => "TRANSPORT_CANCELLED",
        }
    }
}

/// A network-level failure (no HTTP response).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", .kind.code())]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: TransportFailureKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self {
            kind: TransportFailureKind::DeadlineExceeded,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: TransportFailureKind::Cancelled,
            message: "call cancelled by caller".to_string(),
        }
    }

    /// Taxonomy kind this failure surfaces as.
    pub fn error_kind(&self) -> ErrorKind {
        match self.kind {
            TransportFailureKind::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            TransportFailureKind::Unavailable | TransportFailureKind::Cancelled => {
                ErrorKind::Unavailable
            }
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportFailure::deadline_exceeded(format!("request timed out: {e}"))
        } else if e.is_connect() {
            TransportFailure::unavailable(format!("connection failed: {e}"))
        } else {
            TransportFailure::unavailable(e.to_string())
        }
    }
}

/// Lifecycle operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::List => "list",
        };
        f.write_str(name)
    }
}

fn describe_id(id: &Option<String>) -> String {
    id.as_deref().map(|i| format!(" {i}")).unwrap_or_default()
}

/// Error returned by every provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The platform answered with a non-success status.
    #[error("{operation} {resource}{} failed: {error}", describe_id(.id))]
    Api {
        operation: Operation,
        resource: String,
        id: Option<String>,
        error: ApiError,
    },

    /// No HTTP response was obtained.
    #[error("{operation} {resource}{} failed: {failure}", describe_id(.id))]
    Transport {
        operation: Operation,
        resource: String,
        id: Option<String>,
        failure: TransportFailure,
    },

    /// The operation was invoked from the wrong lifecycle state.
    #[error("{operation} {resource}: {message}")]
    Precondition {
        operation: Operation,
        resource: String,
        message: String,
    },

    /// A success response could not be decoded.
    #[error("{operation} {resource}{}: invalid response: {message}", describe_id(.id))]
    Decode {
        operation: Operation,
        resource: String,
        id: Option<String>,
        message: String,
    },

    /// Desired state failed local validation.
    #[error("invalid {resource} state: {message}")]
    InvalidState { resource: String, message: String },

    /// A wire value could not be written back into desired state.
    #[error("{resource}{}: cannot assign field '{field}': {message}", describe_id(.id))]
    FieldAssignment {
        resource: String,
        id: Option<String>,
        field: String,
        message: String,
    },

    /// A list query was rejected before being sent.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Provider configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProviderError {
    /// Classified kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Api { error, .. } => error.kind,
            ProviderError::Transport { failure, .. } => failure.error_kind(),
            ProviderError::Precondition { .. }
            | ProviderError::InvalidState { .. }
            | ProviderError::InvalidQuery(_)
            | ProviderError::Config(_) => ErrorKind::InvalidInput,
            ProviderError::Decode { .. } | ProviderError::FieldAssignment { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Stable code for this error.
    pub fn error_code(&self) -> &str {
        match self {
            ProviderError::Api { error, .. } => &error.code,
            ProviderError::Transport { failure, .. } => failure.kind.code(),
            ProviderError::Precondition { .. } => "PRECONDITION_FAILED",
            ProviderError::Decode { .. } => "DECODE_FAILED",
            ProviderError::InvalidState { .. } => "INVALID_STATE",
            ProviderError::FieldAssignment { .. } => "FIELD_ASSIGNMENT_FAILED",
            ProviderError::InvalidQuery(_) => "INVALID_QUERY",
            ProviderError::Config(_) => "INVALID_CONFIG",
        }
    }

    /// Originating HTTP status, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { error, .. } => Some(error.status),
            _ => None,
        }
    }

    /// Whether the caller may retry. Cancellation is never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport { failure, .. } => {
                failure.kind != TransportFailureKind::Cancelled
            }
            other => other.kind().is_retryable(),
        }
    }

    /// Whether this is a classified NotFound from the platform.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Api { error, .. } if error.kind == ErrorKind::NotFound)
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
