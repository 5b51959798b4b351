//! Error types for collaborator calls
//!
//! Every failure a collaborator can produce collapses into [`GatewayError`]:
//! - Transport failures (connection refused, reset, DNS)
//! - Per-call timeouts
//! - Non-2xx responses
//! - Malformed response bodies
//! - Local channel I/O (the terminal confirmation prompt)

/// Collaborator call error
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request could not be sent or the response could not be read
    #[error("{service} transport error: {source}")]
    Transport {
        /// Collaborator name
        service: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Call exceeded the per-call timeout
    #[error("{service} timed out after {after_ms}ms")]
    Timeout {
        /// Collaborator name
        service: String,
        /// Elapsed budget in milliseconds
        after_ms: u64,
    },

    /// Collaborator answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        /// Collaborator name
        service: String,
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("{service} returned a malformed response: {message}")]
    Decode {
        /// Collaborator name
        service: String,
        /// Decoder message
        message: String,
    },

    /// Collaborator is not available (unconfigured, exhausted script, etc.)
    #[error("{0} unavailable")]
    Unavailable(String),

    /// Client could not be constructed from its configuration
    #[error("invalid {service} configuration: {message}")]
    Config {
        /// Collaborator name
        service: String,
        /// What was wrong
        message: String,
    },

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Check if a repeated attempt could succeed
    ///
    /// Timeouts, connection-level failures, rate limiting and 5xx answers are
    /// transient. Client errors and malformed bodies are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport { source, .. } => !source.is_builder() && !source.is_decode(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::Unavailable(_) | Self::Config { .. } | Self::Io(_) => {
                false
            }
        }
    }

    /// Check if the request never reached the service
    ///
    /// Only these failures are safe to resend for calls that change the
    /// project.
    #[must_use]
    pub fn is_undelivered(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_connect())
    }

    /// Name of the collaborator that failed, when known
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Transport { service, .. }
            | Self::Timeout { service, .. }
            | Self::Status { service, .. }
            | Self::Decode { service, .. }
            | Self::Config { service, .. } => Some(service),
            Self::Unavailable(service) => Some(service),
            Self::Io(_) => None,
        }
    }
}
