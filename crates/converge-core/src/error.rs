//! Error types for the reconciliation core
//!
//! This module defines all error types used throughout the workspace. The
//! gateway crate maps HTTP outcomes onto the same enum, so callers can decide
//! between retrying, fixing input and investigating by matching on variants.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation system
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or timeout talking to the remote API
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single-resource fetch returned 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// A declared reference does not exist in its catalog
    #[error("invalid {field}: {value}")]
    InvalidReference {
        /// Declared field that carried the reference
        field: String,
        /// The reference as declared
        value: String,
    },

    /// Declared input rejected before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The declared change cannot be applied to an existing resource
    #[error("{field} cannot be changed in place; the resource must be replaced")]
    RequiresReplacement {
        /// Declared field that changed
        field: String,
    },

    /// A write was acknowledged but never became visible
    #[error("Timed out after {attempts} attempt(s) waiting for {what} to become visible")]
    PropagationTimeout {
        /// What was being waited for
        what: String,
        /// Attempts made before giving up
        attempts: usize,
    },

    /// An ordered instance never appeared under its subscription
    #[error(
        "Timed out after {attempts} attempt(s) waiting for instance of subscription {subscription_id}"
    )]
    ProvisioningTimeout {
        /// Subscription returned by the order step
        subscription_id: String,
        /// Attempts made before giving up
        attempts: usize,
    },

    /// No payment method declared and none marked default on the account
    #[error("No default payment method found on the account")]
    NoDefaultPaymentMethod,

    /// The delete-then-recreate rewrite stopped between its two phases
    #[error(
        "Partial failure in zone {zone}: group {name}/{record_type} was deleted but {kept:?} could not be re-created: {source}"
    )]
    PartialFailure {
        /// Zone being rewritten
        zone: String,
        /// Group name
        name: String,
        /// Group type
        record_type: String,
        /// Contents that are currently missing from the zone
        kept: Vec<String>,
        /// Why the re-create failed
        #[source]
        source: Box<Error>,
    },

    /// A synthetic record id could not be parsed
    #[error("Malformed record id: {0}")]
    MalformedId(String),

    /// The API answered with a status outside the success set
    #[error("{operation} failed (HTTP {status}): {body}")]
    Api {
        /// Operation that failed
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body as returned
        body: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid reference error naming the declared field
    pub fn invalid_reference(field: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidReference {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an API status error
    pub fn api(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether this is a 404 from a single-resource fetch
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the declared input has to be fixed before trying again
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidReference { .. }
                | Self::InvalidInput(_)
                | Self::RequiresReplacement { .. }
                | Self::MalformedId(_)
        )
    }

    /// Whether repeating the whole operation later may succeed
    ///
    /// `PartialFailure` is deliberately excluded: the zone is in an
    /// intermediate state that a blind retry would not repair.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::RateLimited(_)
            | Self::PropagationTimeout { .. }
            | Self::ProvisioningTimeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
