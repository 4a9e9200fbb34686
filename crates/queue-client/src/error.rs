//! Error types for queue operations.

use chrono::Duration;
use thiserror::Error;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue does not exist: {queue}")]
    QueueDoesNotExist { queue: String },

    #[error("Queue '{queue_name}' was deleted recently and cannot be recreated yet")]
    QueueDeletedRecently { queue_name: String },

    #[error("Receipt handle is invalid or expired: {receipt}")]
    ReceiptHandleInvalid { receipt: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request throttled by {provider}: {message}")]
    Throttled { provider: String, message: String },

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Provider error ({provider}): {code} - {message}")]
    ProviderError {
        provider: String,
        code: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl QueueError {
    /// Check if the error means the target is already gone.
    ///
    /// Cleanup paths treat these as success: a queue that does not exist
    /// needs no deleting.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::QueueDoesNotExist { .. })
    }

    /// Check if the same request may succeed when retried later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::QueueDeletedRecently { .. }
                | Self::ConnectionFailed { .. }
                | Self::Throttled { .. }
        )
    }

    /// Get suggested retry delay
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            // SQS refuses to recreate a queue name for 60 seconds after deletion
            Self::QueueDeletedRecently { .. } => Some(Duration::seconds(60)),
            Self::ConnectionFailed { .. } => Some(Duration::seconds(5)),
            Self::Throttled { .. } => Some(Duration::seconds(1)),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },

    #[error("Batch entry ids are not distinct: '{id}' appears more than once")]
    DuplicateBatchEntryId { id: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
