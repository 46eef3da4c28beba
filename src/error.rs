//! Error types returned by the broker.
//!
//! [`BrokerError`] has exactly two kinds:
//!
//! - [`BrokerError::Timeout`] — an operation could not finish within the configured bound.
//!   The broker is still running; the caller may retry.
//! - [`BrokerError::Closed`] — the broker has shut down. Terminal for that instance:
//!   every later operation fails the same way.
//!
//! Helper methods (`as_label`, `as_message`, `is_retryable`) are provided for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by broker operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// The operation did not complete within the configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The broker has been closed.
    #[error("broker closed")]
    Closed,
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanout::BrokerError;
    /// use std::time::Duration;
    ///
    /// let err = BrokerError::Timeout { timeout: Duration::from_millis(10) };
    /// assert_eq!(err.as_label(), "broker_timeout");
    /// assert_eq!(BrokerError::Closed.as_label(), "broker_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::Timeout { .. } => "broker_timeout",
            BrokerError::Closed => "broker_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BrokerError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            BrokerError::Closed => "broker closed".to_string(),
        }
    }

    /// Indicates whether the operation may succeed if retried.
    ///
    /// # Example
    /// ```
    /// use fanout::BrokerError;
    /// use std::time::Duration;
    ///
    /// assert!(BrokerError::Timeout { timeout: Duration::from_secs(1) }.is_retryable());
    /// assert!(!BrokerError::Closed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Timeout { .. })
    }
}
