use std::str::FromStr;

use thiserror::Error;

/// Boxed error accepted as the underlying cause of a [`HandlerError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types returned when starting SQS consumers.
///
/// Only registration can fail visibly. Errors that happen after the polling
/// loops are running (receive, handler and delete failures) are logged and
/// never returned to the caller.
#[derive(Debug, Error)]
pub enum SqsConsumerError {
    /// A queue name could not be resolved to a queue address.
    ///
    /// Resolution is all-or-nothing: when this is returned, no polling loop
    /// was started for any queue in the registration call.
    #[error("failed to resolve queue `{queue_name}`: {source}")]
    QueueResolution {
        queue_name: String,
        #[source]
        source: QueueServiceError,
    },

    /// The consumer configuration is outside the range the queue service accepts.
    #[error("invalid consumer configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors reported by a [`QueueService`](crate::queue_service::QueueService).
#[derive(Debug, Error)]
pub enum QueueServiceError {
    /// The request could not be completed by the queue service.
    #[error("{operation} request failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The queue service answered, but without a field the consumer needs.
    #[error("malformed queue service response: {0}")]
    MalformedResponse(String),
}

impl QueueServiceError {
    /// Creates a [`QueueServiceError::Request`] for the named operation.
    pub fn request(operation: &'static str, message: impl std::fmt::Display) -> Self {
        QueueServiceError::Request {
            operation,
            message: message.to_string(),
        }
    }
}

/// Failure reported by a message handler.
///
/// Returning this from a handler leaves the message in the queue, where it
/// becomes visible again after the queue's visibility timeout.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    /// Creates a new `HandlerError` with the provided message.
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a `HandlerError` that keeps the error which caused it.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        HandlerError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl FromStr for HandlerError {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HandlerError::new(s))
    }
}

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        HandlerError::new(s)
    }
}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        HandlerError::new(s)
    }
}
