//! The queue transport seen by the consumer.
//!
//! The consumer needs three operations from a queue service: resolve a queue
//! name to an address, long-poll a batch of messages, and delete a delivery by
//! its receipt token. [`QueueService`] captures exactly those, and is
//! implemented for [`aws_sdk_sqs::Client`] in the `sqs` submodule.

use std::fmt;

use async_trait::async_trait;

use crate::errors::QueueServiceError;

mod sqs;

/// Resolved, opaque address of a queue (for SQS, the queue URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueAddress(String);

impl QueueAddress {
    pub fn new(address: impl Into<String>) -> Self {
        QueueAddress(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QueueAddress {
    fn from(address: String) -> Self {
        QueueAddress(address)
    }
}

/// A single delivery of a message.
///
/// A redelivered copy of the same logical message carries the same `id` but a
/// different `receipt_token`; only the token of this delivery can delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Identifier used for logging and correlation.
    pub id: String,

    /// The opaque message payload.
    pub body: Vec<u8>,

    /// Credential required to acknowledge this specific delivery.
    pub receipt_token: String,
}

impl ReceivedMessage {
    pub fn new(
        id: impl Into<String>,
        body: impl Into<Vec<u8>>,
        receipt_token: impl Into<String>,
    ) -> Self {
        ReceivedMessage {
            id: id.into(),
            body: body.into(),
            receipt_token: receipt_token.into(),
        }
    }
}

/// Operations the consumer performs against a queue service.
///
/// Implementations are shared between every polling loop and every message
/// task, so they must be cheap to call concurrently.
#[async_trait]
pub trait QueueService: Send + Sync + 'static {
    /// Resolves a human-readable queue name to the address used by the other operations.
    async fn resolve_queue(&self, queue_name: &str) -> Result<QueueAddress, QueueServiceError>;

    /// Receives up to `max_messages` messages, waiting up to `wait_time_seconds`
    /// for at least one to arrive.
    async fn receive_messages(
        &self,
        queue: &QueueAddress,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<ReceivedMessage>, QueueServiceError>;

    /// Deletes the delivery identified by `receipt_token`.
    async fn delete_message(
        &self,
        queue: &QueueAddress,
        receipt_token: &str,
    ) -> Result<(), QueueServiceError>;
}
