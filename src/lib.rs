//! # SQS Consumer
//!
//! A long-running consumer engine for AWS SQS. It polls a set of named queues,
//! dispatches every received message to the handler registered for its queue,
//! and deletes the message only after that handler succeeds.
//!
//! ## Features
//!
//! - One independent polling loop per queue, running on tokio
//! - Long polling with batches of up to 10 messages
//! - Concurrent handling of the messages of a batch, with a barrier before the next receive
//! - Deletion on success; failed messages are left for redelivery by the visibility timeout
//! - All-or-nothing startup: an unresolvable queue name starts no consumers at all
//! - Exponential backoff on receive errors, retried forever
//! - Optional graceful shutdown through [`ConsumerHandle`]
//!
//! Errors after startup (receive, handler and delete failures) are reported
//! through [`tracing`] and never stop a polling loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use sqs_consumer::{
//!     client::create_sqs_client_from_env,
//!     consumer::start_consumers,
//!     handler::{MessageHandler, handler_fn},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = create_sqs_client_from_env().await;
//!
//!     let mut consumers: HashMap<String, Arc<dyn MessageHandler>> = HashMap::new();
//!     consumers.insert(
//!         "orders".to_string(),
//!         Arc::new(handler_fn(|body: Vec<u8>| async move {
//!             println!("Processing message: {}", String::from_utf8_lossy(&body));
//!             Ok(())
//!         })),
//!     );
//!
//!     let handle = start_consumers(Arc::new(client), consumers).await?;
//!
//!     // Consumers run until shut down; dropping the handle leaves them running.
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown_and_wait().await;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod consumer;
pub mod errors;
pub mod handler;
pub mod queue_service;

pub use consumer::{ConsumerHandle, SqsConsumer, start_consumers};
pub use errors::{HandlerError, QueueServiceError, SqsConsumerError};
pub use handler::{HandlerResult, MessageHandler};
pub use queue_service::{QueueAddress, QueueService, ReceivedMessage};
