use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, warn};

use super::config::ConsumerConfig;
use crate::handler::MessageHandler;
use crate::queue_service::{QueueAddress, QueueService, ReceivedMessage};

/// Receive/dispatch/acknowledge loop for a single queue.
///
/// Each iteration long-polls one batch, runs the handler for every message of
/// the batch concurrently, and waits for all of them before polling again. At
/// most one batch per queue is ever in flight.
pub(crate) struct PollingLoop<S> {
    service: Arc<S>,
    queue: Arc<QueueAddress>,
    handler: Arc<dyn MessageHandler>,
    config: ConsumerConfig,
}

impl<S> PollingLoop<S>
where
    S: QueueService,
{
    pub(crate) fn new(
        service: Arc<S>,
        queue: QueueAddress,
        handler: Arc<dyn MessageHandler>,
        config: ConsumerConfig,
    ) -> Self {
        PollingLoop {
            service,
            queue: Arc::new(queue),
            handler,
            config,
        }
    }

    /// Runs until `shutdown` flips to `true`. If the sender is dropped without
    /// signalling, the loop runs for the rest of the process lifetime.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(queue_address = %self.queue, "Starting polling loop");

        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            // A batch that arrives together with the shutdown signal is still handled.
            let received = tokio::select! {
                biased;
                result = self.service.receive_messages(
                    &self.queue,
                    self.config.max_number_of_messages,
                    self.config.wait_time_seconds,
                ) => result,
                _ = shutdown_requested(&mut shutdown) => break,
            };

            let messages = match received {
                Ok(messages) => {
                    if consecutive_errors > 0 {
                        info!(
                            previous_errors = consecutive_errors,
                            "Receiving recovered after consecutive errors"
                        );
                        consecutive_errors = 0;
                    }
                    messages
                }
                Err(e) => {
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    let delay = self.config.backoff.delay_for(consecutive_errors);
                    error!(
                        error = %e,
                        consecutive_errors = consecutive_errors,
                        backoff_ms = delay.as_millis() as u64,
                        "Failed to receive messages, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                    continue;
                }
            };

            if messages.is_empty() {
                debug!("No messages received");
                continue;
            }

            debug!(message_count = messages.len(), "Received messages");
            self.process_batch(messages).await;
        }

        info!("Polling loop stopped");
    }

    /// Fans the batch out to one task per message and waits for all of them.
    async fn process_batch(&self, messages: Vec<ReceivedMessage>) {
        let mut inflight = JoinSet::new();

        for message in messages {
            inflight.spawn(
                process_message(
                    self.service.clone(),
                    self.queue.clone(),
                    self.handler.clone(),
                    message,
                )
                .in_current_span(),
            );
        }

        while let Some(result) = inflight.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Message task did not complete");
            }
        }
    }
}

/// Handles one delivery and deletes it if, and only if, the handler succeeded.
async fn process_message<S>(
    service: Arc<S>,
    queue: Arc<QueueAddress>,
    handler: Arc<dyn MessageHandler>,
    message: ReceivedMessage,
) where
    S: QueueService,
{
    let outcome = AssertUnwindSafe(handler.handle(&message.body))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(message_id = %message.id, error = %e, "Handler returned error");
            return;
        }
        Err(panic) => {
            error!(
                message_id = %message.id,
                panic = %panic_message(panic.as_ref()),
                "Message handler panicked"
            );
            return;
        }
    }

    // A failed delete only risks a duplicate delivery; the handler already succeeded.
    match service.delete_message(&queue, &message.receipt_token).await {
        Ok(()) => debug!(message_id = %message.id, "Deleted message"),
        Err(e) => error!(message_id = %message.id, error = %e, "Failed to delete message"),
    }
}

/// Resolves once shutdown has been signalled. Never resolves if the sender was
/// dropped without signalling.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}
