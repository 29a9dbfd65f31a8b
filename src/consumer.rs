use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};

use crate::errors::SqsConsumerError;
use crate::handler::{HandlerResult, MessageHandler, handler_fn, shared_handler_fn};
use crate::queue_service::QueueService;

pub mod config;
mod polling;

pub use config::{BackoffConfig, ConsumerConfig};
use polling::PollingLoop;

/// Registry of queue handlers that starts one polling loop per queue.
///
/// Handlers are registered by queue *name*; names are resolved to queue
/// addresses when [`start`](SqsConsumer::start) is called.
///
/// # Example
///
/// ```rust,no_run
/// use sqs_consumer::{client::create_sqs_client_from_env, consumer::SqsConsumer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = create_sqs_client_from_env().await;
///
///     let mut consumer = SqsConsumer::new(client);
///     consumer.add_handler_fn("orders", |body: Vec<u8>| async move {
///         println!("order: {}", String::from_utf8_lossy(&body));
///         Ok(())
///     });
///
///     let handle = consumer.start().await?;
///     tokio::signal::ctrl_c().await?;
///     handle.shutdown_and_wait().await;
///     Ok(())
/// }
/// ```
pub struct SqsConsumer<S>
where
    S: QueueService,
{
    /// The queue service shared by every polling loop.
    service: Arc<S>,

    config: ConsumerConfig,

    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl<S> SqsConsumer<S>
where
    S: QueueService,
{
    pub fn new(service: S) -> Self {
        Self::from_shared(Arc::new(service))
    }

    /// Creates a consumer around a queue service that is already shared.
    pub fn from_shared(service: Arc<S>) -> Self {
        SqsConsumer {
            service,
            config: ConsumerConfig::default(),
            handlers: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: ConsumerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Registers `handler` for the queue named `queue_name`.
    ///
    /// Registering a second handler for the same queue replaces the first.
    pub fn add_handler<H>(&mut self, queue_name: &str, handler: H) -> &mut Self
    where
        H: MessageHandler,
    {
        self.add_shared_handler(queue_name, Arc::new(handler))
    }

    /// Registers a handler that is already behind an `Arc`, so the same
    /// instance can serve several queues.
    pub fn add_shared_handler(
        &mut self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> &mut Self {
        if self.handlers.insert(queue_name.to_string(), handler).is_some() {
            warn!(queue_name = %queue_name, "Replacing previously registered handler");
        }
        self
    }

    /// Registers an async function as the handler for `queue_name`.
    pub fn add_handler_fn<F, Fut>(&mut self, queue_name: &str, handler: F) -> &mut Self
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_handler(queue_name, handler_fn(handler))
    }

    /// Registers an async function that also receives a clone of `shared_resources`
    /// on every invocation.
    pub fn add_handler_fn_with_shared<F, Fut, TShared>(
        &mut self,
        queue_name: &str,
        handler: F,
        shared_resources: TShared,
    ) -> &mut Self
    where
        F: Fn(Vec<u8>, TShared) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
        TShared: Clone + Send + Sync + 'static,
    {
        self.add_handler(queue_name, shared_handler_fn(handler, shared_resources))
    }

    /// Resolves every registered queue and starts its polling loop.
    ///
    /// Consumes the registry, so each queue gets exactly one polling loop.
    ///
    /// Fails with [`SqsConsumerError::QueueResolution`] if any queue cannot be
    /// resolved, in which case no loop is started at all. On success the loops
    /// keep running in the background until [`ConsumerHandle::shutdown`] is
    /// called; dropping the handle leaves them running for the rest of the
    /// process lifetime.
    pub async fn start(self) -> Result<ConsumerHandle, SqsConsumerError> {
        self.config.validate()?;

        if self.handlers.is_empty() {
            warn!("No handlers registered, no queues will be consumed");
        }

        let mut queue_names: Vec<&String> = self.handlers.keys().collect();
        queue_names.sort();

        let mut resolved = Vec::with_capacity(queue_names.len());
        for queue_name in queue_names {
            let address = self
                .service
                .resolve_queue(queue_name)
                .await
                .map_err(|source| {
                    error!(
                        queue_name = %queue_name,
                        error = %source,
                        "Failed to resolve queue, no consumers started"
                    );
                    SqsConsumerError::QueueResolution {
                        queue_name: queue_name.clone(),
                        source,
                    }
                })?;

            info!(queue_name = %queue_name, queue_address = %address, "Resolved queue");
            resolved.push((queue_name.clone(), address, self.handlers[queue_name].clone()));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = resolved
            .into_iter()
            .map(|(queue_name, address, handler)| {
                let polling_loop =
                    PollingLoop::new(self.service.clone(), address, handler, self.config.clone());
                let span = info_span!("queue_consumer", queue_name = %queue_name);
                let task = tokio::spawn(polling_loop.run(shutdown_rx.clone()).instrument(span));
                (queue_name, task)
            })
            .collect();

        Ok(ConsumerHandle {
            shutdown_tx,
            workers,
        })
    }
}

/// Starts one polling loop per entry of `consumers`.
///
/// This is the map-based form of [`SqsConsumer::start`] using the default
/// [`ConsumerConfig`].
pub async fn start_consumers<S>(
    service: Arc<S>,
    consumers: HashMap<String, Arc<dyn MessageHandler>>,
) -> Result<ConsumerHandle, SqsConsumerError>
where
    S: QueueService,
{
    let mut consumer = SqsConsumer::from_shared(service);
    consumer.handlers = consumers;
    consumer.start().await
}

/// Handle to the polling loops started by a consumer.
///
/// Dropping the handle does not stop the loops.
pub struct ConsumerHandle {
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<(String, JoinHandle<()>)>,
}

impl ConsumerHandle {
    /// Names of the queues being consumed, in resolution order.
    pub fn queue_names(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().map(|(queue_name, _)| queue_name.as_str())
    }

    /// Returns `true` once every polling loop has exited.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|(_, task)| task.is_finished())
    }

    /// Signals every polling loop to stop.
    ///
    /// A loop stops before its next receive; a batch already being handled is
    /// finished (and acknowledged) first.
    pub fn shutdown(&self) {
        info!(queues = self.workers.len(), "Shutting down consumers");
        self.shutdown_tx.send_replace(true);
    }

    /// Waits for every polling loop to exit.
    ///
    /// Without a prior [`shutdown`](Self::shutdown) this waits for as long as
    /// the loops run, which is normally forever.
    pub async fn wait(self) {
        let ConsumerHandle {
            shutdown_tx,
            workers,
        } = self;

        let (queue_names, tasks): (Vec<_>, Vec<_>) = workers.into_iter().unzip();
        let results = join_all(tasks).await;

        for (queue_name, result) in queue_names.iter().zip(results) {
            if let Err(e) = result {
                error!(queue_name = %queue_name, error = %e, "Polling loop terminated abnormally");
            }
        }

        drop(shutdown_tx);
    }

    /// Signals shutdown and waits for every polling loop to exit.
    pub async fn shutdown_and_wait(self) {
        self.shutdown();
        self.wait().await;
    }
}
