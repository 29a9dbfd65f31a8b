use std::future::Future;

use async_trait::async_trait;

use crate::errors::HandlerError;

/// Outcome of handling one message.
pub type HandlerResult = Result<(), HandlerError>;

/// Trait for implementing message handlers.
///
/// A handler receives the body of one message. Returning `Ok(())` makes the
/// consumer delete the message; returning an error leaves it in the queue for
/// redelivery after the visibility timeout. Handlers can be invoked
/// concurrently for different messages of the same batch, and a message may be
/// delivered more than once, so implementations should be idempotent.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, body: &[u8]) -> HandlerResult;
}

/// Adapts an async function into a [`MessageHandler`].
///
/// Created by [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    handler: F,
}

/// Wraps an async function taking the message body as a [`MessageHandler`].
///
/// # Example
///
/// ```rust
/// use sqs_consumer::handler::handler_fn;
///
/// let handler = handler_fn(|body: Vec<u8>| async move {
///     println!("Processing message: {}", String::from_utf8_lossy(&body));
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(handler: F) -> HandlerFn<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { handler }
}

#[async_trait]
impl<F, Fut> MessageHandler for HandlerFn<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, body: &[u8]) -> HandlerResult {
        (self.handler)(body.to_vec()).await
    }
}

/// Adapts an async function and a shared resource into a [`MessageHandler`].
///
/// The shared resource is cloned into every invocation, so it is typically an
/// `Arc`, a connection pool, or another cheaply cloneable handle.
///
/// Created by [`shared_handler_fn`].
#[derive(Clone)]
pub struct SharedHandlerFn<F, TShared> {
    handler: F,
    shared_resources: TShared,
}

/// Wraps an async function taking the message body and a shared resource.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use sqs_consumer::handler::shared_handler_fn;
///
/// let processed = Arc::new(AtomicUsize::new(0));
/// let handler = shared_handler_fn(
///     |_body: Vec<u8>, processed: Arc<AtomicUsize>| async move {
///         processed.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     },
///     processed,
/// );
/// ```
pub fn shared_handler_fn<F, Fut, TShared>(
    handler: F,
    shared_resources: TShared,
) -> SharedHandlerFn<F, TShared>
where
    F: Fn(Vec<u8>, TShared) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
    TShared: Clone + Send + Sync + 'static,
{
    SharedHandlerFn {
        handler,
        shared_resources,
    }
}

#[async_trait]
impl<F, Fut, TShared> MessageHandler for SharedHandlerFn<F, TShared>
where
    F: Fn(Vec<u8>, TShared) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
    TShared: Clone + Send + Sync + 'static,
{
    async fn handle(&self, body: &[u8]) -> HandlerResult {
        (self.handler)(body.to_vec(), self.shared_resources.clone()).await
    }
}
