#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqs_consumer::{QueueAddress, QueueService, QueueServiceError, ReceivedMessage};
use tokio::time::Instant;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Waits (in tokio time) until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(300), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition was not met in time");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Resolve(String),
    Receive(String),
    Delete(String),
    HandlerStarted(String),
    HandlerFinished(String),
}

/// Ordered record of everything the fake service and the test handlers observed.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.snapshot().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &Event) -> usize {
        self.snapshot().iter().filter(|e| *e == event).count()
    }

    /// Index of the `n`th (0-based) receive call against `queue_name`.
    pub fn nth_receive(&self, queue_name: &str, n: usize) -> Option<usize> {
        self.snapshot()
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == Event::Receive(queue_name.to_string()))
            .nth(n)
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_messages: i32,
    pub wait_time_seconds: i32,
    pub at: Instant,
}

type ScriptedReceive = Result<Vec<ReceivedMessage>, String>;

#[derive(Default)]
struct FakeState {
    known_queues: HashSet<String>,
    scripted: HashMap<String, VecDeque<ScriptedReceive>>,
    receive_requests: HashMap<String, Vec<ReceiveRequest>>,
    failing_deletes: HashSet<String>,
    deletes: Vec<String>,
}

/// In-memory queue service.
///
/// Receives pop scripted batches (or errors) in order. With nothing scripted,
/// a receive behaves like an SQS long poll that times out: it sleeps for the
/// requested wait time and returns an empty batch.
#[derive(Clone, Default)]
pub struct FakeQueueService {
    state: Arc<Mutex<FakeState>>,
    log: EventLog,
}

impl FakeQueueService {
    pub fn new(log: EventLog) -> Self {
        FakeQueueService {
            state: Arc::default(),
            log,
        }
    }

    pub fn address_of(queue_name: &str) -> String {
        format!("fake://queues/{queue_name}")
    }

    pub fn with_queue(self, queue_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .known_queues
            .insert(queue_name.to_string());
        self
    }

    pub fn push_batch(&self, queue_name: &str, messages: Vec<ReceivedMessage>) {
        self.script(queue_name, Ok(messages));
    }

    pub fn push_receive_error(&self, queue_name: &str, message: &str) {
        self.script(queue_name, Err(message.to_string()));
    }

    pub fn fail_deletes_for(&self, receipt_token: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .insert(receipt_token.to_string());
    }

    /// Receipt tokens of every delete attempt, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn receive_requests(&self, queue_name: &str) -> Vec<ReceiveRequest> {
        self.state
            .lock()
            .unwrap()
            .receive_requests
            .get(queue_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn receive_count(&self, queue_name: &str) -> usize {
        self.receive_requests(queue_name).len()
    }

    pub fn total_receive_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .receive_requests
            .values()
            .map(Vec::len)
            .sum()
    }

    fn script(&self, queue_name: &str, receive: ScriptedReceive) {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry(queue_name.to_string())
            .or_default()
            .push_back(receive);
    }

    fn queue_name_of(queue: &QueueAddress) -> String {
        queue
            .as_str()
            .trim_start_matches("fake://queues/")
            .to_string()
    }
}

#[async_trait]
impl QueueService for FakeQueueService {
    async fn resolve_queue(&self, queue_name: &str) -> Result<QueueAddress, QueueServiceError> {
        self.log.record(Event::Resolve(queue_name.to_string()));

        if self.state.lock().unwrap().known_queues.contains(queue_name) {
            Ok(QueueAddress::new(Self::address_of(queue_name)))
        } else {
            Err(QueueServiceError::request(
                "GetQueueUrl",
                "The specified queue does not exist",
            ))
        }
    }

    async fn receive_messages(
        &self,
        queue: &QueueAddress,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<ReceivedMessage>, QueueServiceError> {
        let queue_name = Self::queue_name_of(queue);
        self.log.record(Event::Receive(queue_name.clone()));

        let scripted = {
            let mut state = self.state.lock().unwrap();
            state
                .receive_requests
                .entry(queue_name.clone())
                .or_default()
                .push(ReceiveRequest {
                    max_messages,
                    wait_time_seconds,
                    at: Instant::now(),
                });
            state
                .scripted
                .get_mut(&queue_name)
                .and_then(VecDeque::pop_front)
        };

        match scripted {
            Some(Ok(messages)) => Ok(messages),
            Some(Err(message)) => Err(QueueServiceError::request("ReceiveMessage", message)),
            None => {
                let wait = Duration::from_secs(wait_time_seconds.max(1) as u64);
                tokio::time::sleep(wait).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete_message(
        &self,
        _queue: &QueueAddress,
        receipt_token: &str,
    ) -> Result<(), QueueServiceError> {
        self.log.record(Event::Delete(receipt_token.to_string()));

        let mut state = self.state.lock().unwrap();
        state.deletes.push(receipt_token.to_string());
        if state.failing_deletes.contains(receipt_token) {
            return Err(QueueServiceError::request(
                "DeleteMessage",
                "ReceiptHandleIsInvalid",
            ));
        }
        Ok(())
    }
}
