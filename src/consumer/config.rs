use std::time::Duration;

use crate::errors::SqsConsumerError;

/// Largest batch a single SQS receive call can return.
pub const MAX_BATCH_SIZE: i32 = 10;

/// Longest long-poll wait SQS accepts, in seconds.
pub const MAX_WAIT_TIME_SECONDS: i32 = 20;

/// Configuration for the polling loops started by a consumer.
///
/// # Fields
/// - `max_number_of_messages`: The maximum number of messages to receive in a single request.
/// - `wait_time_seconds`: The wait time for long polling, in seconds.
/// - `backoff`: Delay applied between consecutive failed receive calls.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// The maximum number of messages to receive in a single request.
    ///
    /// This is also the maximum number of handler invocations in flight per queue.
    pub max_number_of_messages: i32,

    /// The wait time for long polling, in seconds.
    pub wait_time_seconds: i32,

    /// Backoff applied when receiving from the queue fails.
    pub backoff: BackoffConfig,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            max_number_of_messages: MAX_BATCH_SIZE,
            wait_time_seconds: MAX_WAIT_TIME_SECONDS,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ConsumerConfig {
    pub fn with_max_number_of_messages(mut self, max_number_of_messages: i32) -> Self {
        self.max_number_of_messages = max_number_of_messages;
        self
    }

    pub fn with_wait_time_seconds(mut self, wait_time_seconds: i32) -> Self {
        self.wait_time_seconds = wait_time_seconds;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Checks that every value is within the range SQS accepts.
    pub fn validate(&self) -> Result<(), SqsConsumerError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.max_number_of_messages) {
            return Err(SqsConsumerError::InvalidConfiguration(format!(
                "max_number_of_messages must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.max_number_of_messages
            )));
        }
        if !(0..=MAX_WAIT_TIME_SECONDS).contains(&self.wait_time_seconds) {
            return Err(SqsConsumerError::InvalidConfiguration(format!(
                "wait_time_seconds must be between 0 and {MAX_WAIT_TIME_SECONDS}, got {}",
                self.wait_time_seconds
            )));
        }
        self.backoff.validate()
    }
}

/// Exponential backoff between consecutive receive failures.
///
/// The delay after the `n`th consecutive failure is
/// `initial_delay * multiplier^(n - 1)`, capped at `max_delay`. Receiving is
/// retried forever; a successful receive resets the sequence.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// Growth factor applied per consecutive failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(20),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        BackoffConfig {
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// Returns the delay to wait after `consecutive_failures` failed receives in a row.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let exponent = consecutive_failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        // `powi` saturates to infinity for large exponents; an unvalidated
        // multiplier can also make the delay negative or NaN
        if !delay_secs.is_finite()
            || delay_secs < 0.0
            || delay_secs >= self.max_delay.as_secs_f64()
        {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }

    fn validate(&self) -> Result<(), SqsConsumerError> {
        if self.initial_delay.is_zero() {
            return Err(SqsConsumerError::InvalidConfiguration(
                "backoff initial_delay must be greater than zero".to_string(),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(SqsConsumerError::InvalidConfiguration(format!(
                "backoff initial_delay ({:?}) must not exceed max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SqsConsumerError::InvalidConfiguration(format!(
                "backoff multiplier must be at least 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}
