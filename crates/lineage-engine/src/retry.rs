//! Bounded retry with a fixed delay.
//!
//! `Transient` outcomes are retried; `NotFound` is authoritative and passed straight
//! through. The policy never logs. It reports how many attempts it made and callers
//! decide what to say about it.

use lineage_transport::FetchOutcome;
use lineage_types::RetryConfig;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Hook used to wait between attempts.
pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Terminal outcome of a retried fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RetryOutcome<T> {
    Found(T),
    NotFound,
    /// Every attempt was transient.
    FetchFailed { last_error: String },
}

/// Outcome plus the number of calls it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub outcome: RetryOutcome<T>,
    pub attempts: usize,
}

impl<T> Retried<T> {
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RetryOutcome::FetchFailed { .. })
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    sleeper: Sleeper,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            sleeper: Arc::new(std::thread::sleep),
        }
    }

    /// Replace the wait between attempts (tests record instead of sleeping).
    pub fn with_sleeper<F>(mut self, sleeper: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Call `fetch` until it stops being transient or attempts run out.
    pub fn run<T, F>(&self, mut fetch: F) -> Retried<T>
    where
        F: FnMut() -> FetchOutcome<T>,
    {
        let max_attempts = self.config.effective_attempts();
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            match fetch() {
                FetchOutcome::Found(v) => {
                    return Retried {
                        outcome: RetryOutcome::Found(v),
                        attempts,
                    }
                }
                FetchOutcome::NotFound => {
                    return Retried {
                        outcome: RetryOutcome::NotFound,
                        attempts,
                    }
                }
                FetchOutcome::Transient(err) => {
                    if attempts >= max_attempts {
                        return Retried {
                            outcome: RetryOutcome::FetchFailed { last_error: err },
                            attempts,
                        };
                    }
                    (self.sleeper)(self.config.delay);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
