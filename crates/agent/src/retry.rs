//! Retry circuit breaker shared by every caller of the continuation engine.
//!
//! A failed request waits a fixed backoff and counts against the breaker.
//! Any success resets the count. Once the count reaches the ceiling every
//! caller sharing the breaker gives up at once, including callers that are
//! just starting: the process-wide breaker stays open until a request on
//! some other path succeeds.

use missionclaw_config::{RetryConfig, RetryScope};
use missionclaw_core::error::{CompletionError, RetryExhausted};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::warn;

static PROCESS_BREAKER: OnceLock<Arc<CircuitBreaker>> = OnceLock::new();

#[derive(Debug)]
pub struct CircuitBreaker {
    failures: AtomicU32,
    max_retries: u32,
    backoff: Duration,
}

impl CircuitBreaker {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            failures: AtomicU32::new(0),
            max_retries,
            backoff,
        }
    }

    /// The breaker shared by the whole process. The first caller's settings win.
    pub fn process_wide(max_retries: u32, backoff: Duration) -> Arc<Self> {
        Arc::clone(PROCESS_BREAKER.get_or_init(|| Arc::new(Self::new(max_retries, backoff))))
    }

    /// A breaker for the configured scope.
    pub fn from_config(config: &RetryConfig) -> Arc<Self> {
        let backoff = Duration::from_secs(config.backoff_secs);
        match config.scope {
            RetryScope::Process => Self::process_wide(config.max_retries, backoff),
            RetryScope::Mission => Arc::new(Self::new(config.max_retries, backoff)),
        }
    }

    /// Failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.failures() >= self.max_retries
    }

    /// Run `op` until it succeeds or the breaker opens.
    pub async fn attempt<T, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let mut attempts = 0u32;
        let mut last_error = String::from("retry budget already exhausted");

        while !self.is_open() {
            match op().await {
                Ok(value) => {
                    self.failures.store(0, Ordering::SeqCst);
                    return Ok(value);
                }
                Err(e) => {
                    attempts += 1;
                    let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                    warn!(error = %e, failures, max = self.max_retries, "Request failed");
                    last_error = e.to_string();
                    if failures >= self.max_retries {
                        break;
                    }
                    warn!("wait for retry... ({failures})");
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }

        Err(RetryExhausted { attempts, last_error })
    }
}
