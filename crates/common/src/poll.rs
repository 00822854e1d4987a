//! Bounded polling for effects the backend applies asynchronously

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{Error, Result};

/// Limits for a polling loop
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Give up after this long
    pub timeout: Duration,

    /// Delay before the second attempt
    pub interval: Duration,

    /// Multiplier applied to the delay after each miss (1.0 = fixed)
    pub backoff: f64,

    /// Upper bound for the delay
    pub max_interval: Duration,
}

impl PollConfig {
    /// Check at a fixed interval
    pub fn fixed(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            backoff: 1.0,
            max_interval: interval,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(250),
            backoff: 2.0,
            max_interval: Duration::from_secs(5),
        }
    }
}

/// Run `check` until it yields a value or the timeout passes.
///
/// Exceeding the bound is a hard [`Error::Timeout`].
pub async fn poll_until<T, F, Fut>(what: &str, config: &PollConfig, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut delay = config.interval;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = check().await {
            debug!("{} ready after {} attempt(s)", what, attempts);
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout {
                seconds: config.timeout.as_secs(),
                what: format!("{} ({} attempts)", what, attempts),
            });
        }

        sleep(delay.min(deadline - now)).await;
        delay = delay.mul_f64(config.backoff.max(1.0)).min(config.max_interval);
    }
}
