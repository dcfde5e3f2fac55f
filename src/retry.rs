use serde::Deserialize;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

use crate::config::deserialize_duration;

/// Bounded retry with a linearly growing back-off: the wait after failed
/// attempt `n` is `backoff * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub backoff: Duration,
}

#[derive(Debug, Error)]
#[error("{what} failed after {attempts} attempts: {last}")]
pub struct RetryExhausted<E> {
    pub what: String,
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    /// Runs `op` until it succeeds or the attempts are used up. The closure
    /// receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    log::error!("{what}: attempt {attempt}/{attempts} failed: {e}");
                    return Err(RetryExhausted {
                        what: what.to_string(),
                        attempts,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    log::warn!(
                        "{what}: attempt {attempt}/{attempts} failed: {e}; retrying in {}",
                        humantime::format_duration(delay)
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
