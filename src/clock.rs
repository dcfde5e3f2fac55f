use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use thiserror::Error;

use crate::config::TimeSourceConfig;
use crate::retry::RetryPolicy;

/// Anything earlier than this is treated as an unset RTC rather than a real time.
const MIN_PLAUSIBLE_EPOCH_S: i64 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("clock is not synchronized")]
    Unsynchronized,
}

#[derive(Debug, Error)]
pub enum TimeSourceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response carried no Date header")]
    MissingDate,
    #[error("unparseable date '{0}'")]
    InvalidDate(String),
    #[error("implausible time {0}")]
    Implausible(DateTime<Utc>),
}

#[derive(Debug, Error)]
pub enum TimeSyncError {
    #[error("no time source produced a plausible time (last error from {source_name}: {last})")]
    Exhausted {
        source_name: String,
        last: TimeSourceError,
    },
    #[error("no time sources configured")]
    NoSources,
}

pub trait Clock: Send {
    fn now(&self) -> Result<DateTime<Utc>, ClockError>;
}

pub trait TimeSource: Send {
    fn name(&self) -> String;
    fn sample(&mut self) -> Result<DateTime<Utc>, TimeSourceError>;
}

pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn name(&self) -> String {
        "system".to_string()
    }

    fn sample(&mut self) -> Result<DateTime<Utc>, TimeSourceError> {
        Ok(Utc::now())
    }
}

/// Reads the `Date` header of an HTTP HEAD response.
pub struct HttpDateSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpDateSource {
    pub fn new(url: impl Into<String>, timeout: StdDuration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl TimeSource for HttpDateSource {
    fn name(&self) -> String {
        format!("http-date {}", self.url)
    }

    fn sample(&mut self) -> Result<DateTime<Utc>, TimeSourceError> {
        let response = self
            .agent
            .head(&self.url)
            .call()
            .map_err(|e| TimeSourceError::Transport(e.to_string()))?;
        let header = response.header("Date").ok_or(TimeSourceError::MissingDate)?;
        parse_http_date(header)
    }
}

pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>, TimeSourceError> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeSourceError::InvalidDate(value.to_string()))
}

pub fn build_time_sources(
    configs: &[TimeSourceConfig],
    timeout: StdDuration,
) -> Vec<Box<dyn TimeSource>> {
    configs
        .iter()
        .map(|c| -> Box<dyn TimeSource> {
            match c {
                TimeSourceConfig::HttpDate { url } => Box::new(HttpDateSource::new(url, timeout)),
                TimeSourceConfig::System => Box::new(SystemTimeSource),
            }
        })
        .collect()
}

/// Wall clock expressed as the system clock plus an offset measured against
/// the first time source that answers plausibly.
#[derive(Debug, Default)]
pub struct SyncedClock {
    offset: Option<Duration>,
}

impl SyncedClock {
    pub fn unsynchronized() -> Self {
        Self { offset: None }
    }

    #[cfg(test)]
    pub fn is_synchronized(&self) -> bool {
        self.offset.is_some()
    }

    /// Tries each source in order under `policy`. Returns the name of the
    /// source that was accepted.
    pub fn synchronize(
        &mut self,
        sources: &mut [Box<dyn TimeSource>],
        policy: &RetryPolicy,
    ) -> Result<String, TimeSyncError> {
        let mut failure = None;
        for source in sources.iter_mut() {
            let name = source.name();
            let result = policy.run(&format!("time sync via {name}"), |_| {
                let sampled = source.sample()?;
                if sampled.timestamp() <= MIN_PLAUSIBLE_EPOCH_S {
                    return Err(TimeSourceError::Implausible(sampled));
                }
                Ok(sampled)
            });
            match result {
                Ok(sampled) => {
                    let offset = sampled - Utc::now();
                    log::info!(
                        "Clock synchronized via {} (offset {} ms)",
                        name,
                        offset.num_milliseconds()
                    );
                    self.offset = Some(offset);
                    return Ok(name);
                }
                Err(exhausted) => {
                    failure = Some(TimeSyncError::Exhausted {
                        source_name: name,
                        last: exhausted.last,
                    });
                }
            }
        }
        Err(failure.unwrap_or(TimeSyncError::NoSources))
    }
}

impl Clock for SyncedClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        let offset = self.offset.ok_or(ClockError::Unsynchronized)?;
        Ok(Utc::now() + offset)
    }
}

/// Settable clock for driving the control loop in tests.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        Ok(*self.now.lock().unwrap())
    }
}
