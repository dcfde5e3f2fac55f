use chrono::{DateTime, Duration, Utc};

use super::error::ElementError;
use super::fetcher::ElementFetcher;
use super::tle::parse_fields;
use super::types::{FetchedElements, OrbitalElementSet};
use crate::retry::RetryPolicy;
use crate::storage::PersistentStore;

pub const STORE_KEY: &str = "elements";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshReason {
    Empty,
    CatalogChanged { cached: u32 },
    Stale { age: Duration },
}

impl std::fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshReason::Empty => write!(f, "no cached set"),
            RefreshReason::CatalogChanged { cached } => write!(f, "cached set is for catalog {cached}"),
            RefreshReason::Stale { age } => write!(f, "cached set is {} min old", age.num_minutes()),
        }
    }
}

/// Holds the element set for the tracked object and decides when it has to
/// be fetched again.
pub struct ElementSetCache {
    fetcher: Box<dyn ElementFetcher>,
    store: Box<dyn PersistentStore>,
    current: Option<OrbitalElementSet>,
    stale_after: Duration,
    retry: RetryPolicy,
}

impl ElementSetCache {
    pub fn new(
        fetcher: Box<dyn ElementFetcher>,
        store: Box<dyn PersistentStore>,
        stale_after: std::time::Duration,
        retry: RetryPolicy,
    ) -> Self {
        let current = match store.get(STORE_KEY) {
            Ok(Some(text)) => match serde_yaml::from_str::<OrbitalElementSet>(&text) {
                Ok(set) => {
                    log::info!(
                        "Loaded stored elements for {} ({}), retrieved {}",
                        set.name,
                        set.catalog_id,
                        set.retrieved_at
                    );
                    Some(set)
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable stored elements: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read stored elements: {}", e);
                None
            }
        };

        Self {
            fetcher,
            store,
            current,
            stale_after: Duration::from_std(stale_after).unwrap_or(Duration::MAX),
            retry,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&OrbitalElementSet> {
        self.current.as_ref()
    }

    /// The cached set if it belongs to `catalog_id`, whatever its age.
    pub fn stale_fallback(&self, catalog_id: u32) -> Option<&OrbitalElementSet> {
        self.current.as_ref().filter(|s| s.catalog_id == catalog_id)
    }

    fn refresh_reason(&self, catalog_id: u32, now: DateTime<Utc>) -> Option<RefreshReason> {
        let Some(set) = &self.current else {
            return Some(RefreshReason::Empty);
        };
        if set.catalog_id != catalog_id {
            return Some(RefreshReason::CatalogChanged {
                cached: set.catalog_id,
            });
        }
        let age = now - set.retrieved_at;
        if age >= self.stale_after {
            return Some(RefreshReason::Stale { age });
        }
        None
    }

    /// Returns a set for `catalog_id` that is younger than the stale
    /// threshold, fetching a new one when needed.
    pub fn get(
        &mut self,
        catalog_id: u32,
        now: DateTime<Utc>,
    ) -> Result<&OrbitalElementSet, ElementError> {
        if let Some(reason) = self.refresh_reason(catalog_id, now) {
            log::info!("Refreshing elements for catalog {}: {}", catalog_id, reason);
            self.refresh(catalog_id, now)?;
        } else {
            log::trace!("Element cache hit for catalog {}", catalog_id);
        }
        self.current
            .as_ref()
            .ok_or_else(|| ElementError::InvalidTle("cache is empty after refresh".into()))
    }

    /// Fetches unconditionally and replaces the cached set on success.
    pub fn refresh(&mut self, catalog_id: u32, now: DateTime<Utc>) -> Result<&OrbitalElementSet, ElementError> {
        let fetcher = &mut self.fetcher;
        let fetched: FetchedElements = self
            .retry
            .run(&format!("element fetch for catalog {catalog_id}"), |_| {
                fetcher.fetch_element_set(catalog_id)
            })
            .map_err(|exhausted| ElementError::FetchExhausted {
                catalog_id,
                attempts: exhausted.attempts,
                last: exhausted.last,
            })?;

        let fields = parse_fields(&fetched.line1, &fetched.line2)?;
        if fields.catalog_id != catalog_id {
            return Err(ElementError::InvalidTle(format!(
                "fetched set is for catalog {}, expected {}",
                fields.catalog_id, catalog_id
            )));
        }

        let retrieved_at = match &self.current {
            Some(previous) if previous.retrieved_at > now => previous.retrieved_at,
            _ => now,
        };
        let set = OrbitalElementSet {
            catalog_id,
            name: fetched.name,
            line1: fetched.line1,
            line2: fetched.line2,
            retrieved_at,
        };
        log::info!(
            "Elements for {} ({}) updated, epoch {}",
            set.name,
            catalog_id,
            fields.epoch
        );
        self.persist(&set);
        Ok(self.current.insert(set))
    }

    fn persist(&mut self, set: &OrbitalElementSet) {
        let result = serde_yaml::to_string(set)
            .map_err(crate::storage::StoreError::from)
            .and_then(|text| self.store.set(STORE_KEY, &text));
        if let Err(e) = result {
            log::warn!("Failed to persist elements for {}: {}", set.catalog_id, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::{Arc, Mutex};

    use crate::elements::error::FetchError;
    use crate::elements::fetcher::ElementFetcher;
    use crate::elements::tle::fixtures::*;
    use crate::elements::types::FetchedElements;

    /// Serves the ISS fixture for 25544, fails for everything else.
    #[derive(Clone, Default)]
    pub struct ScriptedFetcher {
        pub calls: Arc<Mutex<Vec<u32>>>,
        pub failures_left: Arc<Mutex<u32>>,
    }

    impl ScriptedFetcher {
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn fail_next(&self, n: u32) {
            *self.failures_left.lock().unwrap() = n;
        }
    }

    impl ElementFetcher for ScriptedFetcher {
        fn fetch_element_set(&mut self, catalog_id: u32) -> Result<FetchedElements, FetchError> {
            self.calls.lock().unwrap().push(catalog_id);
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(FetchError::Transport("connection refused".into()));
            }
            if catalog_id != 25544 {
                return Err(FetchError::Status(404));
            }
            Ok(FetchedElements {
                name: ISS_NAME.into(),
                line1: ISS_LINE1.into(),
                line2: ISS_LINE2.into(),
            })
        }
    }
}
