//! Date-keyed result cache.
//!
//! Memoizes fetched results per calendar date and guarantees at most one
//! in-flight fetch per date at a time. All slot transitions go through a
//! single mutex that is never held across an await.

pub mod date_key;
pub mod types;

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, TimeZone};
use futures::FutureExt;
use tokio::task::JoinHandle;

pub use date_key::{ReferenceZone, DATE_FORMAT, DEFAULT_UTC_OFFSET_MINUTES};
pub use types::{CacheEntry, CacheState, DisplayStatus, InstallPolicy};

/// Reason recorded when a fetch panics.
pub const FETCH_ABORTED: &str = "fetch aborted";

/// Per-date slot.
#[derive(Debug)]
struct Slot<T> {
    state: CacheState<T>,
    /// Bumped on every invalidation
    generation: u64,
    /// Generation of the fetch that currently holds the date, if any.
    /// Cleared by that fetch's completion or by an invalidation.
    live: Option<u64>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: CacheState::default(),
            generation: 0,
            live: None,
        }
    }
}

/// Keyed store of fetched results per calendar date.
///
/// Cloning is cheap and every clone shares the same slots.
pub struct DateKeyedResultCache<T> {
    slots: Arc<Mutex<HashMap<NaiveDate, Slot<T>>>>,
    zone: ReferenceZone,
    policy: InstallPolicy,
}

impl<T> Clone for DateKeyedResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            zone: self.zone,
            policy: self.policy,
        }
    }
}

impl<T: Clone + Send + 'static> Default for DateKeyedResultCache<T> {
    fn default() -> Self {
        Self::new(ReferenceZone::default(), InstallPolicy::default())
    }
}

impl<T: Clone + Send + 'static> DateKeyedResultCache<T> {
    pub fn new(zone: ReferenceZone, policy: InstallPolicy) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            zone,
            policy,
        }
    }

    pub fn zone(&self) -> ReferenceZone {
        self.zone
    }

    pub fn policy(&self) -> InstallPolicy {
        self.policy
    }

    /// Cache key for an instant in any timezone.
    pub fn key_for<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> NaiveDate {
        self.zone.date_of(instant)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NaiveDate, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current entry for a date. Never triggers a fetch.
    pub fn get(&self, date: NaiveDate) -> CacheEntry<T> {
        let slots = self.lock();
        let state = slots
            .get(&date)
            .map(|slot| slot.state.clone())
            .unwrap_or_default();
        CacheEntry { date, state }
    }

    /// Every date the cache has seen, oldest first.
    pub fn entries(&self) -> Vec<CacheEntry<T>> {
        let slots = self.lock();
        let mut entries: Vec<CacheEntry<T>> = slots
            .iter()
            .map(|(date, slot)| CacheEntry {
                date: *date,
                state: slot.state.clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.date);
        entries
    }

    /// Start a fetch for `date` unless one is already in flight.
    ///
    /// `fetch` yields `Ok(Some(value))` for data, `Ok(None)` when the service
    /// has nothing for the date, or an error. The fetch runs on the tokio
    /// runtime; the returned handle may be awaited or dropped, and dropping it
    /// does not cancel the fetch. A fetch that panics settles as `Failed`.
    /// Returns `None` when a fetch for the date is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_fetched<F, Fut, E>(&self, date: NaiveDate, fetch: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let generation = {
            let mut slots = self.lock();
            let slot = slots.entry(date).or_default();
            if slot.live.is_some() {
                tracing::debug!("Fetch for {} already in flight", date);
                return None;
            }
            slot.live = Some(slot.generation);
            slot.state = CacheState::Fetching;
            slot.generation
        };

        tracing::debug!("Fetching {} (generation {})", date, generation);

        let fut = fetch();
        let cache = self.clone();
        Some(tokio::spawn(async move {
            let state = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(Some(value))) => CacheState::Ready(value),
                Ok(Ok(None)) => CacheState::Empty,
                Ok(Err(e)) => CacheState::Failed(e.to_string()),
                Err(_) => CacheState::Failed(FETCH_ABORTED.to_string()),
            };
            cache.install(date, generation, state);
        }))
    }

    /// Force the next [`ensure_fetched`](Self::ensure_fetched) to re-fetch.
    ///
    /// An in-flight fetch is not cancelled but no longer blocks a new one.
    pub fn invalidate(&self, date: NaiveDate) {
        let mut slots = self.lock();
        let slot = slots.entry(date).or_default();
        slot.generation += 1;
        slot.live = None;
        slot.state = CacheState::NotFetched;
        tracing::debug!("Invalidated {} (generation {})", date, slot.generation);
    }

    fn install(&self, date: NaiveDate, generation: u64, state: CacheState<T>) {
        let mut slots = self.lock();
        let slot = slots.entry(date).or_default();

        let is_live = slot.live == Some(generation);
        if is_live {
            slot.live = None;
        }

        if self.policy == InstallPolicy::LatestGeneration && slot.generation != generation {
            tracing::debug!(
                "Discarding {} result for {} from generation {} (current {})",
                state.name(),
                date,
                generation,
                slot.generation
            );
            return;
        }

        match &state {
            CacheState::Failed(reason) => tracing::warn!("Fetch for {} failed: {}", date, reason),
            other => tracing::debug!("Fetch for {} settled as {}", date, other.name()),
        }
        slot.state = state;
    }
}
