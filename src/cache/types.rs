//! Cache entry states and policies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle of one date's cached result.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheState<T> {
    /// No fetch attempted yet (or invalidated)
    NotFetched,
    /// A fetch is in flight
    Fetching,
    /// Fetch succeeded with data
    Ready(T),
    /// Fetch succeeded but the service has no data for the date
    Empty,
    /// Fetch failed
    Failed(String),
}

/// What a view should show for a cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Nothing requested yet
    Idle,
    /// Loading indicator
    Loading,
    /// Data available
    Loaded,
    /// "No data" message
    NoData,
    /// "Could not load" message
    CouldNotLoad,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        CacheState::NotFetched
    }
}

impl<T> CacheState<T> {
    pub fn is_fetching(&self) -> bool {
        matches!(self, CacheState::Fetching)
    }

    /// Whether a fetch cycle has finished (successfully or not).
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            CacheState::Ready(_) | CacheState::Empty | CacheState::Failed(_)
        )
    }

    pub fn display_status(&self) -> DisplayStatus {
        match self {
            CacheState::NotFetched => DisplayStatus::Idle,
            CacheState::Fetching => DisplayStatus::Loading,
            CacheState::Ready(_) => DisplayStatus::Loaded,
            CacheState::Empty => DisplayStatus::NoData,
            CacheState::Failed(_) => DisplayStatus::CouldNotLoad,
        }
    }

    /// Short state name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            CacheState::NotFetched => "not_fetched",
            CacheState::Fetching => "fetching",
            CacheState::Ready(_) => "ready",
            CacheState::Empty => "empty",
            CacheState::Failed(_) => "failed",
        }
    }
}

/// Read-only view of one date's cache slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub date: NaiveDate,
    pub state: CacheState<T>,
}

impl<T> CacheEntry<T> {
    pub fn value(&self) -> Option<&T> {
        match &self.state {
            CacheState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            CacheState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Which completed fetches may install their result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPolicy {
    /// Every completed fetch installs; the last to complete wins
    #[default]
    LastCompletion,
    /// Only a fetch started after the latest invalidation installs
    LatestGeneration,
}
