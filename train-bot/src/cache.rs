//! Caching layer for RTT API responses.
//!
//! The poll loop searches every watched route on every pass, but the set of
//! services running on a route changes rarely within a day. Search results
//! are cached with a TTL; service fetches always go upstream because
//! freshness there is handled by payload fingerprints.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache as MokaCache;

use crate::domain::ServiceUid;
use crate::rtt::{RawService, RttError, TimetableSource};

/// Cache key for searches: (station, filter station, date).
type SearchKey = (String, Option<String>, NaiveDate);

/// Cached search entry.
type SearchEntry = Arc<Vec<ServiceUid>>;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_capacity: 1000,
        }
    }
}

/// Timetable source with cached searches.
///
/// Wraps any `TimetableSource`. Failed searches are not cached, so the
/// next pass retries them.
pub struct CachedTimetable<S> {
    source: S,
    searches: MokaCache<SearchKey, SearchEntry>,
}

impl<S: TimetableSource> CachedTimetable<S> {
    /// Create a new cached source.
    pub fn new(source: S, config: &CacheConfig) -> Self {
        let searches = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { source, searches }
    }
}

impl<S: TimetableSource> TimetableSource for CachedTimetable<S> {
    async fn search_trains(
        &self,
        station: &str,
        date: NaiveDate,
        to: Option<&str>,
    ) -> Result<Vec<ServiceUid>, RttError> {
        let key = (station.to_string(), to.map(str::to_string), date);

        // Try cache first
        if let Some(cached) = self.searches.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        let uids = self.source.search_trains(station, date, to).await?;
        self.searches.insert(key, Arc::new(uids.clone())).await;

        Ok(uids)
    }

    async fn fetch_service(&self, uid: &ServiceUid, date: NaiveDate) -> Result<RawService, RttError> {
        self.source.fetch_service(uid, date).await
    }
}
