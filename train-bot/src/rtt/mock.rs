//! In-memory timetable for testing without API access.
//!
//! Serves search results and service bodies seeded by the test, as if
//! they were live API responses.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::ServiceUid;

use super::TimetableSource;
use super::error::RttError;
use super::raw::RawService;

/// Search key: (station, filter station, date).
type SearchKey = (String, Option<String>, NaiveDate);

const NO_SCHEDULE_BODY: &str = r#"{"error": "No schedule found"}"#;

#[derive(Default)]
struct MockData {
    searches: HashMap<SearchKey, Vec<ServiceUid>>,
    services: HashMap<(ServiceUid, NaiveDate), String>,
    failing: HashSet<String>,
}

/// Mock timetable that serves seeded data.
///
/// Unknown searches return no services and unknown services return RTT's
/// no-schedule answer, as the live API does.
#[derive(Clone, Default)]
pub struct MockTimetable {
    data: Arc<RwLock<MockData>>,
    search_calls: Arc<AtomicUsize>,
    service_calls: Arc<AtomicUsize>,
}

impl MockTimetable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the result of a search.
    pub async fn set_search(
        &self,
        station: &str,
        to: Option<&str>,
        date: NaiveDate,
        uids: Vec<ServiceUid>,
    ) {
        let mut data = self.data.write().await;
        data.searches
            .insert((station.to_string(), to.map(str::to_string), date), uids);
    }

    /// Seed (or replace) the body returned for a service.
    pub async fn set_service(&self, uid: &ServiceUid, date: NaiveDate, body: impl Into<String>) {
        let mut data = self.data.write().await;
        data.services.insert((uid.clone(), date), body.into());
    }

    /// Make every search from `station` fail with a server error.
    pub async fn fail_station(&self, station: &str) {
        let mut data = self.data.write().await;
        data.failing.insert(station.to_string());
    }

    /// Number of searches served so far.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of service fetches served so far.
    pub fn service_calls(&self) -> usize {
        self.service_calls.load(Ordering::SeqCst)
    }
}

impl TimetableSource for MockTimetable {
    async fn search_trains(
        &self,
        station: &str,
        date: NaiveDate,
        to: Option<&str>,
    ) -> Result<Vec<ServiceUid>, RttError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let data = self.data.read().await;

        if data.failing.contains(station) {
            return Err(RttError::Api {
                status: 503,
                message: format!("mock failure for {station}"),
            });
        }

        let key = (station.to_string(), to.map(str::to_string), date);
        Ok(data.searches.get(&key).cloned().unwrap_or_default())
    }

    async fn fetch_service(&self, uid: &ServiceUid, date: NaiveDate) -> Result<RawService, RttError> {
        self.service_calls.fetch_add(1, Ordering::SeqCst);
        let data = self.data.read().await;

        let body = data
            .services
            .get(&(uid.clone(), date))
            .map(String::as_str)
            .unwrap_or(NO_SCHEDULE_BODY);
        RawService::from_body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 23).unwrap()
    }

    fn uid(s: &str) -> ServiceUid {
        ServiceUid::new(s).unwrap()
    }

    #[tokio::test]
    async fn serves_seeded_search() {
        let mock = MockTimetable::new();
        mock.set_search("LAN", Some("BIF"), date(), vec![uid("H61429")]).await;

        let uids = mock.search_trains("LAN", date(), Some("BIF")).await.unwrap();
        assert_eq!(uids, vec![uid("H61429")]);

        let unfiltered = mock.search_trains("LAN", date(), None).await.unwrap();
        assert!(unfiltered.is_empty());
        assert_eq!(mock.search_calls(), 2);
    }

    #[tokio::test]
    async fn unknown_service_has_no_schedule() {
        let mock = MockTimetable::new();
        let raw = mock.fetch_service(&uid("H61429"), date()).await.unwrap();
        assert!(raw.is_no_schedule());
    }

    #[tokio::test]
    async fn failing_station_errors() {
        let mock = MockTimetable::new();
        mock.fail_station("LAN").await;

        let result = mock.search_trains("LAN", date(), Some("BIF")).await;
        assert!(matches!(result, Err(RttError::Api { status: 503, .. })));
    }
}
