//! Realtime Trains (RTT) API client.
//!
//! This module provides an HTTP client for the RTT JSON API, which serves
//! both schedule and realtime running information.
//!
//! Key characteristics of RTT:
//! - Services are identified by a schedule **UID** plus a run date; the
//!   same UID runs on many days
//! - Times are "HHMM" (public) or "HHMMSS" / "HHMMH" (working timetable),
//!   always on the service date even after midnight
//! - An unknown UID/date answers 200 with an `error` field

mod client;
mod convert;
mod error;
mod links;
mod mock;
mod raw;
mod types;

use std::future::Future;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::ServiceUid;

pub use client::{DEFAULT_BASE_URL, RttClient, RttConfig};
pub use convert::{ConversionError, build_locations};
pub use error::RttError;
pub use links::service_url;
pub use mock::MockTimetable;
pub use raw::RawService;
pub use types::{LocationDetail, SearchResponse, SearchService, ServiceDetail};

/// A source of timetable data.
///
/// Implemented by the live client, the caching wrapper and the in-memory
/// mock, so the poll loop can run against any of them.
pub trait TimetableSource: Send + Sync {
    /// UIDs of services from `station` on `date`, optionally only those
    /// calling at `to`.
    fn search_trains(
        &self,
        station: &str,
        date: NaiveDate,
        to: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ServiceUid>, RttError>> + Send;

    /// The full schedule of one service.
    fn fetch_service(
        &self,
        uid: &ServiceUid,
        date: NaiveDate,
    ) -> impl Future<Output = Result<RawService, RttError>> + Send;
}

/// Extract the distinct, valid UIDs from a search response, in order.
pub(crate) fn service_uids(response: &SearchResponse) -> Vec<ServiceUid> {
    let mut uids: Vec<ServiceUid> = Vec::new();
    for service in response.services.as_deref().unwrap_or(&[]) {
        match ServiceUid::new(service.service_uid.as_str()) {
            Ok(uid) if !uids.contains(&uid) => uids.push(uid),
            Ok(_) => {}
            Err(e) => warn!(uid = %service.service_uid, error = %e, "skipping service with bad uid"),
        }
    }
    uids
}
