//! Train service snapshots.
//!
//! A `Train` starts out as just a uid and a service date. `populate` fills
//! it from an RTT service payload; it can be called on every poll and
//! cheaply reports when nothing changed.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;

use crate::rtt::{RawService, build_locations, service_url};

use super::{Headcode, Location, ScheduleError, ServiceUid};

/// Content hash of a raw upstream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint a payload body.
    pub fn of(body: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

/// Identity of one run of a service: uids repeat across dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainKey {
    pub uid: ServiceUid,
    pub service_date: NaiveDate,
}

impl fmt::Display for TrainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.uid, self.service_date)
    }
}

/// Result of a successful `populate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateOutcome {
    /// New data was applied
    Updated,
    /// Payload identical to the previous fetch; nothing touched
    Unchanged,
}

/// One train service on one date.
///
/// Equality and hashing consider only `uid` and `service_date`, so the
/// same service returned by two route searches compares equal.
#[derive(Debug, Clone)]
pub struct Train {
    uid: ServiceUid,
    service_date: NaiveDate,
    origin: Option<Location>,
    destination: Option<Location>,
    calling_points: Vec<Location>,
    is_running: bool,
    headcode: Option<Headcode>,
    operator: Option<String>,
    fingerprint: Option<Fingerprint>,
}

impl Train {
    /// Create an unpopulated train.
    pub fn new(uid: ServiceUid, service_date: NaiveDate) -> Self {
        Self {
            uid,
            service_date,
            origin: None,
            destination: None,
            calling_points: Vec::new(),
            is_running: false,
            headcode: None,
            operator: None,
            fingerprint: None,
        }
    }

    pub fn uid(&self) -> &ServiceUid {
        &self.uid
    }

    pub fn service_date(&self) -> NaiveDate {
        self.service_date
    }

    pub fn key(&self) -> TrainKey {
        TrainKey {
            uid: self.uid.clone(),
            service_date: self.service_date,
        }
    }

    pub fn origin(&self) -> Option<&Location> {
        self.origin.as_ref()
    }

    pub fn destination(&self) -> Option<&Location> {
        self.destination.as_ref()
    }

    /// Locations strictly between origin and destination, in travel order.
    pub fn calling_points(&self) -> &[Location] {
        &self.calling_points
    }

    /// True once RTT reports the service as realtime-activated.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn headcode(&self) -> Option<Headcode> {
        self.headcode
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    /// Public RTT page for this service.
    pub fn reference_url(&self) -> String {
        service_url(&self.uid, self.service_date)
    }

    /// Compare a payload fingerprint with the stored one, storing it if
    /// it differs. Returns true when the payload is new.
    pub fn has_changed_since(&mut self, fingerprint: Fingerprint) -> bool {
        if self.fingerprint == Some(fingerprint) {
            return false;
        }
        self.fingerprint = Some(fingerprint);
        true
    }

    /// Make the next payload count as new, even if it is identical.
    pub(crate) fn forget_fingerprint(&mut self) {
        self.fingerprint = None;
    }

    /// Fill this train from an RTT service payload.
    ///
    /// Fails with `NoSchedule` when RTT has no timetable for the uid and
    /// date (the train is then marked not running), and with `Malformed`
    /// when the payload cannot be turned into an origin and destination.
    pub fn populate(&mut self, raw: &RawService) -> Result<PopulateOutcome, ScheduleError> {
        if !self.has_changed_since(raw.fingerprint()) {
            return Ok(PopulateOutcome::Unchanged);
        }

        if raw.is_no_schedule() {
            self.is_running = false;
            return Err(ScheduleError::NoSchedule {
                uid: self.uid.clone(),
                date: self.service_date,
            });
        }

        let detail = raw.detail();
        let mut locations = build_locations(detail, self.service_date)
            .map_err(|e| self.malformed(e.to_string()))?;

        if locations.len() < 2 {
            return Err(self.malformed(format!(
                "expected at least 2 locations, got {}",
                locations.len()
            )));
        }

        let mut destination = locations.pop().ok_or_else(|| self.malformed("no destination"))?;
        let origin = locations.remove(0);
        let mut calling_points = locations;

        if let Some(origin_departure) = origin.scheduled_departure() {
            for location in calling_points.iter_mut().chain(std::iter::once(&mut destination)) {
                if !location.roll_forward_before(origin_departure) {
                    return Err(self.malformed(format!("date overflow at {}", location.name())));
                }
            }
        }

        self.is_running = detail.realtime_activated.unwrap_or(false);
        self.headcode = detail.train_identity.as_deref().and_then(Headcode::parse);
        self.operator = detail.atoc_name.clone();
        self.origin = Some(origin);
        self.destination = Some(destination);
        self.calling_points = calling_points;

        Ok(PopulateOutcome::Updated)
    }

    fn malformed(&self, reason: impl Into<String>) -> ScheduleError {
        ScheduleError::Malformed {
            uid: self.uid.clone(),
            reason: reason.into(),
        }
    }
}

impl PartialEq for Train {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid && self.service_date == other.service_date
    }
}

impl Eq for Train {}

impl Hash for Train {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uid.hash(state);
        self.service_date.hash(state);
    }
}
