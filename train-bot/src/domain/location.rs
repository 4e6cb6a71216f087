//! Timetable locations on a train's journey.
//!
//! A `Location` is one row of an RTT service: a station the train calls
//! at, or a timing point it only passes. It carries booked (working
//! timetable) times and realtime estimates or actuals.

use super::{Crs, RailTime};

/// One location on a train's schedule.
///
/// # Time semantics
///
/// - origin: only departure times are meaningful
/// - destination: only arrival times are meaningful
/// - calling points: both may be present
/// - pass points: the passing time is held as the departure, and there
///   is never an effective arrival
///
/// Realtime values override scheduled values when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    name: String,
    code: Option<Crs>,
    tiploc: Option<String>,
    scheduled_arrival: Option<RailTime>,
    scheduled_departure: Option<RailTime>,
    actual_arrival: Option<RailTime>,
    actual_departure: Option<RailTime>,
    is_pass: bool,
    delay: Option<i32>,
}

impl Location {
    /// Creates a location with no times.
    pub fn new(name: impl Into<String>, code: Option<Crs>) -> Self {
        Self {
            name: name.into(),
            code,
            tiploc: None,
            scheduled_arrival: None,
            scheduled_departure: None,
            actual_arrival: None,
            actual_departure: None,
            is_pass: false,
            delay: None,
        }
    }

    /// Sets the timing point code, e.g. "CREWSYC".
    pub fn with_tiploc(mut self, tiploc: Option<String>) -> Self {
        self.tiploc = tiploc.filter(|t| !t.trim().is_empty());
        self
    }

    /// Sets the booked arrival and departure.
    pub fn with_scheduled(mut self, arrival: Option<RailTime>, departure: Option<RailTime>) -> Self {
        self.scheduled_arrival = arrival;
        self.scheduled_departure = departure;
        self
    }

    /// Sets the realtime arrival and departure.
    pub fn with_actual(mut self, arrival: Option<RailTime>, departure: Option<RailTime>) -> Self {
        self.actual_arrival = arrival;
        self.actual_departure = departure;
        self
    }

    /// Marks this location as a pass-through point with the given booked
    /// and realtime passing times.
    pub fn passing(mut self, scheduled: Option<RailTime>, actual: Option<RailTime>) -> Self {
        self.is_pass = true;
        self.scheduled_arrival = None;
        self.actual_arrival = None;
        self.scheduled_departure = scheduled;
        self.actual_departure = actual;
        self
    }

    /// Sets the reported lateness in minutes (negative when early).
    pub fn with_delay(mut self, delay: Option<i32>) -> Self {
        self.delay = delay;
        self
    }

    /// Display name, e.g. "Cark".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// CRS code, present only for passenger stations.
    pub fn code(&self) -> Option<Crs> {
        self.code
    }

    /// Timing point code. Every RTT location has one, but it is the only
    /// code for freight yards and junctions.
    pub fn tiploc(&self) -> Option<&str> {
        self.tiploc.as_deref()
    }

    /// Canonical identifier used for matching: the CRS code, then the
    /// TIPLOC, then the name.
    ///
    /// ```
    /// use train_bot::domain::{Crs, Location};
    ///
    /// let cark = Location::new("Cark", Some(Crs::parse("CAK").unwrap()))
    ///     .with_tiploc(Some("CARK".into()));
    /// assert_eq!(cark.key(), "CAK");
    ///
    /// let sidings = Location::new("Crewe Coal Sidings", None).with_tiploc(Some("CREWSYC".into()));
    /// assert_eq!(sidings.key(), "CREWSYC");
    ///
    /// let junction = Location::new("Arnside Viaduct", None);
    /// assert_eq!(junction.key(), "Arnside Viaduct");
    /// ```
    pub fn key(&self) -> &str {
        match (&self.code, &self.tiploc) {
            (Some(code), _) => code.as_str(),
            (None, Some(tiploc)) => tiploc,
            (None, None) => &self.name,
        }
    }

    pub fn scheduled_arrival(&self) -> Option<RailTime> {
        self.scheduled_arrival
    }

    pub fn scheduled_departure(&self) -> Option<RailTime> {
        self.scheduled_departure
    }

    pub fn actual_arrival(&self) -> Option<RailTime> {
        self.actual_arrival
    }

    pub fn actual_departure(&self) -> Option<RailTime> {
        self.actual_departure
    }

    /// True for timing points the train runs through without stopping.
    pub fn is_pass(&self) -> bool {
        self.is_pass
    }

    /// Reported lateness in minutes, negative when early.
    pub fn delay(&self) -> Option<i32> {
        self.delay
    }

    /// Best available arrival: realtime if reported, else booked.
    ///
    /// Always `None` for a pass point.
    pub fn effective_arrival(&self) -> Option<RailTime> {
        if self.is_pass {
            return None;
        }
        self.actual_arrival.or(self.scheduled_arrival)
    }

    /// Best available departure (or passing time): realtime if reported,
    /// else booked.
    pub fn effective_departure(&self) -> Option<RailTime> {
        self.actual_departure.or(self.scheduled_departure)
    }

    /// Place times booked before `anchor` on the following day.
    ///
    /// RTT gives every clock value the service date, so on a service that
    /// crosses midnight the later locations appear to run before the train
    /// has started. Arrival and departure are corrected independently,
    /// each realtime value moving with its booked value.
    ///
    /// Returns `false` (leaving the location untouched) on date overflow.
    pub(crate) fn roll_forward_before(&mut self, anchor: RailTime) -> bool {
        let roll = |scheduled: Option<RailTime>, actual: Option<RailTime>| {
            match scheduled {
                Some(s) if s < anchor => {
                    let s = s.shift_days(1)?;
                    let a = match actual {
                        Some(a) => Some(a.shift_days(1)?),
                        None => None,
                    };
                    Some((Some(s), a))
                }
                _ => Some((scheduled, actual)),
            }
        };

        let (Some((sa, aa)), Some((sd, ad))) = (
            roll(self.scheduled_arrival, self.actual_arrival),
            roll(self.scheduled_departure, self.actual_departure),
        ) else {
            return false;
        };

        self.scheduled_arrival = sa;
        self.actual_arrival = aa;
        self.scheduled_departure = sd;
        self.actual_departure = ad;
        true
    }
}
