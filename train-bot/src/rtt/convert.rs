//! Conversion from RTT DTOs to domain types.
//!
//! This module handles the transformation of raw RTT service payloads into
//! validated `Location`s, including alignment of realtime values that sit
//! on the other side of midnight from their booked time.

use chrono::{Duration, NaiveDate};

use crate::domain::{Crs, Location, RailTime};

use super::types::{LocationDetail, ServiceDetail};

/// A realtime value more than this far from its booked value is assumed
/// to be on the neighbouring day.
const ROLLOVER_THRESHOLD_HOURS: i64 = 12;

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Failed to parse a CRS code
    #[error("invalid CRS code: {0}")]
    InvalidCrs(String),

    /// Failed to parse a time string
    #[error("invalid time {value:?} at {location}")]
    InvalidTime { location: String, value: String },

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Convert every location of a service, in travel order.
///
/// Booked times come from the working timetable, falling back to the
/// public timetable. All clock values are placed on `service_date`; the
/// caller corrects services that cross midnight.
pub fn build_locations(
    detail: &ServiceDetail,
    service_date: NaiveDate,
) -> Result<Vec<Location>, ConversionError> {
    let locations = detail
        .locations
        .as_deref()
        .ok_or(ConversionError::MissingField("locations"))?;

    locations
        .iter()
        .map(|loc| convert_location(loc, service_date))
        .collect()
}

/// Convert one location row.
fn convert_location(
    detail: &LocationDetail,
    service_date: NaiveDate,
) -> Result<Location, ConversionError> {
    let code = match detail.crs.as_deref() {
        Some(crs) if !crs.trim().is_empty() => Some(
            Crs::parse_normalized(crs).map_err(|_| ConversionError::InvalidCrs(crs.to_string()))?,
        ),
        _ => None,
    };

    let parse = |value: Option<&str>| -> Result<Option<RailTime>, ConversionError> {
        match value {
            Some(s) if !s.trim().is_empty() => RailTime::parse(s, service_date)
                .map(Some)
                .map_err(|_| ConversionError::InvalidTime {
                    location: detail.description.clone(),
                    value: s.to_string(),
                }),
            _ => Ok(None),
        }
    };

    let location =
        Location::new(detail.description.clone(), code).with_tiploc(detail.tiploc.clone());

    if is_pass(detail) {
        let scheduled = parse(detail.wtt_booked_pass.as_deref())?;
        let actual = parse(detail.realtime_pass.as_deref())?;
        return Ok(location.passing(scheduled, align_realtime(actual, scheduled)));
    }

    let scheduled_arrival = parse(
        detail
            .wtt_booked_arrival
            .as_deref()
            .or(detail.gbtt_booked_arrival.as_deref()),
    )?;
    let scheduled_departure = parse(
        detail
            .wtt_booked_departure
            .as_deref()
            .or(detail.gbtt_booked_departure.as_deref()),
    )?;
    let actual_arrival = parse(detail.realtime_arrival.as_deref())?;
    let actual_departure = parse(detail.realtime_departure.as_deref())?;

    let delay = detail
        .realtime_gbtt_arrival_lateness
        .or(detail.realtime_gbtt_departure_lateness);

    Ok(location
        .with_scheduled(scheduled_arrival, scheduled_departure)
        .with_actual(
            align_realtime(actual_arrival, scheduled_arrival),
            align_realtime(actual_departure, scheduled_departure),
        )
        .with_delay(delay))
}

/// A location the train runs through without stopping.
fn is_pass(detail: &LocationDetail) -> bool {
    if detail.display_as.as_deref() == Some("PASS") {
        return true;
    }
    detail.wtt_booked_pass.is_some()
        && detail.wtt_booked_arrival.is_none()
        && detail.wtt_booked_departure.is_none()
}

/// Move a realtime value onto the day that keeps it nearest its booked
/// value: a train booked at 23:58 and running at 00:03 is five minutes
/// late, not 23 hours early.
fn align_realtime(actual: Option<RailTime>, scheduled: Option<RailTime>) -> Option<RailTime> {
    let (actual, scheduled) = match (actual, scheduled) {
        (Some(a), Some(s)) => (a, s),
        (actual, _) => return actual,
    };

    let diff = actual.signed_duration_since(scheduled);
    let threshold = Duration::hours(ROLLOVER_THRESHOLD_HOURS);

    let shifted = if diff < -threshold {
        actual.shift_days(1)
    } else if diff > threshold {
        actual.shift_days(-1)
    } else {
        None
    };
    Some(shifted.unwrap_or(actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 23).unwrap()
    }

    fn time(s: &str) -> RailTime {
        RailTime::parse(s, date()).unwrap()
    }

    fn row(name: &str, crs: Option<&str>) -> LocationDetail {
        LocationDetail {
            description: name.to_string(),
            crs: crs.map(str::to_string),
            display_as: Some("CALL".to_string()),
            ..Default::default()
        }
    }

    fn detail(locations: Vec<LocationDetail>) -> ServiceDetail {
        ServiceDetail {
            locations: Some(locations),
            ..Default::default()
        }
    }

    #[test]
    fn converts_calling_point() {
        let mut ulv = row("Ulverston", Some("ULV"));
        ulv.wtt_booked_arrival = Some("094030".into());
        ulv.wtt_booked_departure = Some("0941".into());
        ulv.realtime_arrival = Some("0943".into());
        ulv.realtime_gbtt_arrival_lateness = Some(3);

        let locations = build_locations(&detail(vec![ulv]), date()).unwrap();
        let loc = &locations[0];

        assert_eq!(loc.code(), Some(Crs::parse("ULV").unwrap()));
        assert_eq!(loc.scheduled_arrival().unwrap().time(), time("094030").time());
        assert_eq!(loc.effective_arrival(), Some(time("0943")));
        assert_eq!(loc.effective_departure(), Some(time("0941")));
        assert_eq!(loc.delay(), Some(3));
        assert!(!loc.is_pass());
    }

    #[test]
    fn falls_back_to_public_times() {
        let mut lan = row("Lancaster", Some("LAN"));
        lan.gbtt_booked_departure = Some("0900".into());

        let locations = build_locations(&detail(vec![lan]), date()).unwrap();
        assert_eq!(locations[0].scheduled_departure(), Some(time("0900")));
    }

    #[test]
    fn converts_pass_point() {
        let mut cark = row("Cark", Some("CAK"));
        cark.display_as = Some("PASS".into());
        cark.wtt_booked_pass = Some("0920H".into());
        cark.realtime_pass = Some("0922".into());

        let locations = build_locations(&detail(vec![cark]), date()).unwrap();
        let loc = &locations[0];

        assert!(loc.is_pass());
        assert_eq!(loc.effective_arrival(), None);
        assert_eq!(loc.effective_departure(), Some(time("0922")));
        assert_eq!(loc.scheduled_departure(), Some(time("0920H")));
    }

    #[test]
    fn pass_time_without_display_flag() {
        let mut jn = row("Carnforth North Jn", None);
        jn.display_as = None;
        jn.wtt_booked_pass = Some("0912".into());

        let locations = build_locations(&detail(vec![jn]), date()).unwrap();
        assert!(locations[0].is_pass());
        assert_eq!(locations[0].key(), "Carnforth North Jn");
    }

    #[test]
    fn codeless_location_keyed_by_tiploc() {
        let mut yard = row("Crewe Coal Sidings", None);
        yard.tiploc = Some("CREWSYC".into());
        yard.wtt_booked_departure = Some("0300".into());

        let locations = build_locations(&detail(vec![yard]), date()).unwrap();
        assert_eq!(locations[0].code(), None);
        assert_eq!(locations[0].tiploc(), Some("CREWSYC"));
        assert_eq!(locations[0].key(), "CREWSYC");
    }

    #[test]
    fn lowercase_crs_is_normalised() {
        let locations = build_locations(&detail(vec![row("Cark", Some("cak"))]), date()).unwrap();
        assert_eq!(locations[0].key(), "CAK");
    }

    #[test]
    fn empty_crs_is_absent() {
        let locations = build_locations(&detail(vec![row("Somewhere", Some(""))]), date()).unwrap();
        assert_eq!(locations[0].code(), None);
    }

    #[test]
    fn bad_crs_is_an_error() {
        let result = build_locations(&detail(vec![row("Somewhere", Some("TOOLONG"))]), date());
        assert_eq!(result, Err(ConversionError::InvalidCrs("TOOLONG".into())));
    }

    #[test]
    fn bad_time_is_an_error() {
        let mut lan = row("Lancaster", Some("LAN"));
        lan.wtt_booked_departure = Some("9am".into());

        let result = build_locations(&detail(vec![lan]), date());
        assert!(matches!(result, Err(ConversionError::InvalidTime { .. })));
    }

    #[test]
    fn missing_locations() {
        let result = build_locations(&ServiceDetail::default(), date());
        assert_eq!(result, Err(ConversionError::MissingField("locations")));
    }

    #[test]
    fn late_running_across_midnight() {
        let mut loc = row("Preston", Some("PRE"));
        loc.wtt_booked_departure = Some("2358".into());
        loc.realtime_departure = Some("0003".into());

        let locations = build_locations(&detail(vec![loc]), date()).unwrap();
        let actual = locations[0].actual_departure().unwrap();

        assert_eq!(actual.date(), NaiveDate::from_ymd_opt(2016, 4, 24).unwrap());
        assert_eq!(
            actual.signed_duration_since(locations[0].scheduled_departure().unwrap()),
            Duration::minutes(5)
        );
    }

    #[test]
    fn early_running_across_midnight() {
        let mut loc = row("Preston", Some("PRE"));
        loc.wtt_booked_departure = Some("0002".into());
        loc.realtime_departure = Some("2359".into());

        let locations = build_locations(&detail(vec![loc]), date()).unwrap();
        let actual = locations[0].actual_departure().unwrap();

        assert_eq!(actual.date(), NaiveDate::from_ymd_opt(2016, 4, 22).unwrap());
    }

    #[test]
    fn preserves_order() {
        let locations = build_locations(
            &detail(vec![
                row("Lancaster", Some("LAN")),
                row("Carnforth", Some("CNF")),
                row("Barrow-in-Furness", Some("BIF")),
            ]),
            date(),
        )
        .unwrap();

        let keys: Vec<_> = locations.iter().map(|l| l.key()).collect();
        assert_eq!(keys, vec!["LAN", "CNF", "BIF"]);
    }
}
