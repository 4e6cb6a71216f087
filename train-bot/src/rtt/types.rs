//! RTT API response DTOs.
//!
//! These types map directly to the Realtime Trains JSON API responses.
//! They use `Option` liberally because RTT omits fields rather than
//! sending null values in most cases.

use serde::Deserialize;

/// Response from `/json/search/{station}[/to/{to}]/{date}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The station searched from.
    pub location: Option<SearchLocation>,

    /// The filter station, when searching `/to/`.
    pub filter: Option<SearchFilter>,

    /// Matching services. RTT sends `null` when there are none.
    pub services: Option<Vec<SearchService>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLocation {
    pub name: Option<String>,
    pub crs: Option<String>,
    pub tiploc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub destination: Option<SearchLocation>,
}

/// One service in a search result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchService {
    /// Schedule UID, e.g. "H61429".
    pub service_uid: String,

    /// Service date as "YYYY-MM-DD".
    pub run_date: Option<String>,

    /// Headcode.
    pub train_identity: Option<String>,

    pub atoc_name: Option<String>,

    /// Whether this service has activated in the realtime feed.
    pub is_passenger: Option<bool>,

    /// Whether realtime data is available.
    pub realtime_activated: Option<bool>,
}

/// Response from `/json/service/{uid}/{date}`.
///
/// When RTT has no schedule it still answers 200, with an `error` field
/// and no `locations`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    /// Set when the lookup failed, e.g. "No schedule found".
    pub error: Option<String>,

    pub service_uid: Option<String>,

    pub run_date: Option<String>,

    /// Headcode.
    pub train_identity: Option<String>,

    /// Operator name.
    pub atoc_name: Option<String>,

    /// Operator ATOC code.
    pub atoc_code: Option<String>,

    /// True once the train has been activated in the realtime feed.
    pub realtime_activated: Option<bool>,

    pub is_passenger: Option<bool>,

    /// Every location on the schedule, in travel order.
    pub locations: Option<Vec<LocationDetail>>,
}

/// One location on a service.
///
/// Times are "HHMM" for public (GBTT) values and "HHMMSS" or "HHMMH"
/// for working timetable values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetail {
    /// Display name, e.g. "Cark".
    pub description: String,

    /// CRS code, present for passenger stations.
    pub crs: Option<String>,

    pub tiploc: Option<String>,

    /// Working timetable booked arrival.
    pub wtt_booked_arrival: Option<String>,

    /// Working timetable booked departure.
    pub wtt_booked_departure: Option<String>,

    /// Working timetable booked passing time.
    pub wtt_booked_pass: Option<String>,

    /// Public timetable booked arrival.
    pub gbtt_booked_arrival: Option<String>,

    /// Public timetable booked departure.
    pub gbtt_booked_departure: Option<String>,

    /// Realtime arrival (actual or estimated).
    pub realtime_arrival: Option<String>,

    /// Whether `realtime_arrival` is an actual rather than a forecast.
    pub realtime_arrival_actual: Option<bool>,

    /// Realtime departure (actual or estimated).
    pub realtime_departure: Option<String>,

    pub realtime_departure_actual: Option<bool>,

    /// Realtime passing time.
    pub realtime_pass: Option<String>,

    pub realtime_pass_actual: Option<bool>,

    /// Arrival lateness in minutes against the public timetable.
    pub realtime_gbtt_arrival_lateness: Option<i32>,

    /// Departure lateness in minutes against the public timetable.
    pub realtime_gbtt_departure_lateness: Option<i32>,

    /// "CALL", "PASS", "ORIGIN", "DESTINATION", "STARTS", "TERMINATES",
    /// "CANCELLED_CALL" and so on.
    pub display_as: Option<String>,

    /// Whether the train stops here.
    pub is_call: Option<bool>,

    pub is_public_call: Option<bool>,

    pub platform: Option<String>,
}
