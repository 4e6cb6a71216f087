//! Data transfer objects for status responses.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{Location, RailTime, Train};
use crate::scheduler::JobSummary;

/// A pending message job.
#[derive(Debug, Serialize)]
pub struct JobResult {
    /// `{uid}:{location_key}`
    pub id: String,

    /// When the message will be posted, `YYYY-MM-DD HH:MM`
    pub fire_at: String,

    pub uid: String,

    pub service_date: String,

    /// Message text as it will be posted
    pub text: String,
}

impl JobResult {
    pub fn from_summary(job: &JobSummary) -> Self {
        Self {
            id: job.id.to_string(),
            fire_at: format_datetime(job.fire_at),
            uid: job.uid.to_string(),
            service_date: job.service_date.to_string(),
            text: job.text.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobResult>,
}

/// A tracked train.
#[derive(Debug, Serialize)]
pub struct TrainResult {
    pub uid: String,

    pub service_date: String,

    /// Whether RTT reports the train as running
    pub running: bool,

    /// Headcode (e.g., "2C47")
    pub headcode: Option<String>,

    /// Operator name
    pub operator: Option<String>,

    /// Origin, absent until the train has been populated
    pub origin: Option<StopResult>,

    /// Destination, absent until the train has been populated
    pub destination: Option<StopResult>,

    /// Number of locations between origin and destination
    pub calling_points: usize,

    /// RTT page for the service
    pub url: String,
}

impl TrainResult {
    pub fn from_train(train: &Train) -> Self {
        Self {
            uid: train.uid().to_string(),
            service_date: train.service_date().to_string(),
            running: train.is_running(),
            headcode: train.headcode().map(|h| h.as_str().to_string()),
            operator: train.operator().map(str::to_string),
            origin: train
                .origin()
                .map(|l| StopResult::from_location(l, l.effective_departure())),
            destination: train
                .destination()
                .map(|l| StopResult::from_location(l, l.effective_arrival())),
            calling_points: train.calling_points().len(),
            url: train.reference_url(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrainsResponse {
    pub trains: Vec<TrainResult>,
}

/// An origin or destination.
#[derive(Debug, Serialize)]
pub struct StopResult {
    /// Station CRS code, if RTT gave one
    pub crs: Option<String>,

    pub tiploc: Option<String>,

    /// Station name
    pub name: String,

    /// Best known time (HH:MM)
    pub time: Option<String>,

    /// Reported lateness in minutes, negative when early
    pub delay_mins: Option<i32>,
}

impl StopResult {
    fn from_location(location: &Location, time: Option<RailTime>) -> Self {
        Self {
            crs: location.code().map(|c| c.as_str().to_string()),
            tiploc: location.tiploc().map(str::to_string),
            name: location.name().to_string(),
            time: time.map(|t| t.to_string()),
            delay_mins: location.delay(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn format_datetime(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}
