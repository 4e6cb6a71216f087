//! Domain error types.
//!
//! These describe why a single train could not be processed. Both kinds
//! are recoverable: the poll loop logs them, skips the train and carries
//! on with the rest of the batch.

use chrono::NaiveDate;

use super::ServiceUid;

/// Failure to turn a train's timetable into something schedulable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Upstream has no timetable for this uid on this date
    #[error("no schedule found for {uid} on {date}")]
    NoSchedule { uid: ServiceUid, date: NaiveDate },

    /// A required time or location could not be resolved
    #[error("malformed schedule for {uid}: {reason}")]
    Malformed { uid: ServiceUid, reason: String },
}

impl ScheduleError {
    /// The service the error refers to.
    pub fn uid(&self) -> &ServiceUid {
        match self {
            ScheduleError::NoSchedule { uid, .. } | ScheduleError::Malformed { uid, .. } => uid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let uid = ServiceUid::new("H61429").unwrap();
        let date = NaiveDate::from_ymd_opt(2016, 4, 23).unwrap();

        let err = ScheduleError::NoSchedule {
            uid: uid.clone(),
            date,
        };
        assert_eq!(err.to_string(), "no schedule found for H61429 on 2016-04-23");
        assert_eq!(err.uid(), &uid);

        let err = ScheduleError::Malformed {
            uid,
            reason: "origin has no departure time".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed schedule for H61429: origin has no departure time"
        );
    }
}
