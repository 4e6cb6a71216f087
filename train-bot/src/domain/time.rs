//! Rail time handling for RTT timetable data.
//!
//! RTT reports clock times without a date: public times as "HHMM",
//! working-timetable times as "HHMMSS" or with a trailing "H"/"½" for a
//! half minute. `RailTime` pairs such a clock value with a calendar date
//! so overnight services can be ordered correctly.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::cmp::Ordering;
use std::fmt;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A date-aware time of day.
///
/// # Examples
///
/// ```
/// use train_bot::domain::RailTime;
/// use chrono::{NaiveDate, Timelike};
///
/// let date = NaiveDate::from_ymd_opt(2016, 4, 23).unwrap();
/// let t = RailTime::parse("0920", date).unwrap();
/// assert_eq!(t.to_string(), "09:20");
///
/// // Working timetable half minutes
/// let t = RailTime::parse("0920H", date).unwrap();
/// assert_eq!(t.time().second(), 30);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RailTime {
    date: NaiveDate,
    time: NaiveTime,
}

impl RailTime {
    /// Create a new RailTime from date and time components.
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// Parse an RTT clock string against the given date.
    ///
    /// Accepted forms: `HHMM`, `HHMMSS`, `HHMMH`, `HHMM½` and `HH:MM`.
    ///
    /// ```
    /// use train_bot::domain::RailTime;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2016, 4, 23).unwrap();
    /// assert!(RailTime::parse("2359", date).is_ok());
    /// assert!(RailTime::parse("235930", date).is_ok());
    /// assert!(RailTime::parse("23:59", date).is_ok());
    /// assert!(RailTime::parse("2460", date).is_err());
    /// assert!(RailTime::parse("pass", date).is_err());
    /// ```
    pub fn parse(s: &str, date: NaiveDate) -> Result<Self, TimeError> {
        let s = s.trim();
        let (digits, half_minute) = match s.strip_suffix('H').or_else(|| s.strip_suffix('½')) {
            Some(rest) => (rest, true),
            None => (s, false),
        };

        let bytes = digits.as_bytes();
        let (hour, minute, second) = match bytes.len() {
            4 => (&bytes[0..2], &bytes[2..4], None),
            5 if bytes[2] == b':' => (&bytes[0..2], &bytes[3..5], None),
            6 if !half_minute => (&bytes[0..2], &bytes[2..4], Some(&bytes[4..6])),
            _ => return Err(TimeError::new("expected HHMM, HHMMSS or HH:MM")),
        };

        let hour = parse_two_digits(hour).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute =
            parse_two_digits(minute).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = match second {
            Some(bytes) => {
                parse_two_digits(bytes).ok_or_else(|| TimeError::new("invalid second digits"))?
            }
            None if half_minute => 30,
            None => 0,
        };
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| TimeError::new("invalid time"))?;

        Ok(Self { date, time })
    }

    /// Returns the date component.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the time component.
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    /// Converts to a NaiveDateTime.
    pub fn to_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Move the same clock time by a whole number of days.
    ///
    /// ```
    /// use train_bot::domain::RailTime;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let t = RailTime::parse("0005", date).unwrap().shift_days(1).unwrap();
    /// assert_eq!(t.date(), NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());
    /// assert_eq!(t.to_string(), "00:05");
    /// ```
    pub fn shift_days(&self, days: i64) -> Option<Self> {
        let date = self.date.checked_add_signed(Duration::days(days))?;
        Some(Self {
            date,
            time: self.time,
        })
    }

    /// Returns the duration between two times.
    ///
    /// Negative if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        self.to_datetime()
            .signed_duration_since(other.to_datetime())
    }
}

impl Ord for RailTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_datetime().cmp(&other.to_datetime())
    }
}

impl PartialOrd for RailTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for RailTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RailTime({} {})", self.date, self.time.format("%H:%M:%S"))
    }
}

impl fmt::Display for RailTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 23).unwrap()
    }

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn parse_public_times() {
        assert_eq!(RailTime::parse("0000", date()).unwrap().time(), hms(0, 0, 0));
        assert_eq!(RailTime::parse("0920", date()).unwrap().time(), hms(9, 20, 0));
        assert_eq!(RailTime::parse("2359", date()).unwrap().time(), hms(23, 59, 0));
    }

    #[test]
    fn parse_working_times() {
        assert_eq!(RailTime::parse("092030", date()).unwrap().time(), hms(9, 20, 30));
        assert_eq!(RailTime::parse("0920H", date()).unwrap().time(), hms(9, 20, 30));
        assert_eq!(RailTime::parse("0920½", date()).unwrap().time(), hms(9, 20, 30));
    }

    #[test]
    fn parse_colon_form() {
        assert_eq!(RailTime::parse("09:20", date()).unwrap().time(), hms(9, 20, 0));
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(RailTime::parse(" 0920\n", date()).unwrap().time(), hms(9, 20, 0));
    }

    #[test]
    fn reject_bad_formats() {
        assert!(RailTime::parse("", date()).is_err());
        assert!(RailTime::parse("pass", date()).is_err());
        assert!(RailTime::parse("920", date()).is_err());
        assert!(RailTime::parse("09200", date()).is_err());
        assert!(RailTime::parse("092030H", date()).is_err());
        assert!(RailTime::parse("09-20", date()).is_err());
    }

    #[test]
    fn reject_out_of_range() {
        assert!(RailTime::parse("2400", date()).is_err());
        assert!(RailTime::parse("0960", date()).is_err());
        assert!(RailTime::parse("092060", date()).is_err());
    }

    #[test]
    fn ordering_uses_date() {
        let late = RailTime::parse("2350", date()).unwrap();
        let early_next_day = RailTime::parse("0005", date()).unwrap().shift_days(1).unwrap();
        assert!(early_next_day > late);
        assert_eq!(early_next_day.signed_duration_since(late), Duration::minutes(15));
    }

    #[test]
    fn shift_days_back() {
        let t = RailTime::parse("0005", date()).unwrap();
        let shifted = t.shift_days(-1).unwrap();
        assert_eq!(shifted.date(), NaiveDate::from_ymd_opt(2016, 4, 22).unwrap());
        assert_eq!(shifted.time(), t.time());
    }

    #[test]
    fn display_and_debug() {
        let t = RailTime::parse("0920H", date()).unwrap();
        assert_eq!(t.to_string(), "09:20");
        assert_eq!(format!("{:?}", t), "RailTime(2016-04-23 09:20:30)");
    }
}
