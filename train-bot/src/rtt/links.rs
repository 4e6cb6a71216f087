//! RealTimeTrains URL generation.
//!
//! Generates links to the public RealTimeTrains site, which are embedded
//! in published messages so readers can follow the train themselves.

use chrono::NaiveDate;

use crate::domain::ServiceUid;

const PUBLIC_BASE_URL: &str = "https://www.realtimetrains.co.uk";

/// Generate the "advanced" RTT page for one run of a service.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use train_bot::domain::ServiceUid;
/// use train_bot::rtt::service_url;
///
/// let uid = ServiceUid::new("H61429").unwrap();
/// let date = NaiveDate::from_ymd_opt(2016, 4, 23).unwrap();
/// assert_eq!(
///     service_url(&uid, date),
///     "https://www.realtimetrains.co.uk/train/H61429/2016/04/23/advanced"
/// );
/// ```
pub fn service_url(uid: &ServiceUid, date: NaiveDate) -> String {
    format!(
        "{}/train/{}/{}/advanced",
        PUBLIC_BASE_URL,
        uid.as_str(),
        date.format("%Y/%m/%d"),
    )
}
