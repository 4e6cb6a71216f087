//! Route matching.
//!
//! A watch list is built from the configured routes. A train is of
//! interest when it is running and both ends of its journey are among the
//! watched stations.

use std::collections::HashSet;

use serde::Deserialize;

use crate::domain::{ServiceUid, Train};

/// A route to watch, as station identifiers RTT accepts (CRS or TIPLOC).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchedRoute {
    pub from: String,
    pub to: String,
}

impl WatchedRoute {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The stations trains must start and end at.
///
/// Origins and destinations are pooled across routes, so with routes
/// LAN→BIF and CAR→BIF a train from CAR to BIF matches, as does one
/// from LAN to BIF.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    routes: Vec<WatchedRoute>,
    from: HashSet<String>,
    to: HashSet<String>,
}

impl WatchList {
    pub fn from_routes(routes: impl IntoIterator<Item = WatchedRoute>) -> Self {
        let routes: Vec<_> = routes.into_iter().collect();
        let from = routes.iter().map(|r| normalize(&r.from)).collect();
        let to = routes.iter().map(|r| normalize(&r.to)).collect();
        Self { routes, from, to }
    }

    /// The configured routes, in order.
    pub fn routes(&self) -> &[WatchedRoute] {
        &self.routes
    }

    /// True if the train is running and its origin and destination keys
    /// are both watched.
    ///
    /// Unpopulated trains are never of interest.
    pub fn is_of_interest(&self, train: &Train) -> bool {
        if !train.is_running() {
            return false;
        }
        let (Some(origin), Some(destination)) = (train.origin(), train.destination()) else {
            return false;
        };
        self.from.contains(&normalize(origin.key())) && self.to.contains(&normalize(destination.key()))
    }
}

/// Keep the first train for each uid, preserving order.
pub fn dedup_by_uid<T, F>(trains: impl IntoIterator<Item = T>, uid: F) -> Vec<T>
where
    F: Fn(&T) -> &ServiceUid,
{
    let mut seen = HashSet::new();
    trains
        .into_iter()
        .filter(|t| seen.insert(uid(t).clone()))
        .collect()
}

fn normalize(key: &str) -> String {
    key.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::*;
    use crate::rtt::RawService;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 23).unwrap()
    }

    fn populated(uid: &str, body: String) -> Train {
        let mut train = Train::new(ServiceUid::new(uid).unwrap(), date());
        train
            .populate(&RawService::from_body(body).unwrap())
            .unwrap();
        train
    }

    fn between(uid: &str, from: &str, to: &str, running: bool) -> Train {
        populated(
            uid,
            service_body(
                uid,
                running,
                vec![
                    call(from, Some(from), None, Some("0900")),
                    call(to, Some(to), Some("1000"), None),
                ],
            ),
        )
    }

    fn watch() -> WatchList {
        WatchList::from_routes([WatchedRoute::new("LAN", "BIF"), WatchedRoute::new("car", "BIF")])
    }

    #[test]
    fn matches_watched_ends() {
        assert!(watch().is_of_interest(&between("A1", "LAN", "BIF", true)));
        assert!(watch().is_of_interest(&between("A2", "CAR", "BIF", true)));
    }

    #[test]
    fn rejects_other_ends() {
        assert!(!watch().is_of_interest(&between("A1", "LAN", "PRE", true)));
        assert!(!watch().is_of_interest(&between("A2", "BIF", "LAN", true)));
    }

    #[test]
    fn matches_codeless_origin_by_tiploc() {
        let train = populated(
            "L20315",
            service_body(
                "L20315",
                true,
                vec![
                    serde_json::json!({
                        "description": "Crewe Coal Sidings",
                        "tiploc": "CREWSYC",
                        "wttBookedDeparture": "0300",
                    }),
                    call("Selby", Some("SEL"), Some("0700"), None),
                ],
            ),
        );
        let watch = WatchList::from_routes([WatchedRoute::new("CREWSYC", "SEL")]);

        assert!(watch.is_of_interest(&train));
        assert!(!watch.is_of_interest(&between("A1", "CRE", "SEL", true)));
    }

    #[test]
    fn rejects_trains_not_running() {
        assert!(!watch().is_of_interest(&between("A1", "LAN", "BIF", false)));
    }

    #[test]
    fn rejects_unpopulated() {
        let train = Train::new(ServiceUid::new("A1").unwrap(), date());
        assert!(!watch().is_of_interest(&train));
    }

    #[test]
    fn keeps_route_order() {
        let routes: Vec<_> = watch().routes().iter().map(|r| r.from.clone()).collect();
        assert_eq!(routes, vec!["LAN", "car"]);
    }

    #[test]
    fn dedup_keeps_first() {
        let uids: Vec<ServiceUid> = ["A", "B", "A", "C", "B"]
            .iter()
            .map(|s| ServiceUid::new(*s).unwrap())
            .collect();

        let kept = dedup_by_uid(uids.iter().enumerate(), |(_, u)| *u);
        let positions: Vec<_> = kept.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![0, 1, 3]);
    }
}
