//! One poll pass: search, populate, filter, derive, register.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::{PopulateOutcome, ScheduleError, ServiceUid, Train, TrainKey};
use crate::messages::derive_messages;
use crate::rtt::{RawService, RttError, TimetableSource};
use crate::scheduler::{JobId, RegistrationReport, register_messages};
use crate::watch::dedup_by_uid;

use super::context::AppContext;

/// Counts from one poll pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub searches_failed: usize,
    pub services_seen: usize,
    pub carried_over: usize,
    pub fetches_failed: usize,
    pub no_schedule: usize,
    pub malformed: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub of_interest: usize,
    pub duplicate_messages: usize,
    pub registration: RegistrationReport,
}

/// Run one pass for `date`, treating `now` as the current time.
///
/// Besides the trains found for `date`, trains from earlier dates with
/// jobs still pending are fetched again so that delays reported after
/// midnight still move their messages.
///
/// Failures never abort the pass: a failed search skips that route, a
/// failed fetch or unusable payload skips that train, and both are
/// retried on the next pass.
pub async fn poll_once<S: TimetableSource>(
    ctx: &AppContext<S>,
    date: NaiveDate,
    now: NaiveDateTime,
) -> PassReport {
    let mut report = PassReport::default();

    let uids = search_routes(ctx, date, &mut report).await;
    report.services_seen = uids.len();

    let carried = ctx.pending_before(date).await;
    report.carried_over = carried.len();
    if !carried.is_empty() {
        debug!(count = carried.len(), "refetching earlier trains with pending jobs");
    }

    let keys = uids
        .into_iter()
        .map(|uid| TrainKey {
            uid,
            service_date: date,
        })
        .chain(carried);

    let fetched: Vec<(TrainKey, Result<RawService, RttError>)> = stream::iter(keys)
        .map(|key| async move {
            let result = ctx.timetable.fetch_service(&key.uid, key.service_date).await;
            (key, result)
        })
        .buffer_unordered(ctx.settings.max_concurrent_fetches.max(1))
        .collect()
        .await;

    let mut updated = populate_all(ctx, fetched, &mut report).await;
    updated.sort_by_key(Train::key);

    let interesting: Vec<Train> = updated
        .into_iter()
        .filter(|train| ctx.watch.is_of_interest(train))
        .collect();
    let candidates: Vec<TrainKey> = interesting.iter().map(Train::key).collect();
    let interesting = dedup_by_uid(interesting, Train::uid);
    report.of_interest = interesting.len();

    // A uid can only be registered for one date per pass. The other run
    // is looked at again next pass.
    let kept: HashSet<TrainKey> = interesting.iter().map(Train::key).collect();
    let mut retry: Vec<TrainKey> = candidates
        .into_iter()
        .filter(|key| !kept.contains(key))
        .collect();

    let mut seen: HashSet<JobId> = HashSet::new();
    for train in &interesting {
        let messages = match derive_messages(train, &ctx.towns, &ctx.templates) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(uid = %train.uid(), error = %e, "cannot derive messages, skipping");
                report.malformed += 1;
                continue;
            }
        };

        let before = messages.len();
        let messages: Vec<_> = messages
            .into_iter()
            .filter(|m| seen.insert(JobId::for_message(train.uid(), &m.location_key)))
            .collect();
        report.duplicate_messages += before - messages.len();

        let registered =
            register_messages(&ctx.scheduler, train, &messages, now, ctx.settings.late_grace)
                .await;
        debug!(uid = %train.uid(), ?registered, "messages registered");
        if registered.deferred > 0 {
            retry.push(train.key());
        }
        report.registration.merge(registered);
    }

    if !retry.is_empty() {
        let mut trains = ctx.tracked().lock().await;
        for key in &retry {
            if let Some(train) = trains.get_mut(key) {
                train.forget_fingerprint();
            }
        }
    }

    report
}

/// Distinct uids from every watched route, in route order.
async fn search_routes<S: TimetableSource>(
    ctx: &AppContext<S>,
    date: NaiveDate,
    report: &mut PassReport,
) -> Vec<ServiceUid> {
    let mut seen = HashSet::new();
    let mut uids = Vec::new();

    for route in ctx.watch.routes() {
        match ctx
            .timetable
            .search_trains(&route.from, date, Some(&route.to))
            .await
        {
            Ok(found) => {
                debug!(from = %route.from, to = %route.to, count = found.len(), "route searched");
                uids.extend(found.into_iter().filter(|uid| seen.insert(uid.clone())));
            }
            Err(e) => {
                warn!(from = %route.from, to = %route.to, error = %e, "search failed");
                report.searches_failed += 1;
            }
        }
    }

    uids
}

/// Apply fetched payloads to the tracked trains, creating any not seen
/// before. Returns copies of the trains that changed.
async fn populate_all<S>(
    ctx: &AppContext<S>,
    fetched: Vec<(TrainKey, Result<RawService, RttError>)>,
    report: &mut PassReport,
) -> Vec<Train> {
    let mut trains = ctx.tracked().lock().await;
    let mut updated = Vec::new();

    for (key, result) in fetched {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!(train = %key, error = %e, "fetch failed");
                report.fetches_failed += 1;
                continue;
            }
        };

        let train = trains.entry(key.clone()).or_insert_with(|| {
            info!(train = %key, "tracking new train");
            Train::new(key.uid.clone(), key.service_date)
        });

        match train.populate(&raw) {
            Ok(PopulateOutcome::Updated) => {
                report.updated += 1;
                updated.push(train.clone());
            }
            Ok(PopulateOutcome::Unchanged) => report.unchanged += 1,
            Err(e @ ScheduleError::NoSchedule { .. }) => {
                warn!(error = %e, "skipping train");
                report.no_schedule += 1;
            }
            Err(e @ ScheduleError::Malformed { .. }) => {
                warn!(error = %e, "skipping train");
                report.malformed += 1;
            }
        }
    }

    updated
}
