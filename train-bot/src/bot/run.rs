//! The poll loop.

use std::future::Future;

use chrono::{Days, NaiveDateTime};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::rtt::TimetableSource;

use super::context::AppContext;
use super::poll::poll_once;

/// Poll every `settings.interval` until `shutdown` resolves, then cancel
/// all pending jobs.
///
/// The first pass runs immediately. Passes never overlap: a slow pass
/// delays the next tick rather than bunching them up.
pub async fn run<S, F>(ctx: &AppContext<S>, shutdown: F)
where
    S: TimetableSource,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(ctx.settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, stopping poll loop");
                break;
            }
            _ = interval.tick() => {
                let now = ctx.scheduler.now();
                let report = poll_once(ctx, now.date(), now).await;
                info!(
                    seen = report.services_seen,
                    carried_over = report.carried_over,
                    updated = report.updated,
                    of_interest = report.of_interest,
                    added = report.registration.added,
                    rescheduled = report.registration.rescheduled,
                    missed = report.registration.missed,
                    deferred = report.registration.deferred,
                    failed = report.searches_failed + report.fetches_failed,
                    "poll pass complete"
                );
                housekeeping(ctx, now).await;
            }
        }
    }

    ctx.scheduler.shutdown().await;
}

/// Forget state for past service dates.
///
/// Yesterday's reply chains and completions are kept so trains running
/// over midnight still thread and don't refire. Trains from earlier dates
/// are kept while they have pending jobs, so the poll pass keeps
/// refreshing them.
async fn housekeeping<S>(ctx: &AppContext<S>, now: NaiveDateTime) {
    let today = now.date();
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    let cutoff = now - chrono::Duration::days(1);

    let jobs = ctx.scheduler.prune_completed(cutoff).await;
    let chains = ctx.scheduler.handler().chains().prune(yesterday).await;
    let trains = ctx.forget_before(today).await;

    if jobs + chains + trains > 0 {
        debug!(jobs, chains, trains, "pruned old state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotSettings;
    use crate::domain::{ServiceUid, fixtures::*};
    use crate::messages::{MessageTemplates, TownRegistry};
    use crate::publish::{Dispatcher, DryRunPublisher, Publisher};
    use crate::rtt::MockTimetable;
    use crate::scheduler::{JobId, JobScheduler, testing::paused_clock};
    use crate::watch::{WatchList, WatchedRoute};
    use chrono::{NaiveDate, NaiveTime};
    use std::time::Duration;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 23).unwrap()
    }

    fn context(mock: MockTimetable, outbox: DryRunPublisher) -> AppContext<MockTimetable> {
        let start = date().and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        let dispatcher = Dispatcher::new(vec![Publisher::DryRun(outbox)]);
        AppContext::new(
            mock,
            WatchList::from_routes([WatchedRoute::new("LAN", "BIF")]),
            TownRegistry::new([("CAK", Some("Cark-in-Cartmel"))]),
            MessageTemplates::default(),
            JobScheduler::with_clock(dispatcher, paused_clock(start)),
            BotSettings::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_shutdown() {
        let mock = MockTimetable::new();
        let uid = ServiceUid::new("H61429").unwrap();
        mock.set_search("LAN", Some("BIF"), date(), vec![uid.clone()])
            .await;
        mock.set_service(&uid, date(), cumbrian_coast("H61429")).await;
        let ctx = context(mock.clone(), DryRunPublisher::new(true));

        run(&ctx, tokio::time::sleep(Duration::from_secs(150))).await;

        // Passes at 0s, 60s and 120s.
        assert_eq!(mock.search_calls(), 3);
        assert_eq!(ctx.trains().await.len(), 1);
        // Pending jobs are cancelled on the way out.
        assert!(ctx.scheduler.list_jobs().await.is_empty());
        assert!(
            !ctx.scheduler
                .is_completed(&JobId::for_message(&uid, "origin"), date())
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn housekeeping_drops_old_trains() {
        let mock = MockTimetable::new();
        let ctx = context(mock.clone(), DryRunPublisher::new(true));
        let uid = ServiceUid::new("H61429").unwrap();
        let yesterday = date().pred_opt().unwrap();

        mock.set_search("LAN", Some("BIF"), yesterday, vec![uid.clone()])
            .await;
        mock.set_service(&uid, yesterday, cumbrian_coast("H61429"))
            .await;
        // Too long ago for anything to be sent.
        let yesterday_evening = yesterday.and_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let report = poll_once(&ctx, yesterday, yesterday_evening).await;
        assert_eq!(report.registration.missed, 3);
        assert_eq!(ctx.trains().await.len(), 1);

        housekeeping(&ctx, ctx.scheduler.now()).await;
        assert!(ctx.trains().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn housekeeping_keeps_trains_with_pending_jobs() {
        let mock = MockTimetable::new();
        let ctx = context(mock.clone(), DryRunPublisher::new(true));
        let uid = ServiceUid::new("H61429").unwrap();
        let yesterday = date().pred_opt().unwrap();

        mock.set_search("LAN", Some("BIF"), yesterday, vec![uid.clone()])
            .await;
        mock.set_service(
            &uid,
            yesterday,
            service_body(
                "H61429",
                true,
                vec![
                    call("Lancaster", Some("LAN"), None, Some("2330")),
                    call("Barrow-in-Furness", Some("BIF"), Some("0930"), None),
                ],
            ),
        )
        .await;
        let late_evening = yesterday.and_time(NaiveTime::from_hms_opt(23, 25, 0).unwrap());
        poll_once(&ctx, yesterday, late_evening).await;

        // The arrival at 09:30 this morning is still to come.
        housekeeping(&ctx, ctx.scheduler.now()).await;
        assert_eq!(ctx.trains().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(91 * 60)).await;
        housekeeping(&ctx, ctx.scheduler.now()).await;
        assert!(ctx.trains().await.is_empty());
    }
}
