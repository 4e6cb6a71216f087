//! Everything a poll pass needs, built once at startup.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::domain::{Train, TrainKey};
use crate::messages::{MessageTemplates, TownRegistry};
use crate::publish::Dispatcher;
use crate::scheduler::JobScheduler;
use crate::watch::WatchList;

/// Poll loop tuning, taken from the `poll` config section.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub interval: Duration,
    pub late_grace: chrono::Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            late_grace: chrono::Duration::minutes(10),
            max_concurrent_fetches: 4,
        }
    }
}

impl From<&Config> for BotSettings {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll.interval(),
            late_grace: config.poll.late_grace(),
            max_concurrent_fetches: config.poll.max_concurrent_fetches.max(1),
        }
    }
}

/// Shared application state.
///
/// Shared between the poll loop and the status endpoint behind an `Arc`.
pub struct AppContext<S> {
    pub timetable: S,
    pub watch: WatchList,
    pub towns: TownRegistry,
    pub templates: MessageTemplates,
    pub scheduler: JobScheduler<Dispatcher>,
    pub settings: BotSettings,
    trains: Mutex<HashMap<TrainKey, Train>>,
}

impl<S> AppContext<S> {
    pub fn new(
        timetable: S,
        watch: WatchList,
        towns: TownRegistry,
        templates: MessageTemplates,
        scheduler: JobScheduler<Dispatcher>,
        settings: BotSettings,
    ) -> Self {
        Self {
            timetable,
            watch,
            towns,
            templates,
            scheduler,
            settings,
            trains: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn tracked(&self) -> &Mutex<HashMap<TrainKey, Train>> {
        &self.trains
    }

    /// Snapshot of every tracked train, ordered by uid then date.
    pub async fn trains(&self) -> Vec<Train> {
        let trains = self.trains.lock().await;
        let mut list: Vec<Train> = trains.values().cloned().collect();
        list.sort_by_key(Train::key);
        list
    }

    /// Services from dates before `date` that still have messages waiting
    /// to go out, such as the late part of a run that crossed midnight.
    pub async fn pending_before(&self, date: NaiveDate) -> BTreeSet<TrainKey> {
        self.scheduler
            .list_jobs()
            .await
            .into_iter()
            .filter(|job| job.service_date < date)
            .map(|job| TrainKey {
                uid: job.uid,
                service_date: job.service_date,
            })
            .collect()
    }

    /// Stop tracking trains of service dates before `date`, except those
    /// with pending jobs. Returns how many were dropped.
    pub async fn forget_before(&self, date: NaiveDate) -> usize {
        let pending = self.pending_before(date).await;
        let mut trains = self.trains.lock().await;
        let before = trains.len();
        trains.retain(|key, _| key.service_date >= date || pending.contains(key));
        before - trains.len()
    }
}
