//! In-process job scheduler.
//!
//! Each job is a tokio task sleeping until its fire time. A job fires at
//! most once: the firing task removes the job under the lock before it
//! delivers, and rescheduling aborts the old task and bumps a generation
//! counter so a task that already woke up finds itself stale.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::ServiceUid;

/// Stable identifier of a scheduled message: `{uid}:{location_key}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    /// Identifier for the message about one location of one service.
    ///
    /// ```
    /// use train_bot::domain::ServiceUid;
    /// use train_bot::scheduler::JobId;
    ///
    /// let uid = ServiceUid::new("H61429").unwrap();
    /// assert_eq!(JobId::for_message(&uid, "CAK").as_str(), "H61429:CAK");
    /// ```
    pub fn for_message(uid: &ServiceUid, location_key: &str) -> Self {
        JobId(format!("{}:{}", uid.as_str(), location_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a job delivers when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub uid: ServiceUid,
    pub service_date: NaiveDate,
    pub text: String,
}

/// Receives deliveries from fired jobs.
pub trait DeliveryHandler: Send + Sync + 'static {
    fn deliver(&self, id: &JobId, delivery: Delivery) -> impl Future<Output = ()> + Send;
}

/// Errors from scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("job {0} is already scheduled")]
    DuplicateJob(JobId),

    #[error("job {0} has already fired for this run")]
    AlreadyCompleted(JobId),

    #[error("no scheduled job {0}")]
    UnknownJob(JobId),
}

/// A pending job, as reported by `list_jobs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub id: JobId,
    pub fire_at: NaiveDateTime,
    pub uid: ServiceUid,
    pub service_date: NaiveDate,
    pub text: String,
}

/// Source of the current railway local time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

struct Job {
    fire_at: NaiveDateTime,
    delivery: Delivery,
    generation: u64,
    task: JoinHandle<()>,
}

/// A fired or missed job. The id is reused by the same service on later
/// dates, so a completion only covers the run it was for.
#[derive(Debug, Clone, Copy)]
struct Completion {
    due: NaiveDateTime,
    service_date: NaiveDate,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    completed: HashMap<JobId, Completion>,
    next_generation: u64,
}

impl Inner {
    fn completed_for(&self, id: &JobId, service_date: NaiveDate) -> bool {
        self.completed
            .get(id)
            .is_some_and(|done| done.service_date == service_date)
    }
}

/// Schedules deliveries at wall-clock times.
pub struct JobScheduler<H> {
    inner: Arc<Mutex<Inner>>,
    handler: Arc<H>,
    clock: Clock,
}

impl<H: DeliveryHandler> JobScheduler<H> {
    /// Create a scheduler using the system's local time.
    pub fn new(handler: H) -> Self {
        Self::with_clock(handler, Arc::new(|| chrono::Local::now().naive_local()))
    }

    /// Create a scheduler with a custom clock.
    pub fn with_clock(handler: H, clock: Clock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            handler: Arc::new(handler),
            clock,
        }
    }

    /// The current time according to this scheduler's clock.
    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Schedule a new job. A fire time in the past fires immediately.
    ///
    /// A completion left by an earlier run of the same service is
    /// replaced.
    pub async fn add_job(
        &self,
        id: JobId,
        fire_at: NaiveDateTime,
        delivery: Delivery,
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;

        if inner.completed_for(&id, delivery.service_date) {
            return Err(SchedulerError::AlreadyCompleted(id));
        }
        if inner.jobs.contains_key(&id) {
            return Err(SchedulerError::DuplicateJob(id));
        }
        inner.completed.remove(&id);

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let task = self.spawn_fire(id.clone(), fire_at, generation);
        debug!(job = %id, %fire_at, "job added");
        inner.jobs.insert(
            id,
            Job {
                fire_at,
                delivery,
                generation,
                task,
            },
        );
        Ok(())
    }

    /// Move a pending job to a new time.
    pub async fn reschedule_job(
        &self,
        id: &JobId,
        fire_at: NaiveDateTime,
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;

        if inner.completed.contains_key(id) {
            return Err(SchedulerError::AlreadyCompleted(id.clone()));
        }

        let generation = inner.next_generation;
        let Some(job) = inner.jobs.get_mut(id) else {
            return Err(SchedulerError::UnknownJob(id.clone()));
        };

        job.task.abort();
        debug!(job = %id, from = %job.fire_at, to = %fire_at, "job rescheduled");
        job.fire_at = fire_at;
        job.generation = generation;
        job.task = self.spawn_fire(id.clone(), fire_at, generation);
        inner.next_generation += 1;
        Ok(())
    }

    /// Replace the text a pending job will deliver.
    pub async fn update_text(&self, id: &JobId, text: String) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(id) {
            job.delivery.text = text;
            return Ok(());
        }
        if inner.completed.contains_key(id) {
            return Err(SchedulerError::AlreadyCompleted(id.clone()));
        }
        Err(SchedulerError::UnknownJob(id.clone()))
    }

    /// Record a job as done for the run on `service_date` without
    /// delivering it, cancelling it if it is pending. Used for messages
    /// whose time has long passed.
    pub async fn mark_missed(&self, id: JobId, due: NaiveDateTime, service_date: NaiveDate) {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.remove(&id) {
            job.task.abort();
        }
        debug!(job = %id, %due, %service_date, "job missed");
        inner.completed.insert(id, Completion { due, service_date });
    }

    /// When a pending job will fire.
    pub async fn fire_time(&self, id: &JobId) -> Option<NaiveDateTime> {
        self.inner.lock().await.jobs.get(id).map(|job| job.fire_at)
    }

    /// Service date of the run a pending job delivers for.
    pub async fn pending_service_date(&self, id: &JobId) -> Option<NaiveDate> {
        self.inner
            .lock()
            .await
            .jobs
            .get(id)
            .map(|job| job.delivery.service_date)
    }

    /// True if the job has fired or been marked missed for the run on
    /// `service_date`.
    pub async fn is_completed(&self, id: &JobId, service_date: NaiveDate) -> bool {
        self.inner.lock().await.completed_for(id, service_date)
    }

    /// All pending jobs, ordered by fire time then id.
    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<JobSummary> = inner
            .jobs
            .iter()
            .map(|(id, job)| JobSummary {
                id: id.clone(),
                fire_at: job.fire_at,
                uid: job.delivery.uid.clone(),
                service_date: job.delivery.service_date,
                text: job.delivery.text.clone(),
            })
            .collect();
        jobs.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Forget completed jobs that were due before `older_than`. Returns
    /// how many were removed.
    pub async fn prune_completed(&self, older_than: NaiveDateTime) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.completed.len();
        inner.completed.retain(|_, done| done.due >= older_than);
        before - inner.completed.len()
    }

    /// Cancel every pending job.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        for (id, job) in inner.jobs.drain() {
            trace!(job = %id, "cancelling job");
            job.task.abort();
        }
    }

    fn spawn_fire(&self, id: JobId, fire_at: NaiveDateTime, generation: u64) -> JoinHandle<()> {
        let delay = (fire_at - self.now()).to_std().unwrap_or_default();
        let inner = Arc::clone(&self.inner);
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let delivery = {
                let mut inner = inner.lock().await;
                match inner.jobs.get(&id) {
                    Some(job) if job.generation == generation => {}
                    _ => return,
                }
                let Some(job) = inner.jobs.remove(&id) else {
                    return;
                };
                let done = Completion {
                    due: fire_at,
                    service_date: job.delivery.service_date,
                };
                inner.completed.insert(id.clone(), done);
                job.delivery
            };

            debug!(job = %id, "job firing");
            handler.deliver(&id, delivery).await;
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use chrono::NaiveTime;
    use std::time::Duration;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 23).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn uid() -> ServiceUid {
        ServiceUid::new("H61429").unwrap()
    }

    fn delivery(text: &str) -> Delivery {
        Delivery {
            uid: uid(),
            service_date: date(),
            text: text.to_string(),
        }
    }

    fn scheduler() -> JobScheduler<Recorder> {
        let clock = paused_clock(at(8, 0));
        JobScheduler::with_clock(Recorder::new(clock.clone()), clock)
    }

    async fn advance_mins(mins: u64) {
        tokio::time::sleep(Duration::from_secs(mins * 60)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_time() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");
        sched.add_job(id.clone(), at(9, 20), delivery("cark")).await.unwrap();

        advance_mins(79).await;
        assert!(sched.handler().ids().is_empty());
        assert_eq!(sched.fire_time(&id).await, Some(at(9, 20)));

        advance_mins(2).await;
        let delivered = sched.handler().delivered.lock().unwrap().clone();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, id);
        assert!(delivered[0].1 >= at(9, 20));
        assert_eq!(delivered[0].2, "cark");

        assert!(sched.is_completed(&id, date()).await);
        assert_eq!(sched.fire_time(&id).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn past_due_fires_immediately() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "origin");
        sched.add_job(id, at(7, 55), delivery("late")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sched.handler().ids(), vec!["H61429:origin"]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_add_is_rejected() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");
        sched.add_job(id.clone(), at(9, 20), delivery("a")).await.unwrap();

        assert_eq!(
            sched.add_job(id.clone(), at(9, 30), delivery("b")).await,
            Err(SchedulerError::DuplicateJob(id.clone()))
        );
        assert_eq!(sched.list_jobs().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_fires_once_at_new_time() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");
        sched.add_job(id.clone(), at(9, 20), delivery("cark")).await.unwrap();
        sched.reschedule_job(&id, at(9, 30)).await.unwrap();

        advance_mins(85).await;
        assert!(sched.handler().ids().is_empty());

        advance_mins(10).await;
        let delivered = sched.handler().delivered.lock().unwrap().clone();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].1 >= at(9, 30));
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_earlier() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");
        sched.add_job(id.clone(), at(9, 20), delivery("cark")).await.unwrap();
        sched.reschedule_job(&id, at(8, 30)).await.unwrap();

        advance_mins(31).await;
        assert_eq!(sched.handler().ids(), vec!["H61429:CAK"]);

        advance_mins(60).await;
        assert_eq!(sched.handler().ids().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_unknown_or_completed() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");

        assert_eq!(
            sched.reschedule_job(&id, at(9, 0)).await,
            Err(SchedulerError::UnknownJob(id.clone()))
        );

        sched.add_job(id.clone(), at(8, 1), delivery("cark")).await.unwrap();
        advance_mins(2).await;

        assert_eq!(
            sched.reschedule_job(&id, at(9, 0)).await,
            Err(SchedulerError::AlreadyCompleted(id.clone()))
        );
        assert_eq!(
            sched.add_job(id.clone(), at(9, 0), delivery("again")).await,
            Err(SchedulerError::AlreadyCompleted(id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn list_is_sorted() {
        let sched = scheduler();
        sched
            .add_job(JobId::for_message(&uid(), "destination"), at(10, 0), delivery("d"))
            .await
            .unwrap();
        sched
            .add_job(JobId::for_message(&uid(), "origin"), at(9, 0), delivery("o"))
            .await
            .unwrap();
        sched
            .add_job(JobId::for_message(&uid(), "CAK"), at(9, 0), delivery("c"))
            .await
            .unwrap();

        let ids: Vec<_> = sched
            .list_jobs()
            .await
            .into_iter()
            .map(|j| j.id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec!["H61429:CAK", "H61429:origin", "H61429:destination"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missed_jobs_never_fire() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");
        sched.add_job(id.clone(), at(9, 20), delivery("cark")).await.unwrap();
        sched.mark_missed(id.clone(), at(7, 0), date()).await;

        advance_mins(120).await;
        assert!(sched.handler().ids().is_empty());
        assert!(sched.is_completed(&id, date()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn next_run_reuses_the_id() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "origin");
        sched.add_job(id.clone(), at(8, 1), delivery("today")).await.unwrap();
        advance_mins(2).await;

        let tomorrow = date().succ_opt().unwrap();
        assert!(sched.is_completed(&id, date()).await);
        assert!(!sched.is_completed(&id, tomorrow).await);

        let next = Delivery {
            service_date: tomorrow,
            ..delivery("tomorrow")
        };
        sched.add_job(id.clone(), at(8, 10), next).await.unwrap();
        assert_eq!(sched.pending_service_date(&id).await, Some(tomorrow));
        assert!(!sched.is_completed(&id, date()).await);

        advance_mins(10).await;
        assert_eq!(sched.handler().ids(), vec!["H61429:origin", "H61429:origin"]);
        assert!(sched.is_completed(&id, tomorrow).await);
    }

    #[tokio::test(start_paused = true)]
    async fn update_text_changes_delivery() {
        let sched = scheduler();
        let id = JobId::for_message(&uid(), "CAK");
        sched.add_job(id.clone(), at(8, 10), delivery("old")).await.unwrap();
        sched.update_text(&id, "new".into()).await.unwrap();

        advance_mins(11).await;
        let delivered = sched.handler().delivered.lock().unwrap().clone();
        assert_eq!(delivered[0].2, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn prune_forgets_old_completions() {
        let sched = scheduler();
        sched
            .mark_missed(JobId::for_message(&uid(), "origin"), at(6, 0), date())
            .await;
        sched
            .mark_missed(JobId::for_message(&uid(), "CAK"), at(7, 30), date())
            .await;

        assert_eq!(sched.prune_completed(at(7, 0)).await, 1);
        assert!(
            !sched
                .is_completed(&JobId::for_message(&uid(), "origin"), date())
                .await
        );
        assert!(
            sched
                .is_completed(&JobId::for_message(&uid(), "CAK"), date())
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending() {
        let sched = scheduler();
        sched
            .add_job(JobId::for_message(&uid(), "CAK"), at(8, 5), delivery("c"))
            .await
            .unwrap();
        sched.shutdown().await;

        advance_mins(10).await;
        assert!(sched.handler().ids().is_empty());
        assert!(sched.list_jobs().await.is_empty());
    }
}
