//! Registering a train's messages with the scheduler.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::domain::Train;
use crate::messages::Message;

use super::jobs::{Delivery, DeliveryHandler, JobId, JobScheduler, SchedulerError};

/// What happened to each message in one registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub added: usize,
    pub rescheduled: usize,
    pub unchanged: usize,
    pub missed: usize,
    /// Messages held back while another run of the same uid is pending.
    pub deferred: usize,
}

impl RegistrationReport {
    pub fn merge(&mut self, other: RegistrationReport) {
        self.added += other.added;
        self.rescheduled += other.rescheduled;
        self.unchanged += other.unchanged;
        self.missed += other.missed;
        self.deferred += other.deferred;
    }
}

/// Register every message of a train under `{uid}:{location_key}`.
///
/// - no job yet: add one
/// - pending job at another time: move it and refresh its text
/// - pending job at the same time, or job already fired: leave it
/// - pending job for another run of the same uid: defer, the caller
///   registers this run again once that one has gone out
///
/// A message due more than `late_grace` before `now` is not sent at all;
/// it is recorded as missed so later passes leave it alone. Anything due
/// within the grace period fires straight away.
///
/// Calling this twice with the same messages leaves exactly one job per
/// message.
pub async fn register_messages<H: DeliveryHandler>(
    scheduler: &JobScheduler<H>,
    train: &Train,
    messages: &[Message],
    now: NaiveDateTime,
    late_grace: Duration,
) -> RegistrationReport {
    let mut report = RegistrationReport::default();
    let service_date = train.service_date();

    for message in messages {
        let id = JobId::for_message(train.uid(), &message.location_key);

        if scheduler.is_completed(&id, service_date).await {
            report.unchanged += 1;
            continue;
        }

        match scheduler.pending_service_date(&id).await {
            Some(other) if other != service_date => {
                debug!(job = %id, pending = %other, %service_date, "another run still pending");
                report.deferred += 1;
                continue;
            }
            _ => {}
        }

        let existing = scheduler.fire_time(&id).await;
        if existing == Some(message.send_at) {
            report.unchanged += 1;
            continue;
        }

        if message.send_at < now - late_grace {
            info!(job = %id, send_at = %message.send_at, role = %message.role, "message too late, not sending");
            scheduler.mark_missed(id, message.send_at, service_date).await;
            report.missed += 1;
            continue;
        }

        let result = match existing {
            Some(_) => reschedule(scheduler, &id, message).await.map(|()| {
                report.rescheduled += 1;
            }),
            None => {
                let delivery = Delivery {
                    uid: train.uid().clone(),
                    service_date,
                    text: message.text.clone(),
                };
                scheduler
                    .add_job(id.clone(), message.send_at, delivery)
                    .await
                    .map(|()| report.added += 1)
            }
        };

        // The job fired or was registered concurrently; either way there
        // is exactly one of it.
        if let Err(e) = result {
            debug!(job = %id, error = %e, "registration conflict ignored");
            report.unchanged += 1;
        }
    }

    report
}

async fn reschedule<H: DeliveryHandler>(
    scheduler: &JobScheduler<H>,
    id: &JobId,
    message: &Message,
) -> Result<(), SchedulerError> {
    scheduler.update_text(id, message.text.clone()).await?;
    scheduler.reschedule_job(id, message.send_at).await
}
