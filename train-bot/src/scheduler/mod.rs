//! Timed delivery of messages.
//!
//! `JobScheduler` owns one pending job per message id and delivers each
//! through a `DeliveryHandler` when its time comes. `register_messages`
//! keeps the set of jobs in line with a train's latest derived messages.

mod jobs;
mod register;

pub use jobs::{
    Clock, Delivery, DeliveryHandler, JobId, JobScheduler, JobSummary, SchedulerError,
};
pub use register::{RegistrationReport, register_messages};

#[cfg(test)]
pub(crate) use jobs::testing;
