//! Domain types for the train information bot.
//!
//! This module contains the core domain model types that represent
//! validated rail data. Identifier types enforce their invariants at
//! construction time, so code that receives them can trust their validity.

mod error;
mod headcode;
mod location;
mod service_uid;
mod station;
mod time;
mod train;

pub use error::ScheduleError;
pub use headcode::Headcode;
pub use location::Location;
pub use service_uid::{InvalidServiceUid, ServiceUid};
pub use station::{Crs, InvalidCrs};
pub use time::{RailTime, TimeError};
pub use train::{Fingerprint, PopulateOutcome, Train, TrainKey};

#[cfg(test)]
pub(crate) use train::fixtures;
