//! The bot itself: a poll loop that keeps the scheduler in step with RTT.
//!
//! Each pass searches every watched route for today's services, refreshes
//! the tracked trains from their latest payloads, and registers messages
//! for the ones that changed and are of interest.

mod context;
mod poll;
mod run;

pub use context::{AppContext, BotSettings};
pub use poll::{PassReport, poll_once};
pub use run::run;
