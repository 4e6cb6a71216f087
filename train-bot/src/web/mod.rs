//! Status endpoint for the bot.
//!
//! Read-only JSON views of the scheduled jobs and tracked trains.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
