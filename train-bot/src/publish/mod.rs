//! Posting messages to social platforms.
//!
//! A `Dispatcher` is the scheduler's delivery handler. It hands each fired
//! message to every configured `Publisher` and keeps `ReplyChains` so that
//! the messages about one train run form a thread.

mod chains;
mod dispatch;
mod error;
mod platforms;

pub use chains::ReplyChains;
pub use dispatch::Dispatcher;
pub use error::PublishError;
pub use platforms::{
    DryRunPublisher, MastodonConfig, MastodonPublisher, MessageHandle, Post, Publisher,
};
