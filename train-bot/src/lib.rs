//! Train running bot.
//!
//! Watches Realtime Trains for services on configured routes and posts
//! timed updates as each one departs, passes towns of note and arrives.

pub mod bot;
pub mod cache;
pub mod config;
pub mod domain;
pub mod messages;
pub mod publish;
pub mod rtt;
pub mod scheduler;
pub mod watch;
pub mod web;
