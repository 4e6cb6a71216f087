//! Application state for the status endpoint.

use std::sync::Arc;

use crate::bot::AppContext;

/// Shared application state.
///
/// A handle on the same context the poll loop runs against.
pub struct AppState<S> {
    pub ctx: Arc<AppContext<S>>,
}

impl<S> AppState<S> {
    pub fn new(ctx: Arc<AppContext<S>>) -> Self {
        Self { ctx }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}
