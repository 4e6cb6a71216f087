//! Reply chains: the last message posted about each train, per platform.

use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::domain::ServiceUid;

use super::platforms::MessageHandle;

type ChainKey = (ServiceUid, NaiveDate, &'static str);

/// Tracks the most recent post for each `(uid, service_date, platform)` so
/// that later messages about the same run thread under it.
#[derive(Debug, Default)]
pub struct ReplyChains {
    chains: Mutex<HashMap<ChainKey, MessageHandle>>,
}

impl ReplyChains {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last handle posted for this train on this platform.
    pub async fn last(
        &self,
        uid: &ServiceUid,
        service_date: NaiveDate,
        platform: &'static str,
    ) -> Option<MessageHandle> {
        self.chains
            .lock()
            .await
            .get(&(uid.clone(), service_date, platform))
            .cloned()
    }

    pub async fn record(
        &self,
        uid: &ServiceUid,
        service_date: NaiveDate,
        platform: &'static str,
        handle: MessageHandle,
    ) {
        self.chains
            .lock()
            .await
            .insert((uid.clone(), service_date, platform), handle);
    }

    /// Drop chains for service dates before `date`. Returns how many went.
    pub async fn prune(&self, date: NaiveDate) -> usize {
        let mut chains = self.chains.lock().await;
        let before = chains.len();
        chains.retain(|(_, service_date, _), _| *service_date >= date);
        before - chains.len()
    }

    pub async fn len(&self) -> usize {
        self.chains.lock().await.len()
    }
}
