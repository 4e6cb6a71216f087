//! Fan fired jobs out to every configured platform.

use tracing::{info, warn};

use crate::scheduler::{Delivery, DeliveryHandler, JobId};

use super::chains::ReplyChains;
use super::platforms::Publisher;

/// Delivers scheduled messages to each publisher, threading messages about
/// the same train where the platform allows it.
#[derive(Debug)]
pub struct Dispatcher {
    publishers: Vec<Publisher>,
    chains: ReplyChains,
}

impl Dispatcher {
    pub fn new(publishers: Vec<Publisher>) -> Self {
        Self {
            publishers,
            chains: ReplyChains::new(),
        }
    }

    pub fn publishers(&self) -> &[Publisher] {
        &self.publishers
    }

    pub fn chains(&self) -> &ReplyChains {
        &self.chains
    }

    async fn deliver_to(&self, publisher: &Publisher, id: &JobId, delivery: &Delivery) {
        let platform = publisher.name();
        let parent = if publisher.supports_threads() {
            self.chains
                .last(&delivery.uid, delivery.service_date, platform)
                .await
        } else {
            None
        };

        let result = match &parent {
            Some(parent) => publisher.publish_reply(&delivery.text, parent).await,
            None => publisher.publish(&delivery.text).await,
        };

        match result {
            Ok(handle) => {
                info!(job = %id, platform, %handle, "message published");
                if publisher.supports_threads() {
                    self.chains
                        .record(&delivery.uid, delivery.service_date, platform, handle)
                        .await;
                }
            }
            Err(e) => {
                warn!(job = %id, platform, error = %e, "failed to publish message");
            }
        }
    }
}

impl DeliveryHandler for Dispatcher {
    async fn deliver(&self, id: &JobId, delivery: Delivery) {
        for publisher in &self.publishers {
            self.deliver_to(publisher, id, &delivery).await;
        }
    }
}
