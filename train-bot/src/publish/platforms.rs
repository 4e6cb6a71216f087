//! Places messages get posted to.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::error::PublishError;

/// Platform-assigned identifier of a posted message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(String);

impl MessageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        MessageHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message recorded by the dry-run publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub handle: MessageHandle,
    pub text: String,
    pub in_reply_to: Option<MessageHandle>,
}

/// Logs messages instead of posting them, keeping an in-memory outbox.
#[derive(Debug, Clone)]
pub struct DryRunPublisher {
    outbox: Arc<Mutex<Vec<Post>>>,
    next_id: Arc<AtomicU64>,
    threaded: bool,
}

impl DryRunPublisher {
    /// Create a dry-run publisher. `threaded` controls whether it
    /// accepts replies.
    pub fn new(threaded: bool) -> Self {
        Self {
            outbox: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            threaded,
        }
    }

    /// Everything "posted" so far, oldest first.
    pub async fn outbox(&self) -> Vec<Post> {
        self.outbox.lock().await.clone()
    }

    async fn post(&self, text: &str, in_reply_to: Option<&MessageHandle>) -> MessageHandle {
        let handle = MessageHandle::new(format!(
            "dry-run-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        info!(%handle, in_reply_to = ?in_reply_to.map(|h| h.as_str()), text, "dry run post");
        self.outbox.lock().await.push(Post {
            handle: handle.clone(),
            text: text.to_string(),
            in_reply_to: in_reply_to.cloned(),
        });
        handle
    }
}

/// Mastodon connection settings.
#[derive(Debug, Clone)]
pub struct MastodonConfig {
    /// Instance URL, e.g. "https://mastodon.social"
    pub base_url: String,
    /// Access token with `write:statuses` scope
    pub access_token: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MastodonConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
            timeout_secs: 30,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Serialize)]
struct NewStatus<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
}

/// Posts statuses to a Mastodon instance.
#[derive(Debug, Clone)]
pub struct MastodonPublisher {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MastodonPublisher {
    pub fn new(config: MastodonConfig) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
        })
    }

    fn statuses_url(&self) -> String {
        format!("{}/api/v1/statuses", self.base_url)
    }

    async fn post(
        &self,
        text: &str,
        in_reply_to: Option<&MessageHandle>,
    ) -> Result<MessageHandle, PublishError> {
        let response = self
            .http
            .post(self.statuses_url())
            .bearer_auth(&self.access_token)
            .json(&NewStatus {
                status: text,
                in_reply_to_id: in_reply_to.map(MessageHandle::as_str),
            })
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(PublishError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PublishError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let created: StatusResponse =
            serde_json::from_str(&body).map_err(|e| PublishError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })?;

        Ok(MessageHandle::new(created.id))
    }
}

/// A platform messages are published to.
#[derive(Debug, Clone)]
pub enum Publisher {
    DryRun(DryRunPublisher),
    Mastodon(MastodonPublisher),
}

impl Publisher {
    /// Short name used in logs and reply-chain keys.
    pub fn name(&self) -> &'static str {
        match self {
            Publisher::DryRun(_) => "dry-run",
            Publisher::Mastodon(_) => "mastodon",
        }
    }

    /// Whether this platform can post a message as a reply to another.
    pub fn supports_threads(&self) -> bool {
        match self {
            Publisher::DryRun(p) => p.threaded,
            Publisher::Mastodon(_) => true,
        }
    }

    /// Post a standalone message.
    pub async fn publish(&self, text: &str) -> Result<MessageHandle, PublishError> {
        match self {
            Publisher::DryRun(p) => Ok(p.post(text, None).await),
            Publisher::Mastodon(p) => p.post(text, None).await,
        }
    }

    /// Post a message as a reply to `parent`.
    pub async fn publish_reply(
        &self,
        text: &str,
        parent: &MessageHandle,
    ) -> Result<MessageHandle, PublishError> {
        match self {
            Publisher::DryRun(p) => Ok(p.post(text, Some(parent)).await),
            Publisher::Mastodon(p) => p.post(text, Some(parent)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_records_posts() {
        let dry = DryRunPublisher::new(true);
        let publisher = Publisher::DryRun(dry.clone());

        let first = publisher.publish("leaving").await.unwrap();
        let second = publisher.publish_reply("passing", &first).await.unwrap();

        let outbox = dry.outbox().await;
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[0].in_reply_to, None);
        assert_eq!(outbox[1].in_reply_to, Some(first.clone()));
        assert_eq!(outbox[1].handle, second);
        assert_ne!(first, second);
    }

    #[test]
    fn platform_properties() {
        let dry = Publisher::DryRun(DryRunPublisher::new(false));
        assert_eq!(dry.name(), "dry-run");
        assert!(!dry.supports_threads());

        let mastodon = Publisher::Mastodon(
            MastodonPublisher::new(MastodonConfig::new("https://example.social/", "token"))
                .unwrap(),
        );
        assert_eq!(mastodon.name(), "mastodon");
        assert!(mastodon.supports_threads());
    }

    #[test]
    fn statuses_url() {
        let publisher =
            MastodonPublisher::new(MastodonConfig::new("https://example.social/", "token")).unwrap();
        assert_eq!(publisher.statuses_url(), "https://example.social/api/v1/statuses");
    }

    #[test]
    fn new_status_body() {
        let parent = MessageHandle::new("109");
        let body = serde_json::to_value(NewStatus {
            status: "passing Cark",
            in_reply_to_id: Some(parent.as_str()),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "passing Cark", "in_reply_to_id": "109"})
        );

        let body = serde_json::to_value(NewStatus {
            status: "leaving",
            in_reply_to_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "leaving"}));
    }
}
