//! RTT HTTP client.
//!
//! Provides async methods for querying the Realtime Trains JSON API.
//! Handles authentication, concurrency limiting and status mapping.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Semaphore;

use crate::domain::ServiceUid;

use super::TimetableSource;
use super::error::RttError;
use super::raw::RawService;
use super::types::SearchResponse;

/// Default base URL for the RTT API.
pub const DEFAULT_BASE_URL: &str = "https://api.rtt.io/api/v1";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for the RTT client.
#[derive(Debug, Clone)]
pub struct RttConfig {
    /// API username
    pub username: String,
    /// API password
    pub password: String,
    /// Base URL for the API (defaults to production RTT)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl RttConfig {
    /// Create a new config with the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// RTT API client.
///
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
#[derive(Debug, Clone)]
pub struct RttClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    semaphore: Arc<Semaphore>,
}

impl RttClient {
    /// Create a new RTT client with the given configuration.
    pub fn new(config: RttConfig) -> Result<Self, RttError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username,
            password: config.password,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// URL for a location search, optionally filtered to trains calling
    /// at `to`.
    fn search_url(&self, station: &str, date: NaiveDate, to: Option<&str>) -> String {
        let filter = to.map(|to| format!("/to/{to}")).unwrap_or_default();
        format!(
            "{}/json/search/{}{}/{}",
            self.base_url,
            station,
            filter,
            date.format("%Y/%m/%d")
        )
    }

    /// URL for one service on one date.
    fn service_url(&self, uid: &ServiceUid, date: NaiveDate) -> String {
        format!(
            "{}/json/service/{}/{}",
            self.base_url,
            uid.as_str(),
            date.format("%Y/%m/%d")
        )
    }

    /// Issue an authenticated GET and return the body of a successful
    /// response.
    async fn get_body(&self, url: &str) -> Result<String, RttError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RttError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(RttError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RttError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RttError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.text().await?)
    }

    /// Search for services leaving `station` on `date`.
    pub async fn search(
        &self,
        station: &str,
        date: NaiveDate,
        to: Option<&str>,
    ) -> Result<SearchResponse, RttError> {
        let body = self.get_body(&self.search_url(station, date, to)).await?;

        serde_json::from_str(&body).map_err(|e| RttError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

impl TimetableSource for RttClient {
    async fn search_trains(
        &self,
        station: &str,
        date: NaiveDate,
        to: Option<&str>,
    ) -> Result<Vec<ServiceUid>, RttError> {
        let response = self.search(station, date, to).await?;
        Ok(super::service_uids(&response))
    }

    async fn fetch_service(&self, uid: &ServiceUid, date: NaiveDate) -> Result<RawService, RttError> {
        let body = self.get_body(&self.service_url(uid, date)).await?;
        RawService::from_body(body)
    }
}
