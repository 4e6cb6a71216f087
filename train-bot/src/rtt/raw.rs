//! Raw service payloads.

use crate::domain::Fingerprint;

use super::error::RttError;
use super::types::ServiceDetail;

/// A service payload as fetched, kept alongside its parsed form.
///
/// The body text is what gets fingerprinted, so two fetches compare equal
/// exactly when RTT returned the same bytes.
#[derive(Debug, Clone)]
pub struct RawService {
    fingerprint: Fingerprint,
    detail: ServiceDetail,
}

impl RawService {
    /// Parse a service response body.
    ///
    /// An empty or `null` body is treated as a no-schedule answer.
    pub fn from_body(body: impl Into<String>) -> Result<Self, RttError> {
        let body = body.into();
        let fingerprint = Fingerprint::of(&body);

        let trimmed = body.trim();
        let detail = if trimmed.is_empty() || trimmed == "null" {
            ServiceDetail::default()
        } else {
            serde_json::from_str(trimmed).map_err(|e| RttError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })?
        };

        Ok(Self {
            fingerprint,
            detail,
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn detail(&self) -> &ServiceDetail {
        &self.detail
    }

    /// True when RTT holds no schedule for the requested uid and date.
    pub fn is_no_schedule(&self) -> bool {
        self.detail.error.is_some() || self.detail.locations.is_none()
    }
}
