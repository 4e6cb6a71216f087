//! Publisher error types.

use std::fmt;

/// Errors from posting a message.
#[derive(Debug)]
pub enum PublishError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// Response body was not what the platform documents
    Json {
        message: String,
        body: Option<String>,
    },

    /// Platform returned an error status code
    Api { status: u16, message: String },

    /// Rate limited by the platform
    RateLimited,

    /// Missing or revoked access token
    Unauthorized,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Http(e) => write!(f, "HTTP error: {e}"),
            PublishError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            PublishError::Api { status, message } => write!(f, "API error {status}: {message}"),
            PublishError::RateLimited => write!(f, "rate limited"),
            PublishError::Unauthorized => write!(f, "unauthorized (check access token)"),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        PublishError::Http(err)
    }
}
