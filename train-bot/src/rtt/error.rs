//! RTT client error types.

use std::fmt;

/// Errors from the RTT HTTP client.
#[derive(Debug)]
pub enum RttError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    Api { status: u16, message: String },

    /// Rate limited by the API
    RateLimited,

    /// Bad username or password
    Unauthorized,
}

impl fmt::Display for RttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RttError::Http(e) => write!(f, "HTTP error: {e}"),
            RttError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            RttError::Api { status, message } => write!(f, "API error {status}: {message}"),
            RttError::RateLimited => write!(f, "rate limited by RTT API"),
            RttError::Unauthorized => write!(f, "unauthorized (check RTT credentials)"),
        }
    }
}

impl std::error::Error for RttError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RttError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RttError {
    fn from(err: reqwest::Error) -> Self {
        RttError::Http(err)
    }
}
