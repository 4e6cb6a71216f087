//! RTT service UID type.

use std::fmt;

/// Error returned when parsing an invalid service UID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid service UID: {reason}")]
pub struct InvalidServiceUid {
    reason: &'static str,
}

/// An RTT service unique identifier, e.g. `H61429`.
///
/// A UID is only unique within one service date: the same UID names a
/// different run of the schedule on every day it operates. It is also
/// used as a URL path segment, so whitespace and `/` are rejected.
///
/// ```
/// use train_bot::domain::ServiceUid;
///
/// let uid = ServiceUid::new("H61429").unwrap();
/// assert_eq!(uid.as_str(), "H61429");
/// assert!(ServiceUid::new("").is_err());
/// assert!(ServiceUid::new("H6/1429").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceUid(String);

impl ServiceUid {
    /// Create a service UID, rejecting empty strings and path separators.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidServiceUid> {
        let s = s.into();
        if s.is_empty() {
            return Err(InvalidServiceUid {
                reason: "service UID cannot be empty",
            });
        }
        if s.chars().any(|c| c == '/' || c.is_whitespace()) {
            return Err(InvalidServiceUid {
                reason: "service UID cannot contain '/' or whitespace",
            });
        }
        Ok(ServiceUid(s))
    }

    /// Returns the service UID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceUid({})", self.0)
    }
}

impl fmt::Display for ServiceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn alphanumeric_always_valid(s in "[A-Z0-9]{1,8}") {
            let uid = ServiceUid::new(s.clone()).unwrap();
            prop_assert_eq!(uid.as_str(), s.as_str());
        }
    }
}
