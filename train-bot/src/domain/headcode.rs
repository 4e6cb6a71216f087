//! Train headcode (train identity) type.

use std::fmt;

/// A validated train headcode, as reported in RTT's `trainIdentity`.
///
/// Standard UK headcodes are digit, letter, two digits (e.g. "2C47").
/// Non-standard identities (charters, light engines) parse to `None`
/// rather than an error: they are not invalid, just not announceable.
///
/// ```
/// use train_bot::domain::Headcode;
///
/// assert_eq!(Headcode::parse("2C47").unwrap().as_str(), "2C47");
/// assert!(Headcode::parse("ABCD").is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Headcode([u8; 4]);

impl Headcode {
    /// Parse a headcode, returning `None` for non-standard formats.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return None;
        }

        let standard = bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_uppercase()
            && bytes[2].is_ascii_digit()
            && bytes[3].is_ascii_digit();

        standard.then(|| Headcode([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Returns the headcode as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Debug for Headcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Headcode({})", self.as_str())
    }
}

impl fmt::Display for Headcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn standard_roundtrip(s in "[0-9][A-Z][0-9]{2}") {
            let hc = Headcode::parse(&s).unwrap();
            prop_assert_eq!(hc.as_str(), s.as_str());
        }
    }
}
