//! Station code types.

use std::fmt;

/// Error returned when parsing an invalid CRS code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CRS code: {reason}")]
pub struct InvalidCrs {
    reason: &'static str,
}

/// A valid 3-letter CRS (Computer Reservation System) station code.
///
/// RTT only attaches a CRS code to locations that are passenger stations;
/// junctions and other timing points carry a TIPLOC and a description but
/// no code. Any `Crs` value is valid by construction.
///
/// # Examples
///
/// ```
/// use train_bot::domain::Crs;
///
/// let cak = Crs::parse("CAK").unwrap();
/// assert_eq!(cak.as_str(), "CAK");
///
/// assert!(Crs::parse("cak").is_err());
/// assert_eq!(Crs::parse_normalized(" cak ").unwrap(), cak);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Crs([u8; 3]);

impl Crs {
    /// Parse a CRS code from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidCrs> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidCrs {
                reason: "must be exactly 3 characters",
            });
        }

        if !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(InvalidCrs {
                reason: "must be uppercase ASCII letters A-Z",
            });
        }

        Ok(Crs([bytes[0], bytes[1], bytes[2]]))
    }

    /// Parse a CRS code after trimming whitespace and uppercasing.
    ///
    /// Used for codes typed into configuration files.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidCrs> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the CRS code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII uppercase letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crs({})", self.as_str())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_crs() {
        assert!(Crs::parse("CAK").is_ok());
        assert!(Crs::parse("LAN").is_ok());
        assert!(Crs::parse("BIF").is_ok());
    }

    #[test]
    fn reject_lowercase() {
        assert!(Crs::parse("cak").is_err());
        assert!(Crs::parse("Cak").is_err());
    }

    #[test]
    fn reject_wrong_length() {
        assert!(Crs::parse("").is_err());
        assert!(Crs::parse("CA").is_err());
        assert!(Crs::parse("CARK").is_err());
        // TIPLOCs are not CRS codes
        assert!(Crs::parse("CREWSYC").is_err());
    }

    #[test]
    fn reject_non_letters() {
        assert!(Crs::parse("C1K").is_err());
        assert!(Crs::parse("C K").is_err());
        assert!(Crs::parse("CÄK").is_err());
    }

    #[test]
    fn parse_normalized_trims_and_uppercases() {
        assert_eq!(Crs::parse_normalized(" cak\n").unwrap().as_str(), "CAK");
        assert!(Crs::parse_normalized("ca k").is_err());
    }

    #[test]
    fn display_and_debug() {
        let crs = Crs::parse("GOS").unwrap();
        assert_eq!(crs.to_string(), "GOS");
        assert_eq!(format!("{:?}", crs), "Crs(GOS)");
    }
}
