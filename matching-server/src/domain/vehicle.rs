//! Vehicle type codes.

use std::fmt;

/// Error returned when parsing an invalid vehicle type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid vehicle type: {reason}")]
pub struct InvalidVehicleType {
    reason: &'static str,
}

/// A vehicle class such as `sedan`, `suv` or `luxury`.
///
/// Vehicle types are lowercase ASCII letters, digits, `_` or `-`, at most
/// 32 bytes long. Matching compares them for exact equality.
///
/// # Examples
///
/// ```
/// use matching_server::domain::VehicleType;
///
/// let sedan = VehicleType::parse("sedan").unwrap();
/// assert_eq!(sedan.as_str(), "sedan");
///
/// // Uppercase is rejected by `parse` but accepted by `parse_normalized`
/// assert!(VehicleType::parse("Sedan").is_err());
/// assert_eq!(VehicleType::parse_normalized(" Sedan ").unwrap(), sedan);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VehicleType(String);

impl VehicleType {
    /// Parse a vehicle type, which must already be in canonical form.
    pub fn parse(s: &str) -> Result<Self, InvalidVehicleType> {
        if s.is_empty() {
            return Err(InvalidVehicleType {
                reason: "cannot be empty",
            });
        }
        if s.len() > 32 {
            return Err(InvalidVehicleType {
                reason: "longer than 32 bytes",
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
        {
            return Err(InvalidVehicleType {
                reason: "must be lowercase ASCII letters, digits, '_' or '-'",
            });
        }
        Ok(VehicleType(s.to_string()))
    }

    /// Parse after trimming whitespace and lowercasing.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidVehicleType> {
        Self::parse(&s.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VehicleType({})", self.0)
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        assert!(VehicleType::parse("sedan").is_ok());
        assert!(VehicleType::parse("suv_xl").is_ok());
        assert!(VehicleType::parse("van-7").is_ok());
    }

    #[test]
    fn reject_invalid() {
        assert!(VehicleType::parse("").is_err());
        assert!(VehicleType::parse("Sedan").is_err());
        assert!(VehicleType::parse("big car").is_err());
        assert!(VehicleType::parse(&"a".repeat(33)).is_err());
    }

    #[test]
    fn normalized() {
        let v = VehicleType::parse_normalized("  LUXURY\t").unwrap();
        assert_eq!(v.as_str(), "luxury");
        assert!(VehicleType::parse_normalized("   ").is_err());
    }
}
