//! Four-part package versions (`major.minor.build.revision`)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppxError, Result};

/// A package version as written in a manifest `Version` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PackageVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl PackageVersion {
    /// Create a version from its four components
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

impl FromStr for PackageVersion {
    type Err = AppxError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 4 {
            return Err(AppxError::InvalidVersion(format!(
                "expected four components, got '{}'",
                s
            )));
        }

        let mut fields = [0u16; 4];
        for (field, part) in fields.iter_mut().zip(&parts) {
            *field = part
                .parse()
                .map_err(|_| AppxError::InvalidVersion(format!("bad component '{}' in '{}'", part, s)))?;
        }

        Ok(Self::new(fields[0], fields[1], fields[2], fields[3]))
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let version: PackageVersion = "10.0.19041.1".parse().unwrap();
        assert_eq!(version, PackageVersion::new(10, 0, 19041, 1));
        assert_eq!(version.to_string(), "10.0.19041.1");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("1.0.0".parse::<PackageVersion>().is_err());
        assert!("1.0.0.0.0".parse::<PackageVersion>().is_err());
        assert!("1.0.x.0".parse::<PackageVersion>().is_err());
        assert!("1.0.70000.0".parse::<PackageVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        let old: PackageVersion = "1.2.3.4".parse().unwrap();
        let new: PackageVersion = "1.10.0.0".parse().unwrap();
        assert!(new > old);
        assert!(PackageVersion::new(1, 2, 3, 5) > old);
    }

    #[test]
    fn test_serializes_as_string() {
        let version = PackageVersion::new(14, 0, 30704, 0);
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"14.0.30704.0\"");
        assert_eq!(serde_json::from_str::<PackageVersion>(&json).unwrap(), version);
    }
}
