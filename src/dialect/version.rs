//! Database product versions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sql::error::DialectError;

/// A database product version, ordered by (major, minor, micro)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseVersion {
    major: u16,
    minor: u16,
    micro: u16,
}

impl DatabaseVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self {
            major,
            minor,
            micro: 0,
        }
    }

    pub const fn with_micro(major: u16, minor: u16, micro: u16) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }

    pub fn micro(&self) -> u16 {
        self.micro
    }

    /// True when this version is strictly older than `other`
    ///
    /// ```
    /// use ormdialect::DatabaseVersion;
    ///
    /// let v = DatabaseVersion::new(9, 2);
    /// assert!(v.is_before((9, 3)));
    /// assert!(v.is_before(10));
    /// ```
    pub fn is_before(&self, other: impl Into<DatabaseVersion>) -> bool {
        *self < other.into()
    }

    /// True when this version is `other` or newer
    pub fn is_since(&self, other: impl Into<DatabaseVersion>) -> bool {
        *self >= other.into()
    }
}

impl From<u16> for DatabaseVersion {
    fn from(major: u16) -> Self {
        DatabaseVersion::new(major, 0)
    }
}

impl From<(u16, u16)> for DatabaseVersion {
    fn from((major, minor): (u16, u16)) -> Self {
        DatabaseVersion::new(major, minor)
    }
}

impl From<(u16, u16, u16)> for DatabaseVersion {
    fn from((major, minor, micro): (u16, u16, u16)) -> Self {
        DatabaseVersion::with_micro(major, minor, micro)
    }
}

impl fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.micro == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
        }
    }
}

impl FromStr for DatabaseVersion {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DialectError::InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(invalid)?
            .parse::<u16>()
            .map_err(|_| invalid())?;
        let mut component = || -> Result<u16, DialectError> {
            match parts.next() {
                Some(p) => p.parse::<u16>().map_err(|_| invalid()),
                None => Ok(0),
            }
        };
        let minor = component()?;
        let micro = component()?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(DatabaseVersion::with_micro(major, minor, micro))
    }
}

impl TryFrom<String> for DatabaseVersion {
    type Error = DialectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatabaseVersion> for String {
    fn from(version: DatabaseVersion) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let v92 = DatabaseVersion::new(9, 2);
        let v93 = DatabaseVersion::new(9, 3);
        let v10 = DatabaseVersion::from(10);
        assert!(v92 < v93);
        assert!(v93 < v10);
        assert!(v92.is_before((9, 3)));
        assert!(v93.is_since((9, 3)));
        assert!(v10.is_since(10));
        assert!(!v93.is_since(10));
    }

    #[test]
    fn test_before_and_since_are_exclusive_and_exhaustive() {
        let thresholds = [(9, 2), (9, 3), (10, 0), (11, 0)];
        for major in 8..12u16 {
            for minor in 0..5u16 {
                let v = DatabaseVersion::new(major, minor);
                for t in thresholds {
                    assert_ne!(v.is_before(t), v.is_since(t), "{} vs {:?}", v, t);
                }
            }
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("9.3".parse::<DatabaseVersion>().unwrap(), DatabaseVersion::new(9, 3));
        assert_eq!("10".parse::<DatabaseVersion>().unwrap(), DatabaseVersion::new(10, 0));
        assert_eq!(
            "3.23.1".parse::<DatabaseVersion>().unwrap(),
            DatabaseVersion::with_micro(3, 23, 1)
        );
        assert!("".parse::<DatabaseVersion>().is_err());
        assert!("9.x".parse::<DatabaseVersion>().is_err());
        assert!("1.2.3.4".parse::<DatabaseVersion>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DatabaseVersion::new(9, 2).to_string(), "9.2");
        assert_eq!(DatabaseVersion::with_micro(3, 23, 1).to_string(), "3.23.1");
    }
}
