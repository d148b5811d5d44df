use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Minimum OS version, `major[.minor[.patch]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl MinVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: None,
        }
    }
}

/// Always at least `major.minor`; the patch level is kept only when given.
impl fmt::Display for MinVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        Ok(())
    }
}

impl FromStr for MinVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |detail| Error::InvalidVersion {
            version: s.to_string(),
            detail,
        };

        if s.is_empty() {
            return Err(invalid("empty version"));
        }

        let mut parts = [None; 3];
        for (i, component) in s.split('.').enumerate() {
            if i >= parts.len() {
                return Err(invalid("at most three components are allowed"));
            }
            // u32::from_str accepts a leading '+', which is not a version.
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("components must be non-empty decimal numbers"));
            }
            let value = component
                .parse::<u32>()
                .map_err(|_| invalid("component out of range"))?;
            parts[i] = Some(value);
        }

        Ok(MinVersion {
            major: parts[0].unwrap_or(0),
            minor: parts[1].unwrap_or(0),
            patch: parts[2],
        })
    }
}
