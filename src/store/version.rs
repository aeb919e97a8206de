//! Schema version ordering.
//!
//! Store files record the application version that last migrated them.
//! Versions follow semantic-version precedence, pre-release identifiers
//! included: `5.0.0-alpha.2 < 5.0.0-beta.3 < 5.0.0-beta.10 < 5.0.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid schema version {0:?}")]
pub struct VersionParseError(String);

/// One dot-separated pre-release identifier.
///
/// Numeric identifiers sort before alphanumeric ones, which is the variant
/// order below.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Identifier {
    Numeric(u64),
    Alpha(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Vec<Identifier>,
}

impl SchemaVersion {
    /// Version assumed for documents that record none; older than every migration.
    pub const BASELINE: SchemaVersion = SchemaVersion {
        major: 0,
        minor: 0,
        patch: 0,
        pre: Vec::new(),
    };

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        // Build metadata does not take part in precedence.
        let s_trimmed = s.trim();
        let without_build = s_trimmed.split('+').next().unwrap_or(s_trimmed);
        let (core, pre) = match without_build.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (without_build, None),
        };

        let mut parts = core.split('.');
        let mut number = || -> Result<u64, VersionParseError> {
            parts.next().ok_or_else(err)?.parse().map_err(|_| err())
        };
        let (major, minor, patch) = (number()?, number()?, number()?);
        if parts.next().is_some() {
            return Err(err());
        }

        let pre = match pre {
            None => Vec::new(),
            Some(pre) => pre
                .split('.')
                .map(|ident| {
                    if ident.is_empty() {
                        Err(err())
                    } else if ident.bytes().all(|b| b.is_ascii_digit()) {
                        ident.parse().map(Identifier::Numeric).map_err(|_| err())
                    } else {
                        Ok(Identifier::Alpha(ident.to_string()))
                    }
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                // A release outranks any of its pre-releases.
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, ident) in self.pre.iter().enumerate() {
            f.write_str(if i == 0 { "-" } else { "." })?;
            match ident {
                Identifier::Numeric(n) => write!(f, "{n}")?,
                Identifier::Alpha(s) => f.write_str(s)?,
            }
        }
        Ok(())
    }
}
