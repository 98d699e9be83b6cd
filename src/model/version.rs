// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Versions and version ranges
//!
//! Versions follow the `major.minor.micro.qualifier` scheme. Missing numeric
//! segments default to zero, so `1`, `1.0` and `1.0.0` are the same version.
//! Ordering is numeric on the three segments, then lexicographic on the
//! qualifier (an empty qualifier sorts first).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when a version or range string is malformed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid version '{input}': {reason}")]
pub struct VersionError {
    /// The text that failed to parse
    pub input: String,
    /// Why it was rejected
    pub reason: String,
}

impl VersionError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A totally ordered component version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    micro: u32,
    qualifier: String,
}

impl Version {
    /// Create a version without qualifier
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Create a version with a qualifier
    pub fn with_qualifier(major: u32, minor: u32, micro: u32, qualifier: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: qualifier.into(),
        }
    }

    /// The lowest possible version, `0.0.0`
    pub fn empty() -> Self {
        Self::new(0, 0, 0)
    }

    /// Parse a version string such as `1.2.3.v2024`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(VersionError::new(input, "empty version"));
        }

        let mut parts = text.splitn(4, '.');
        let mut numbers = [0u32; 3];
        for (slot, number) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(segment) => {
                    *number = segment.parse().map_err(|_| {
                        VersionError::new(input, format!("segment {} is not a number", slot + 1))
                    })?;
                }
                None => break,
            }
        }

        let qualifier = parts.next().unwrap_or_default();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(VersionError::new(input, "qualifier contains invalid characters"));
        }

        Ok(Self::with_qualifier(
            numbers[0], numbers[1], numbers[2], qualifier,
        ))
    }

    /// Major segment
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Minor segment
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Micro segment
    pub fn micro(&self) -> u32 {
        self.micro
    }

    /// Qualifier, empty when absent
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// An interval of versions
///
/// A bare version such as `1.0` means "that version or anything newer".
/// Bracketed forms (`[1.0,2.0)`, `(1.0,2.0]`) bound both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    minimum: Version,
    include_minimum: bool,
    maximum: Option<Version>,
    include_maximum: bool,
}

impl VersionRange {
    /// Range containing every version
    pub fn any() -> Self {
        Self::at_least(Version::empty())
    }

    /// `[minimum, ∞)`
    pub fn at_least(minimum: Version) -> Self {
        Self {
            minimum,
            include_minimum: true,
            maximum: None,
            include_maximum: false,
        }
    }

    /// `[version, version]`
    pub fn exact(version: Version) -> Self {
        Self {
            minimum: version.clone(),
            include_minimum: true,
            maximum: Some(version),
            include_maximum: true,
        }
    }

    /// Bounded range with explicit inclusivity
    pub fn between(
        minimum: Version,
        include_minimum: bool,
        maximum: Version,
        include_maximum: bool,
    ) -> Result<Self, VersionError> {
        if maximum < minimum {
            return Err(VersionError::new(
                &format!("{minimum},{maximum}"),
                "maximum is lower than minimum",
            ));
        }
        Ok(Self {
            minimum,
            include_minimum,
            maximum: Some(maximum),
            include_maximum,
        })
    }

    /// Parse `[a,b)`, `(a,b]`, `[a,b]`, `(a,b)` or a bare version
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let text = input.trim();
        let Some(first) = text.chars().next() else {
            return Err(VersionError::new(input, "empty range"));
        };

        if first != '[' && first != '(' {
            return Ok(Self::at_least(Version::parse(text)?));
        }

        let last = text.chars().last().unwrap_or(first);
        if last != ']' && last != ')' {
            return Err(VersionError::new(input, "range must end with ']' or ')'"));
        }

        let body = &text[1..text.len() - 1];
        let (low, high) = body
            .split_once(',')
            .ok_or_else(|| VersionError::new(input, "range requires two versions"))?;

        Self::between(
            Version::parse(low)?,
            first == '[',
            Version::parse(high)?,
            last == ']',
        )
        .map_err(|e| VersionError::new(input, e.reason))
    }

    /// Whether `version` falls inside this range
    pub fn includes(&self, version: &Version) -> bool {
        let above = if self.include_minimum {
            version >= &self.minimum
        } else {
            version > &self.minimum
        };
        if !above {
            return false;
        }
        match &self.maximum {
            None => true,
            Some(max) if self.include_maximum => version <= max,
            Some(max) => version < max,
        }
    }

    /// Lower bound
    pub fn minimum(&self) -> &Version {
        &self.minimum
    }

    /// Upper bound, `None` when unbounded
    pub fn maximum(&self) -> Option<&Version> {
        self.maximum.as_ref()
    }

    /// Whether the lower bound is inclusive
    pub fn include_minimum(&self) -> bool {
        self.include_minimum
    }

    /// Whether the upper bound is inclusive
    pub fn include_maximum(&self) -> bool {
        self.include_maximum
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.maximum {
            None if self.include_minimum => write!(f, "{}", self.minimum),
            None => write!(f, "({},)", self.minimum),
            Some(max) => write!(
                f,
                "{}{},{}{}",
                if self.include_minimum { '[' } else { '(' },
                self.minimum,
                max,
                if self.include_maximum { ']' } else { ')' }
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing_fills_missing_segments() {
        assert_eq!(Version::parse("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(Version::parse("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(
            Version::parse("1.2.3.v20240101").unwrap(),
            Version::with_qualifier(1, 2, 3, "v20240101")
        );
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_version_ordering() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.0.0") < v("1.0.0.a"));
        assert!(v("1.0.0.a") < v("1.0.0.b"));
        assert_eq!(v("1.0").to_string(), "1.0.0");
    }

    #[test]
    fn test_range_includes() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.includes(&Version::new(1, 0, 0)));
        assert!(range.includes(&Version::new(1, 9, 9)));
        assert!(!range.includes(&Version::new(2, 0, 0)));

        let open = VersionRange::parse("(1.0,2.0]").unwrap();
        assert!(!open.includes(&Version::new(1, 0, 0)));
        assert!(open.includes(&Version::new(2, 0, 0)));

        let bare = VersionRange::parse("1.5").unwrap();
        assert!(bare.includes(&Version::new(99, 0, 0)));
        assert!(!bare.includes(&Version::new(1, 4, 0)));
    }

    #[test]
    fn test_range_display_round_trips() {
        for text in ["[1.0.0,2.0.0)", "(1.0.0,2.0.0]", "1.5.0"] {
            let range = VersionRange::parse(text).unwrap();
            assert_eq!(range.to_string(), text);
            assert_eq!(VersionRange::parse(&range.to_string()).unwrap(), range);
        }
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(VersionRange::parse("[2.0,1.0]").is_err());
        assert!(VersionRange::parse("[1.0").is_err());
    }
}
