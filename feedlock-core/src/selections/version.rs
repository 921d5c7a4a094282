//! Feed version model and stability ranks.
//!
//! Feed versions are dotted unsigned-integer sequences with an optional
//! pre-release modifier (`1.2.3`, `1.0-pre3`, `2.0-rc1`, `1.4-post`).
//! They are not semver: `1.0` is a valid version and `1.0-pre` sorts
//! before `1.0`, so the domain gets its own comparable type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for version strings that do not parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version string '{0}'")]
pub struct VersionError(pub String);

/// Pre-release modifier kind, ordered by release proximity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Pre,
    Rc,
    Post,
}

impl ModifierKind {
    fn as_str(&self) -> &'static str {
        match self {
            ModifierKind::Pre => "pre",
            ModifierKind::Rc => "rc",
            ModifierKind::Post => "post",
        }
    }
}

/// A parsed, totally-ordered feed version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Dotted numeric components, most significant first
    parts: Vec<u64>,

    /// Optional modifier with optional sequence number (`pre3`, `rc1`, `post`)
    modifier: Option<(ModifierKind, Option<u64>)>,
}

impl Version {
    /// Parse a version string, failing on anything outside the feed grammar
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    /// Sort rank of the modifier: pre < rc < plain release < post
    fn modifier_rank(&self) -> u8 {
        match self.modifier {
            Some((ModifierKind::Pre, _)) => 0,
            Some((ModifierKind::Rc, _)) => 1,
            None => 2,
            Some((ModifierKind::Post, _)) => 3,
        }
    }

    fn modifier_number(&self) -> Option<u64> {
        self.modifier.and_then(|(_, n)| n)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Numeric parts compare element-wise, then by length, so `1.0` < `1.0.0`.
        self.parts
            .cmp(&other.parts)
            .then_with(|| self.modifier_rank().cmp(&other.modifier_rank()))
            .then_with(|| self.modifier_number().cmp(&other.modifier_number()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError(input.to_string()));
        }

        let (numeric, modifier) = match input.split_once('-') {
            Some((numeric, suffix)) => {
                (numeric, Some(parse_modifier(suffix).ok_or_else(|| VersionError(input.to_string()))?))
            }
            None => (input, None),
        };

        let mut parts = Vec::new();
        for piece in numeric.split('.') {
            let value: u64 = piece
                .parse()
                .map_err(|_| VersionError(input.to_string()))?;
            parts.push(value);
        }

        Ok(Version { parts, modifier })
    }
}

fn parse_modifier(suffix: &str) -> Option<(ModifierKind, Option<u64>)> {
    for kind in [ModifierKind::Pre, ModifierKind::Rc, ModifierKind::Post] {
        if let Some(rest) = suffix.strip_prefix(kind.as_str()) {
            if rest.is_empty() {
                return Some((kind, None));
            }
            if let Ok(number) = rest.parse::<u64>() {
                return Some((kind, Some(number)));
            }
        }
    }
    None
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numeric: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        write!(f, "{}", numeric.join("."))?;
        if let Some((kind, number)) = self.modifier {
            write!(f, "-{}", kind.as_str())?;
            if let Some(number) = number {
                write!(f, "{number}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ranked quality label on an implementation, used to filter candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Developer,
    Testing,
    Stable,
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stability::Developer => "developer",
            Stability::Testing => "testing",
            Stability::Stable => "stable",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_plain_versions() {
        assert_eq!(v("1").to_string(), "1");
        assert_eq!(v("1.0").to_string(), "1.0");
        assert_eq!(v("0.2.5").to_string(), "0.2.5");
    }

    #[test]
    fn test_parse_modifiers_round_trip() {
        for raw in ["1.0-pre", "1.0-pre3", "2.1-rc1", "1.4-post", "1.4-post2"] {
            assert_eq!(v(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "abc", "1..2", "1.0-", "1.0-beta", "1.0-pre-rc", "-pre"] {
            assert!(Version::parse(raw).is_err(), "should reject {raw:?}");
        }
    }

    #[test]
    fn test_ordering_numeric() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("2.0.0") > v("1.9.9"));
        assert!(v("1.0") < v("1.0.0"));
    }

    #[test]
    fn test_ordering_modifiers() {
        assert!(v("1.0-pre") < v("1.0-pre1"));
        assert!(v("1.0-pre3") < v("1.0-rc1"));
        assert!(v("1.0-rc1") < v("1.0"));
        assert!(v("1.0") < v("1.0-post"));
        assert!(v("1.0-post") < v("1.1-pre"));
    }

    #[test]
    fn test_eq_consistent_with_ordering() {
        assert_eq!(v("1.0-rc2"), v("1.0-rc2"));
        assert_ne!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1.0").cmp(&v("1.0")), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_serde_as_string() {
        let version: Version = serde_json::from_str("\"1.2-rc1\"").unwrap();
        assert_eq!(version, v("1.2-rc1"));
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.2-rc1\"");
    }

    #[test]
    fn test_stability_ranking() {
        assert!(Stability::Developer < Stability::Testing);
        assert!(Stability::Testing < Stability::Stable);
    }
}
