//! Signing-key identity: fingerprints and the advisory hints table.

use crate::trust::error::TrustError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A 40-hex-digit key fingerprint, stored uppercase.
///
/// The canonical display form groups the digits in 4-character blocks so a
/// user can compare it against an out-of-band announcement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(raw: &str) -> Result<Self, TrustError> {
        let raw = raw.trim();
        if raw.len() != 40 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TrustError::MalformedFingerprint {
                fingerprint: raw.to_string(),
            });
        }
        Ok(Fingerprint(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form grouped in 4-character blocks: `1234 5678 ...`
    pub fn pretty(&self) -> String {
        self.0
            .as_bytes()
            .chunks(4)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = TrustError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Fingerprint::new(&raw)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> String {
        fingerprint.0
    }
}

/// Fallback hint shown when the table knows nothing about a key
pub const UNKNOWN_KEY_HINT: &str = "Warning: Nothing known about this key!";

// Informational only: hints never affect trust decisions.
static KEY_HINTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "92429807C9853C0744A68B9AAE07828059A53CC1",
            "This key signs updates to the feedlock tool itself; you should accept it.",
        ),
        (
            "617794D7C3DFE0FFF572065C0529FDB71FB13910",
            "This low-security key signs feeds generated automatically by a script. \
             The upstream software shipped without a signature, so the script's \
             signature only proves the archive was not modified after import.",
        ),
    ])
});

/// Advisory hint for a fingerprint, from the static table
pub fn hint_for(fingerprint: &Fingerprint) -> &'static str {
    KEY_HINTS
        .get(fingerprint.as_str())
        .copied()
        .unwrap_or(UNKNOWN_KEY_HINT)
}
