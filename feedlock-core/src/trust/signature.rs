//! Signature classification results and trust confirmation requests.
//!
//! Signature verification itself happens elsewhere; this module consumes
//! its classified output. Only [`SignatureRecord::Valid`] records take part
//! in trust decisions - the rest exist so callers can report what they saw.

use crate::trust::error::TrustError;
use crate::trust::key::{hint_for, Fingerprint};

/// Placeholder identity when the verification details name nobody
pub const UNKNOWN_IDENTITY: &str = "<unknown>";

/// A cryptographically valid signature over a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSignature {
    /// Fingerprint of the signing key
    pub fingerprint: Fingerprint,

    /// Structured verification detail rows (colon-format key listing);
    /// consulted only for display
    pub details: Vec<Vec<String>>,
}

impl ValidSignature {
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            details: Vec::new(),
        }
    }

    /// The identity the key claims for itself, from the detail rows.
    ///
    /// Takes field 9 of the first `pub` or `uid` row wide enough to carry
    /// one. Purely informational; trust semantics never consult it.
    pub fn claimed_identity(&self) -> &str {
        self.details
            .iter()
            .find(|row| {
                row.first().is_some_and(|tag| tag == "pub" || tag == "uid") && row.len() >= 10
            })
            .map(|row| row[9].as_str())
            .unwrap_or(UNKNOWN_IDENTITY)
    }
}

/// Outcome of checking one signature on a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureRecord {
    /// Signature verified against a known key
    Valid(ValidSignature),

    /// Signature did not verify
    Invalid { fingerprint: Option<Fingerprint> },

    /// Verification could not be carried out (missing key, bad data)
    Unverifiable { reason: String },
}

/// Everything a key needs to be shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDisplay<'a> {
    pub fingerprint: &'a Fingerprint,
    pub claimed_identity: &'a str,
    pub hint: &'static str,
}

/// One pending "do you trust these keys for this feed?" decision.
///
/// Immutable after construction; only its queue position changes.
#[derive(Debug, Clone)]
pub struct TrustRequest {
    /// Interface the feed claims to describe
    pub interface_uri: String,

    /// The raw feed bytes, retained so trust can be re-verified after the
    /// store changes
    pub feed_data: Vec<u8>,

    /// The valid signatures, in the order verification reported them
    valid: Vec<ValidSignature>,
}

impl TrustRequest {
    /// Build a request from classified signature results.
    ///
    /// Fails with a recoverable error when no record is `Valid`: there is
    /// nothing a user could meaningfully confirm.
    pub fn new(
        interface_uri: impl Into<String>,
        feed_data: Vec<u8>,
        records: Vec<SignatureRecord>,
    ) -> Result<Self, TrustError> {
        let interface_uri = interface_uri.into();
        let valid: Vec<ValidSignature> = records
            .into_iter()
            .filter_map(|record| match record {
                SignatureRecord::Valid(signature) => Some(signature),
                _ => None,
            })
            .collect();

        if valid.is_empty() {
            return Err(TrustError::NoValidSignatures { uri: interface_uri });
        }

        Ok(Self {
            interface_uri,
            feed_data,
            valid,
        })
    }

    /// The valid signatures this decision is about
    pub fn valid_signatures(&self) -> &[ValidSignature] {
        &self.valid
    }

    /// True if `fingerprint` belongs to one of the valid signatures
    pub fn involves(&self, fingerprint: &Fingerprint) -> bool {
        self.valid.iter().any(|s| &s.fingerprint == fingerprint)
    }

    /// Display rows for the presenter, pairing each key with its claimed
    /// identity and advisory hint
    pub fn display_keys(&self) -> Vec<KeyDisplay<'_>> {
        self.valid
            .iter()
            .map(|signature| KeyDisplay {
                fingerprint: &signature.fingerprint,
                claimed_identity: signature.claimed_identity(),
                hint: hint_for(&signature.fingerprint),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::key::UNKNOWN_KEY_HINT;

    fn fp(seed: char) -> Fingerprint {
        Fingerprint::new(&seed.to_string().repeat(40)).unwrap()
    }

    fn uid_row(name: &str) -> Vec<String> {
        let mut row = vec![String::new(); 10];
        row[0] = "uid".to_string();
        row[9] = name.to_string();
        row
    }

    #[test]
    fn test_claimed_identity_from_uid_row() {
        let mut signature = ValidSignature::new(fp('a'));
        signature.details = vec![
            vec!["tru".to_string()],
            uid_row("Alice Example <alice@example.com>"),
        ];
        assert_eq!(
            signature.claimed_identity(),
            "Alice Example <alice@example.com>"
        );
    }

    #[test]
    fn test_claimed_identity_skips_short_rows() {
        let mut signature = ValidSignature::new(fp('a'));
        signature.details = vec![vec!["uid".to_string(), "too-short".to_string()]];
        assert_eq!(signature.claimed_identity(), UNKNOWN_IDENTITY);
    }

    #[test]
    fn test_claimed_identity_accepts_pub_row() {
        let mut signature = ValidSignature::new(fp('a'));
        let mut row = uid_row("Packager");
        row[0] = "pub".to_string();
        signature.details = vec![row];
        assert_eq!(signature.claimed_identity(), "Packager");
    }

    #[test]
    fn test_request_requires_a_valid_signature() {
        let result = TrustRequest::new(
            "http://example.com/app",
            b"<feed/>".to_vec(),
            vec![
                SignatureRecord::Invalid { fingerprint: None },
                SignatureRecord::Unverifiable {
                    reason: "unknown key".to_string(),
                },
            ],
        );
        assert!(matches!(
            result,
            Err(TrustError::NoValidSignatures { uri }) if uri == "http://example.com/app"
        ));
    }

    #[test]
    fn test_request_keeps_only_valid_records_in_order() {
        let request = TrustRequest::new(
            "http://example.com/app",
            b"<feed/>".to_vec(),
            vec![
                SignatureRecord::Valid(ValidSignature::new(fp('a'))),
                SignatureRecord::Invalid { fingerprint: Some(fp('b')) },
                SignatureRecord::Valid(ValidSignature::new(fp('c'))),
            ],
        )
        .unwrap();

        let fingerprints: Vec<&Fingerprint> = request
            .valid_signatures()
            .iter()
            .map(|s| &s.fingerprint)
            .collect();
        assert_eq!(fingerprints, vec![&fp('a'), &fp('c')]);
        assert!(request.involves(&fp('a')));
        assert!(!request.involves(&fp('b')));
    }

    #[test]
    fn test_display_keys_pair_identity_and_hint() {
        let mut signature = ValidSignature::new(fp('a'));
        signature.details = vec![uid_row("Alice")];
        let request = TrustRequest::new(
            "http://example.com/app",
            Vec::new(),
            vec![SignatureRecord::Valid(signature)],
        )
        .unwrap();

        let keys = request.display_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].claimed_identity, "Alice");
        assert_eq!(keys[0].hint, UNKNOWN_KEY_HINT);
    }
}
