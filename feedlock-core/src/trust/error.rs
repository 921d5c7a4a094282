//! Trust subsystem error types.
//!
//! Two families: user-facing errors (bad input, cancelled confirmations,
//! store I/O) that callers report and recover from, and invariant
//! violations that indicate a defect and must propagate after being
//! surfaced. [`TrustError::is_fatal`] is the classification boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrustError {
    /// Feed carried no cryptographically valid signature to decide on
    #[error("no valid signatures found for {uri}")]
    NoValidSignatures { uri: String },

    /// A fingerprint failed the 40-hex-digit shape check
    #[error("malformed key fingerprint '{fingerprint}'")]
    MalformedFingerprint { fingerprint: String },

    /// Durable trust store could not be read or written
    #[error("trust store error at {path}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The presenter collaborator failed while showing a request
    #[error("presenter failed for {uri}")]
    Presenter {
        uri: String,
        #[source]
        source: anyhow::Error,
    },

    /// The confirmation queue was torn down while this request waited
    #[error("trust confirmation interrupted for {uri}")]
    Interrupted { uri: String },

    /// Keys were trusted but re-verification still reports the feed
    /// untrusted. Invariant violation, not bad input.
    #[error("trust update had no effect: {uri} still fails verification")]
    TrustUpdateIneffective { uri: String },

    /// A request other than the active head was resolved. Programming
    /// error in the caller.
    #[error("resolved trust request {handle} which is not the active request")]
    ResolveNotActive { handle: u64 },
}

impl TrustError {
    /// True for broken-invariant errors that must propagate rather than be
    /// reported and absorbed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrustError::TrustUpdateIneffective { .. } | TrustError::ResolveNotActive { .. }
        )
    }

    /// Log invariant violations on the security target before they propagate
    pub fn log_if_fatal(&self) {
        if self.is_fatal() {
            tracing::error!(target: "security", "TRUST INVARIANT VIOLATION: {}", self);
        }
    }
}
