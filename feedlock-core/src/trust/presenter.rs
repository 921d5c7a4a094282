//! Presenter boundary - the abstract UI that shows a trust request.
//!
//! Rendering lives outside this core. Implementations show the request's
//! keys (fingerprint, claimed identity, advisory hint) and come back with
//! the subset the user chose to trust, or a cancellation.

use crate::trust::key::Fingerprint;
use crate::trust::signature::TrustRequest;
use anyhow::Result;
use async_trait::async_trait;

/// The user's answer to a presented trust request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Trust these fingerprints (possibly none of them)
    Trust(Vec<Fingerprint>),

    /// Dismissed without a decision
    Cancelled,
}

/// Abstract UI for trust confirmation.
///
/// `present` suspends the asking feed's processing until the user decides;
/// the queue guarantees at most one request is presented at a time and that
/// no request is presented twice.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, request: &TrustRequest) -> Result<Verdict>;
}
