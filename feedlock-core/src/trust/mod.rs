//! Trust subsystem: deciding whether the user accepts new signing keys
//! before a feed is used.
//!
//! Signature verification and key management happen in collaborators; this
//! module owns the confirmation queue, the durable record of accepted
//! fingerprints, and the boundaries those collaborators plug into.

pub mod error;
pub mod key;
pub mod presenter;
pub mod queue;
pub mod signature;
pub mod store;

pub use error::TrustError;
pub use key::{hint_for, Fingerprint, UNKNOWN_KEY_HINT};
pub use presenter::{Presenter, Verdict};
pub use queue::{Outcome, RequestHandle, ResolveReport, Resolution, TrustBroker, TrustQueue};
pub use signature::{KeyDisplay, SignatureRecord, TrustRequest, ValidSignature, UNKNOWN_IDENTITY};
pub use store::{FeedRecheck, FileTrustStore, TrustChangeSink, TrustStore, TrustSync};
