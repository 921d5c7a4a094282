//! Durable key-trust storage and the post-update synchronization boundary.
//!
//! Trust is monotonic here: keys become trusted and stay trusted; nothing
//! in this core revokes. After every resolution the queue runs exactly one
//! of two synchronization paths, chosen at construction rather than probed
//! at call time: broadcast "trust changed", or ask the interface cache to
//! re-verify the affected feed from its retained bytes.

use crate::trust::error::TrustError;
use crate::trust::key::Fingerprint;
use crate::trust::signature::TrustRequest;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Durable key-trust database
pub trait TrustStore: Send + Sync {
    /// Has the user authorized this key to sign feeds?
    fn is_trusted(&self, fingerprint: &Fingerprint) -> bool;

    /// Record the user's decision to trust this key
    fn trust_key(&self, fingerprint: &Fingerprint) -> Result<(), TrustError>;
}

/// Receives a broadcast after the trust database changes
pub trait TrustChangeSink: Send + Sync {
    fn trust_changed(&self);
}

/// Re-verifies a feed from its retained bytes against current trust state
pub trait FeedRecheck: Send + Sync {
    /// Returns whether the feed now verifies as trusted
    fn recheck(&self, request: &TrustRequest) -> Result<bool, TrustError>;
}

/// How trust updates propagate to the rest of the system.
///
/// Selected when the queue is built; there is no call-time capability
/// probing.
#[derive(Clone)]
pub enum TrustSync {
    /// The store supports change notification
    Notify(Arc<dyn TrustChangeSink>),

    /// No notification support: re-verify the affected feed directly
    Recheck(Arc<dyn FeedRecheck>),
}

/// File-backed trust store: one fingerprint per line under the config
/// directory. Lines starting with `#` and blank lines are ignored.
pub struct FileTrustStore {
    path: PathBuf,
    trusted: RwLock<BTreeSet<Fingerprint>>,
}

impl FileTrustStore {
    /// Load (or lazily start) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TrustError> {
        let path = path.into();
        let mut trusted = BTreeSet::new();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| TrustError::Store {
                path: path.clone(),
                source,
            })?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                trusted.insert(Fingerprint::new(line)?);
            }
            debug!(count = trusted.len(), path = %path.display(), "loaded trust store");
        }

        Ok(Self {
            path,
            trusted: RwLock::new(trusted),
        })
    }

    /// All trusted fingerprints, sorted
    pub fn trusted_keys(&self) -> Vec<Fingerprint> {
        match self.trusted.read() {
            Ok(trusted) => trusted.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    fn append(&self, fingerprint: &Fingerprint) -> Result<(), TrustError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| TrustError::Store {
                path: self.path.clone(),
                source,
            })?;
        }

        let mut content = if self.path.exists() {
            fs::read_to_string(&self.path).map_err(|source| TrustError::Store {
                path: self.path.clone(),
                source,
            })?
        } else {
            String::new()
        };

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(fingerprint.as_str());
        content.push('\n');

        fs::write(&self.path, content).map_err(|source| TrustError::Store {
            path: self.path.clone(),
            source,
        })
    }
}

impl TrustStore for FileTrustStore {
    fn is_trusted(&self, fingerprint: &Fingerprint) -> bool {
        match self.trusted.read() {
            Ok(trusted) => trusted.contains(fingerprint),
            Err(poisoned) => poisoned.into_inner().contains(fingerprint),
        }
    }

    fn trust_key(&self, fingerprint: &Fingerprint) -> Result<(), TrustError> {
        {
            let mut trusted = match self.trusted.write() {
                Ok(trusted) => trusted,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !trusted.insert(fingerprint.clone()) {
                return Ok(());
            }
        }

        self.append(fingerprint)?;
        info!(target: "security", key = %fingerprint, "key marked trusted");
        Ok(())
    }
}
