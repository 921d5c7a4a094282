//! Catalog and store boundaries.
//!
//! The implementation catalog answers "what versions exist for this feed";
//! the implementation store answers "is this implementation cached locally".
//! Both are collaborators: resolution and downloading happen elsewhere.

use crate::selections::version::{Stability, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One implementation known for a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationInfo {
    /// Content-derived or package-manager id
    pub id: String,

    /// Implementation version
    pub version: Version,

    /// Declared stability rank
    pub stability: Stability,
}

/// Read-only view of the implementations known for each feed
pub trait ImplementationCatalog: Send + Sync {
    /// All implementations known for `interface_uri`, any order
    fn implementations(&self, interface_uri: &str) -> Vec<ImplementationInfo>;

    /// Replacement interface announced by the feed, if any
    fn replaced_by(&self, _interface_uri: &str) -> Option<String> {
        None
    }
}

/// Local availability checks for non-package-managed implementations
pub trait ImplementationStore: Send + Sync {
    /// True if the implementation is present in a local store
    fn is_available(&self, implementation_id: &str) -> bool;
}

/// Errors loading a catalog snapshot file
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-feed entry in a catalog snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFeed {
    /// Interface this feed has been replaced by, when announced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,

    /// Implementations the feed declares
    #[serde(default)]
    pub implementations: Vec<ImplementationInfo>,
}

/// A catalog backed by a JSON snapshot of feed metadata.
///
/// The snapshot is produced by the fetch/solve stages; this core only reads
/// it to compute upgrade advisories and replacement warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonCatalog {
    /// Feed metadata keyed by interface URI
    #[serde(default)]
    pub feeds: BTreeMap<String, CatalogFeed>,
}

impl JsonCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Store that answers availability by directory presence under one root.
///
/// Implementation ids double as directory names in a local store, so a
/// cached implementation is simply a directory that exists.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where an implementation would live if cached
    pub fn path_of(&self, implementation_id: &str) -> PathBuf {
        self.root.join(implementation_id)
    }
}

impl ImplementationStore for DirectoryStore {
    fn is_available(&self, implementation_id: &str) -> bool {
        self.path_of(implementation_id).is_dir()
    }
}

impl ImplementationCatalog for JsonCatalog {
    fn implementations(&self, interface_uri: &str) -> Vec<ImplementationInfo> {
        self.feeds
            .get(interface_uri)
            .map(|feed| feed.implementations.clone())
            .unwrap_or_default()
    }

    fn replaced_by(&self, interface_uri: &str) -> Option<String> {
        self.feeds.get(interface_uri)?.replaced_by.clone()
    }
}
