//! Selection sets - the recorded outcome of a dependency resolution.
//!
//! A [`SelectionSet`] maps each interface URI to the implementation chosen
//! for it. Sets are produced by the solver or loaded from an app's stored
//! state, and are treated as immutable once handed to reconciliation.
//! The on-disk form is an opaque blob to everything but this module; it must
//! round-trip to structurally-equal data so reconciliation's equality check
//! stays meaningful.

use crate::selections::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Implementation ids with this prefix are managed by a distribution
/// package manager and skip local-store availability checks.
pub const PACKAGE_PREFIX: &str = "package:";

/// Errors while persisting or loading a selection set
#[derive(Error, Debug)]
pub enum SelectionsError {
    #[error("failed to read selections from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse selections in {path} (corrupted or invalid format)")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write selections to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize selections")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

/// The implementation chosen for one interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Interface this selection satisfies
    pub interface_uri: String,

    /// Content-derived id, or `package:`-prefixed for distribution packages
    pub implementation_id: String,

    /// Version of the chosen implementation
    pub version: Version,

    /// Content digest or package reference, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Command line used to run the implementation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Additional metadata carried through verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl SelectionEntry {
    pub fn new(interface_uri: impl Into<String>, implementation_id: impl Into<String>, version: Version) -> Self {
        Self {
            interface_uri: interface_uri.into(),
            implementation_id: implementation_id.into(),
            version,
            digest: None,
            command: None,
            extra: BTreeMap::new(),
        }
    }

    /// True if this implementation is owned by a distribution package manager
    pub fn is_package_managed(&self) -> bool {
        self.implementation_id.starts_with(PACKAGE_PREFIX)
    }
}

/// Everything selected for one root interface, keyed by interface URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    /// The interface the user asked for
    pub root_interface: String,

    /// Chosen implementation per interface; BTreeMap keeps iteration sorted
    pub entries: BTreeMap<String, SelectionEntry>,
}

impl SelectionSet {
    /// Create an empty set for a root interface
    pub fn empty(root_interface: impl Into<String>) -> Self {
        Self {
            root_interface: root_interface.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Insert a selection under its own interface URI
    pub fn insert(&mut self, entry: SelectionEntry) {
        self.entries.insert(entry.interface_uri.clone(), entry);
    }

    /// The entry selected for the root interface, if any
    pub fn root_entry(&self) -> Option<&SelectionEntry> {
        self.entries.get(&self.root_interface)
    }

    /// Load a set from its durable form
    pub fn load(path: &Path) -> Result<Self, SelectionsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SelectionsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SelectionsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrite the durable form at `path`.
    ///
    /// Not transactional: a crash mid-write can leave a corrupt file behind.
    pub fn save(&self, path: &Path) -> Result<(), SelectionsError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|source| SelectionsError::Serialize { source })?;
        std::fs::write(path, content).map_err(|source| SelectionsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Structural equality over the full serialized form.
    ///
    /// Compares attribute content, not attribute order, so two sets that
    /// round-trip through storage compare equal.
    pub fn structurally_equal(&self, other: &SelectionSet) -> bool {
        match (serde_json::to_value(self), serde_json::to_value(other)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry(uri: &str, version: &str) -> SelectionEntry {
        SelectionEntry::new(uri, format!("sha256=id-{uri}"), Version::parse(version).unwrap())
    }

    fn sample() -> SelectionSet {
        let mut set = SelectionSet::empty("http://example.com/app");
        set.insert(entry("http://example.com/app", "1.0"));
        set.insert(entry("http://example.com/lib", "0.3.2"));
        set
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("selections.json");

        let set = sample();
        set.save(&path).unwrap();
        let loaded = SelectionSet::load(&path).unwrap();

        assert_eq!(set, loaded);
        assert!(set.structurally_equal(&loaded));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let result = SelectionSet::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SelectionsError::Read { .. })));
    }

    #[test]
    fn test_load_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("selections.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = SelectionSet::load(&path);
        assert!(matches!(result, Err(SelectionsError::Parse { .. })));
    }

    #[test]
    fn test_structural_equality_sees_command_change() {
        let a = sample();
        let mut b = sample();
        b.entries
            .get_mut("http://example.com/app")
            .unwrap()
            .command = Some("run --fast".to_string());

        assert!(!a.structurally_equal(&b));
    }

    #[test]
    fn test_package_managed_detection() {
        let mut entry = entry("http://example.com/tool", "2.0");
        assert!(!entry.is_package_managed());

        entry.implementation_id = "package:deb:tool:2.0".to_string();
        assert!(entry.is_package_managed());
    }

    #[test]
    fn test_root_entry() {
        let set = sample();
        assert_eq!(
            set.root_entry().map(|e| e.interface_uri.as_str()),
            Some("http://example.com/app")
        );

        let empty = SelectionSet::empty("http://example.com/other");
        assert!(empty.root_entry().is_none());
    }
}
