//! Selection reconciliation - diffing a stored selection set against a
//! freshly resolved one, plus the stability-aware upgrade advisory.
//!
//! Output is deterministic: interfaces are processed in sorted-URI order,
//! removals and version changes before additions, so the same pair of sets
//! always reports the same lines.

use crate::selections::catalog::{ImplementationCatalog, ImplementationInfo};
use crate::selections::set::SelectionSet;
use crate::selections::version::{Stability, Version};
use std::fmt;
use tracing::debug;

/// One human-meaningful difference between two selection sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    /// Interface newly selected
    Added { uri: String, new: Version },

    /// Interface no longer selected
    Removed { uri: String, old: Version },

    /// Same interface, different implementation version
    VersionChanged {
        uri: String,
        old: Version,
        new: Version,
    },

    /// Versions identical but something else (digest, command, metadata)
    /// changed in the serialized form
    MetadataChanged { uri: String },
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeRecord::Added { uri, new } => write!(f, "{uri}: new -> {new}"),
            ChangeRecord::Removed { uri, .. } => write!(f, "No longer used: {uri}"),
            ChangeRecord::VersionChanged { uri, old, new } => {
                write!(f, "{uri}: {old} -> {new}")
            }
            ChangeRecord::MetadataChanged { uri } => {
                write!(f, "Updates to metadata found for {uri}, but no change to version")
            }
        }
    }
}

/// Compute the ordered difference between two selection sets.
///
/// Removals first, then version changes, then additions, each in ascending
/// URI order. When the membership and every version match, the serialized
/// forms are compared structurally; any remaining difference is reported as
/// a single [`ChangeRecord::MetadataChanged`] on the root interface.
pub fn diff(old: &SelectionSet, new: &SelectionSet) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();

    for (uri, old_entry) in &old.entries {
        if !new.entries.contains_key(uri) {
            changes.push(ChangeRecord::Removed {
                uri: uri.clone(),
                old: old_entry.version.clone(),
            });
        }
    }

    for (uri, old_entry) in &old.entries {
        if let Some(new_entry) = new.entries.get(uri) {
            if old_entry.version != new_entry.version {
                changes.push(ChangeRecord::VersionChanged {
                    uri: uri.clone(),
                    old: old_entry.version.clone(),
                    new: new_entry.version.clone(),
                });
            }
        }
    }

    for (uri, new_entry) in &new.entries {
        if !old.entries.contains_key(uri) {
            changes.push(ChangeRecord::Added {
                uri: uri.clone(),
                new: new_entry.version.clone(),
            });
        }
    }

    // Versions and membership agree; look for subtler updates. Metadata
    // differences are only reported when nothing else changed.
    if changes.is_empty() && !old.structurally_equal(new) {
        changes.push(ChangeRecord::MetadataChanged {
            uri: new.root_interface.clone(),
        });
    }

    debug!(
        old_root = %old.root_interface,
        new_root = %new.root_interface,
        count = changes.len(),
        "computed selection diff"
    );

    changes
}

/// Notice that a newer implementation exists than the one selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeAdvisory {
    /// The newest implementation known for the root interface
    pub latest: ImplementationInfo,

    /// The version the resolver actually selected
    pub selected: Version,

    /// True when the newer implementation was likely skipped because the
    /// help_with_testing preference is off
    pub suggest_help_with_testing: bool,
}

impl fmt::Display for UpgradeAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A later version ({} {}) exists but was not selected. Using {} instead.",
            self.latest.id, self.latest.version, self.selected
        )?;
        if self.suggest_help_with_testing {
            write!(
                f,
                "\nTo select \"testing\" versions, run:\n  feedlock config help_with_testing true"
            )?;
        }
        Ok(())
    }
}

/// Compute the upgrade advisory for a freshly resolved set.
///
/// Independent of the diff: reported even when nothing changed. Returns
/// `None` when the catalog knows nothing newer than the selected version,
/// or when the set has no root entry to compare against.
pub fn advise_upgrade(
    new: &SelectionSet,
    catalog: &dyn ImplementationCatalog,
    help_with_testing: bool,
) -> Option<UpgradeAdvisory> {
    let root = new.root_entry()?;
    let latest = catalog
        .implementations(&new.root_interface)
        .into_iter()
        .max_by(|a, b| a.version.cmp(&b.version))?;

    if latest.version <= root.version {
        return None;
    }

    let suggest_help_with_testing = !help_with_testing && latest.stability < Stability::Stable;

    Some(UpgradeAdvisory {
        latest,
        selected: root.version.clone(),
        suggest_help_with_testing,
    })
}
