//! Selection sets, feed versions, and reconciliation.

pub mod catalog;
pub mod reconcile;
pub mod set;
pub mod version;

pub use catalog::{
    CatalogError, CatalogFeed, DirectoryStore, ImplementationCatalog, ImplementationInfo,
    ImplementationStore, JsonCatalog,
};
pub use reconcile::{advise_upgrade, diff, ChangeRecord, UpgradeAdvisory};
pub use set::{SelectionEntry, SelectionSet, SelectionsError, PACKAGE_PREFIX};
pub use version::{Stability, Version, VersionError};
