//! Configuration discovery and user preferences.
//!
//! Resolves the platform config/cache directories, the ordered lookup path
//! used to find existing apps, and the bin directory candidates for shell
//! integration. Preferences are a small JSON file; a missing file is
//! graceful absence, not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default freshness threshold before an app wants re-resolution: 30 days
pub const DEFAULT_FRESHNESS_SECONDS: u64 = 30 * 24 * 60 * 60;

/// User preferences persisted under the config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Allow below-stable implementations during resolution
    #[serde(default)]
    pub help_with_testing: bool,

    /// Age of the last check after which selections count as stale
    #[serde(default = "default_freshness")]
    pub freshness_seconds: u64,
}

fn default_freshness() -> u64 {
    DEFAULT_FRESHNESS_SECONDS
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            help_with_testing: false,
            freshness_seconds: DEFAULT_FRESHNESS_SECONDS,
        }
    }
}

impl Preferences {
    /// Load preferences, defaulting when the file does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read preferences from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse preferences in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("failed to serialize preferences")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write preferences to {}", path.display()))
    }
}

/// Resolved directory layout plus preferences
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary (writable) config directory; apps are created here
    pub config_dir: PathBuf,

    /// Ordered lookup path for existing state, primary directory first
    pub lookup_path: Vec<PathBuf>,

    /// Cache root; bin candidates resolving under it are never used for
    /// launchers
    pub cache_dir: PathBuf,

    /// Candidate bin directories for shell integration, in preference order
    pub bin_candidates: Vec<PathBuf>,

    pub preferences: Preferences,
}

impl Config {
    /// Discover configuration using platform conventions
    pub fn discover() -> Result<Self> {
        Self::discover_with_override(None)
    }

    /// Discover configuration, preferring an explicit config root when given
    pub fn discover_with_override(cli_override: Option<PathBuf>) -> Result<Self> {
        let config_dir = match cli_override {
            Some(path) => path,
            None => dirs::config_dir()
                .context("failed to determine the platform config directory")?
                .join("feedlock"),
        };

        let mut lookup_path = vec![config_dir.clone()];
        for dir in system_config_dirs() {
            lookup_path.push(dir.join("feedlock"));
        }

        let cache_dir = dirs::cache_dir()
            .context("failed to determine the platform cache directory")?
            .join("feedlock");

        let preferences = Preferences::load(&config_dir.join("preferences.json"))?;

        debug!(config = %config_dir.display(), cache = %cache_dir.display(), "configuration discovered");

        Ok(Self {
            config_dir,
            lookup_path,
            cache_dir,
            bin_candidates: path_candidates(),
            preferences,
        })
    }

    /// Fixed layout rooted at one directory. Used by tests and by callers
    /// that manage an isolated installation.
    pub fn for_root(root: &Path) -> Self {
        let config_dir = root.join("config");
        Self {
            lookup_path: vec![config_dir.clone()],
            config_dir,
            cache_dir: root.join("cache"),
            bin_candidates: vec![root.join("bin")],
            preferences: Preferences::default(),
        }
    }

    /// Directory that owns all app state created by this installation
    pub fn apps_root(&self) -> PathBuf {
        self.config_dir.join("apps")
    }

    /// Ordered candidate directories for an existing app's state
    pub fn app_lookup_dirs(&self, name: &str) -> Vec<PathBuf> {
        self.lookup_path
            .iter()
            .map(|dir| dir.join("apps").join(name))
            .collect()
    }

    pub fn trust_store_path(&self) -> PathBuf {
        self.config_dir.join("trusted-keys")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join("preferences.json")
    }

    /// Freshness threshold as a duration
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.preferences.freshness_seconds as i64)
    }
}

/// System-wide config directories, XDG semantics with the usual default
fn system_config_dirs() -> Vec<PathBuf> {
    match std::env::var_os("XDG_CONFIG_DIRS") {
        Some(raw) if !raw.is_empty() => std::env::split_paths(&raw).collect(),
        _ => vec![PathBuf::from("/etc/xdg")],
    }
}

/// Bin directory candidates from $PATH, in order
fn path_candidates() -> Vec<PathBuf> {
    match std::env::var_os("PATH") {
        Some(raw) => std::env::split_paths(&raw).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_preferences_default_when_absent() {
        let dir = TempDir::new().unwrap();
        let preferences = Preferences::load(&dir.path().join("preferences.json")).unwrap();
        assert_eq!(preferences, Preferences::default());
        assert!(!preferences.help_with_testing);
        assert_eq!(preferences.freshness_seconds, DEFAULT_FRESHNESS_SECONDS);
    }

    #[test]
    fn test_preferences_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let preferences = Preferences {
            help_with_testing: true,
            freshness_seconds: 3600,
        };
        preferences.save(&path).unwrap();

        assert_eq!(Preferences::load(&path).unwrap(), preferences);
    }

    #[test]
    fn test_preferences_reject_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{oops").unwrap();
        assert!(Preferences::load(&path).is_err());
    }

    #[test]
    fn test_for_root_layout() {
        let dir = TempDir::new().unwrap();
        let config = Config::for_root(dir.path());

        assert_eq!(config.apps_root(), dir.path().join("config/apps"));
        assert_eq!(config.trust_store_path(), dir.path().join("config/trusted-keys"));
        assert_eq!(
            config.app_lookup_dirs("demo"),
            vec![dir.path().join("config/apps/demo")]
        );
    }
}
