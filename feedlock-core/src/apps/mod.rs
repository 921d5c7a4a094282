//! Named apps: a persisted binding from a user-facing name to a root
//! interface plus its last-resolved selection set.
//!
//! The [`AppManager`] owns the mapping from name to on-disk directory; a
//! live [`App`] exclusively owns that directory's contents. Concurrent
//! processes racing on the same app are last-writer-wins; within one
//! process each App serializes its own read-modify-write sequences.

pub mod error;
pub mod launcher;

pub use error::AppError;
pub use launcher::{find_bin_dir, launcher_script};

use crate::config::Config;
use crate::selections::{ImplementationStore, SelectionSet};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const SELECTIONS_FILE: &str = "selections.json";
const LAST_CHECK_FILE: &str = "last-check";

// Rejects : and ; everywhere so names stay portable between POSIX and
// Windows, and path-ish first characters so a name can never escape the
// apps root.
static VALID_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^./\\:=;'"][^/\\:=;'"]*$"#).expect("app name pattern is valid")
});

/// Check an app or launcher name
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if VALID_NAME.is_match(name) {
        Ok(())
    } else {
        Err(AppError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// A stored selection set together with its health at load time
#[derive(Debug)]
pub struct LoadedSelections {
    pub selections: SelectionSet,

    /// Implementation ids selected but not present in any local store
    pub missing: Vec<String>,

    /// True when the last check is older than the caller's threshold (or
    /// its marker is unreadable)
    pub needs_update: bool,
}

/// One named application and its storage directory
#[derive(Debug)]
pub struct App {
    name: String,
    dir: PathBuf,
    config: Arc<Config>,

    // Serializes get/set sequences within this process. Cross-process
    // races on the same directory are accepted (last writer wins).
    io_lock: Mutex<()>,
}

impl App {
    fn new(name: String, dir: PathBuf, config: Arc<Config>) -> Self {
        Self {
            name,
            dir,
            config,
            io_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn selections_path(&self) -> PathBuf {
        self.dir.join(SELECTIONS_FILE)
    }

    fn last_check_path(&self) -> PathBuf {
        self.dir.join(LAST_CHECK_FILE)
    }

    fn lock_io(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.io_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Overwrite the stored selections and refresh the last-check marker.
    ///
    /// Not transactional: a crash mid-write can corrupt the stored file.
    pub fn set_selections(&self, selections: &SelectionSet) -> Result<(), AppError> {
        let _guard = self.lock_io();
        selections.save(&self.selections_path())?;
        self.touch_last_check()?;
        info!(app = %self.name, root = %selections.root_interface, "selections stored");
        Ok(())
    }

    /// Load the stored selections, flagging missing implementations and
    /// staleness. `freshness` is the caller's policy threshold.
    pub fn get_selections(
        &self,
        store: &dyn ImplementationStore,
        freshness: chrono::Duration,
    ) -> Result<LoadedSelections, AppError> {
        let _guard = self.lock_io();
        let selections = SelectionSet::load(&self.selections_path())?;

        let mut missing = Vec::new();
        for entry in selections.entries.values() {
            if entry.is_package_managed() {
                continue;
            }
            if !store.is_available(&entry.implementation_id) {
                warn!(
                    app = %self.name,
                    implementation = %entry.implementation_id,
                    "selected implementation is not in any local store"
                );
                missing.push(entry.implementation_id.clone());
            }
        }

        let needs_update = match self.last_check_time() {
            Some(checked) => {
                let age = Utc::now().signed_duration_since(checked);
                age > freshness
            }
            None => {
                warn!(app = %self.name, "last-check marker unreadable; forcing update");
                true
            }
        };

        Ok(LoadedSelections {
            selections,
            missing,
            needs_update,
        })
    }

    /// When this app's selections were last checked against its feeds
    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.last_check_path()).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Reset the last-check marker to now. Only the mtime matters; the
    /// file stays zero-length.
    pub fn touch_last_check(&self) -> Result<(), AppError> {
        let path = self.last_check_path();
        fs::File::create(&path).map_err(AppError::io(&path))?;
        Ok(())
    }

    /// Write a launcher script for this app under a writable bin directory.
    ///
    /// Never overwrites: an existing file at the target path is an error.
    /// The script gets the executable bits added on top of whatever
    /// permission bits it was created with.
    pub fn integrate_shell(&self, alias: &str) -> Result<PathBuf, AppError> {
        validate_name(alias)?;

        let bin_dir = find_bin_dir(&self.config.bin_candidates, &self.config.cache_dir)
            .ok_or(AppError::NoBinDir)?;
        let launcher = bin_dir.join(alias);
        if launcher.exists() {
            return Err(AppError::LauncherExists { path: launcher });
        }

        let script = launcher_script(&self.name);
        let mut file = fs::File::create(&launcher).map_err(AppError::io(&launcher))?;
        file.write_all(script.as_bytes())
            .map_err(AppError::io(&launcher))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = file.metadata().map_err(AppError::io(&launcher))?.permissions();
            permissions.set_mode(permissions.mode() | 0o111);
            file.set_permissions(permissions)
                .map_err(AppError::io(&launcher))?;
        }

        info!(app = %self.name, launcher = %launcher.display(), "shell launcher written");
        Ok(launcher)
    }

    /// Remove this app: its launcher if (and only if) we still own it,
    /// then the whole storage directory.
    pub fn destroy(self) -> Result<(), AppError> {
        if let Some(bin_dir) = find_bin_dir(&self.config.bin_candidates, &self.config.cache_dir) {
            self.remove_owned_launcher(&bin_dir.join(&self.name))?;
        }

        fs::remove_dir_all(&self.dir).map_err(AppError::io(&self.dir))?;
        info!(app = %self.name, "app destroyed");
        Ok(())
    }

    /// Delete the launcher only if its size and content exactly match the
    /// canonical template. A hand-edited launcher belongs to the user.
    fn remove_owned_launcher(&self, launcher: &Path) -> Result<(), AppError> {
        let expected = launcher_script(&self.name);

        let Ok(metadata) = fs::metadata(launcher) else {
            return Ok(());
        };
        if metadata.len() != expected.len() as u64 {
            debug!(launcher = %launcher.display(), "launcher size differs; leaving it alone");
            return Ok(());
        }

        let content = fs::read_to_string(launcher).map_err(AppError::io(launcher))?;
        if content == expected {
            fs::remove_file(launcher).map_err(AppError::io(launcher))?;
            info!(launcher = %launcher.display(), "owned launcher removed");
        } else {
            debug!(launcher = %launcher.display(), "launcher was modified; leaving it alone");
        }
        Ok(())
    }
}

/// Creates, finds, and lists apps under the config lookup path
pub struct AppManager {
    config: Arc<Config>,
}

impl AppManager {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Create a new app directory and initialize its last-check marker
    pub fn create_app(&self, name: &str) -> Result<App, AppError> {
        validate_name(name)?;

        let apps_root = self.config.apps_root();
        fs::create_dir_all(&apps_root).map_err(AppError::io(&apps_root))?;

        let app_dir = apps_root.join(name);
        if app_dir.is_dir() {
            return Err(AppError::AlreadyExists {
                name: name.to_string(),
                path: app_dir,
            });
        }
        fs::create_dir(&app_dir).map_err(AppError::io(&app_dir))?;

        let app = App::new(name.to_string(), app_dir, Arc::clone(&self.config));
        app.touch_last_check()?;
        info!(app = %name, dir = %app.dir.display(), "app created");
        Ok(app)
    }

    /// Find an existing app along the config lookup path.
    ///
    /// With `missing_ok`, an invalid or unknown name yields `None` so a
    /// caller can fall back to treating the argument as an interface URI.
    pub fn lookup_app(&self, name: &str, missing_ok: bool) -> Result<Option<App>, AppError> {
        if let Err(err) = validate_name(name) {
            return if missing_ok { Ok(None) } else { Err(err) };
        }

        for dir in self.config.app_lookup_dirs(name) {
            if dir.is_dir() {
                return Ok(Some(App::new(
                    name.to_string(),
                    dir,
                    Arc::clone(&self.config),
                )));
            }
        }

        if missing_ok {
            Ok(None)
        } else {
            Err(AppError::NoSuchApp {
                name: name.to_string(),
            })
        }
    }

    /// Names of all apps created by this installation, sorted
    pub fn list_apps(&self) -> Result<Vec<String>, AppError> {
        let apps_root = self.config.apps_root();
        if !apps_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let entries = fs::read_dir(&apps_root).map_err(AppError::io(&apps_root))?;
        for entry in entries {
            let entry = entry.map_err(AppError::io(&apps_root))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["normal-name_1", "app", "My App", "a", "app2.0"] {
            assert!(validate_name(name).is_ok(), "should accept {name:?}");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "", "../evil", ".hidden", "/abs", "a/b", "a\\b", "a:b", "a;b", "a=b", "a'b", "a\"b",
        ] {
            assert!(validate_name(name).is_err(), "should reject {name:?}");
        }
    }

    #[test]
    fn test_dot_allowed_after_first_character() {
        assert!(validate_name("app.backup").is_ok());
        assert!(validate_name(".app").is_err());
    }
}
