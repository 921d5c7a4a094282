//! Shell launcher scripts and bin directory discovery.
//!
//! A launcher is a two-line shell script delegating to `feedlock run`.
//! Ownership is established by content: only a launcher that still matches
//! its canonical template byte-for-byte is ever deleted on app removal.

use std::path::{Path, PathBuf};
use tracing::debug;

/// The canonical launcher for an app name
pub fn launcher_script(app_name: &str) -> String {
    format!("#!/bin/sh\nexec feedlock run {app_name} \"$@\"\n")
}

/// Pick the directory a launcher should be written to.
///
/// Walks `candidates` in order and returns the first that is not skipped.
/// Skipped: anything under `/usr` except `/usr/local/bin`, anything under
/// `/bin` or `/sbin`, anything resolving (after symlinks) under the cache
/// root, and anything not writable.
pub fn find_bin_dir(candidates: &[PathBuf], cache_root: &Path) -> Option<PathBuf> {
    let resolved_cache = cache_root.canonicalize().ok();

    for candidate in candidates {
        if candidate.starts_with("/usr") && !candidate.starts_with("/usr/local/bin") {
            debug!(path = %candidate.display(), "skipping system bin directory");
            continue;
        }
        if candidate.starts_with("/bin") || candidate.starts_with("/sbin") {
            debug!(path = %candidate.display(), "skipping core-binaries directory");
            continue;
        }
        if let (Ok(resolved), Some(cache)) = (candidate.canonicalize(), resolved_cache.as_ref()) {
            if resolved.starts_with(cache) {
                debug!(path = %candidate.display(), "skipping directory under the cache root");
                continue;
            }
        }
        if !is_writable(candidate) {
            debug!(path = %candidate.display(), "skipping non-writable directory");
            continue;
        }
        return Some(candidate.clone());
    }
    None
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;

    let Ok(cpath) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // access(2) answers for the real uid, matching what a shell user can do.
    unsafe { libc::access(cpath.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}
