//! App management error types. All of these are user-facing and
//! recoverable: bad input or unexpected filesystem state, not defects.

use crate::selections::SelectionsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid application name '{name}'")]
    InvalidName { name: String },

    #[error("Application '{name}' already exists: {path}")]
    AlreadyExists { name: String, path: PathBuf },

    #[error("No such application '{name}'")]
    NoSuchApp { name: String },

    #[error("Command already exists: {path}")]
    LauncherExists { path: PathBuf },

    #[error("no writable bin directory found for shell integration")]
    NoBinDir,

    #[error(transparent)]
    Selections(#[from] SelectionsError),

    #[error("app storage error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> AppError {
        let path = path.into();
        move |source| AppError::Io { path, source }
    }
}
