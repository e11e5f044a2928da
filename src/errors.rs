//! Error mapping guide:
//! - Every failure a plugin can hit while building its menu is a `MenuError`.
//! - The Display text is what lands in the `Err` menu, so keep it short and user facing.
//! - Map a missing executable to exit code 127; all others to 1.
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MenuError {
    /// A required setting was not found in env, key-store or dotfiles.
    #[error("Unable to find {0} in environment.")]
    MissingSetting(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The server answered but refused; message comes from its error payload.
    #[error("{0}")]
    Api(String),

    #[error("{program} exited with status {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} timed out after {secs}s")]
    CommandTimeout { program: String, secs: u64 },

    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("cache {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for MenuError {
    fn from(e: serde_json::Error) -> Self {
        MenuError::Parse(e.to_string())
    }
}

impl From<serde_yaml::Error> for MenuError {
    fn from(e: serde_yaml::Error) -> Self {
        MenuError::Parse(e.to_string())
    }
}

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Convert MenuError to exit code (parity with io::Error mapping).
pub fn exit_code_for_menu_error(e: &MenuError) -> u8 {
    match e {
        MenuError::Spawn { source, .. } => exit_code_for_io_error(source),
        MenuError::Io(ioe) => exit_code_for_io_error(ioe),
        _ => 1,
    }
}

/// Render the single-line message shown under the `Err` title.
pub fn display_for_menu_error(e: &MenuError) -> String {
    e.to_string()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
