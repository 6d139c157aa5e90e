use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("error reading {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("could not expand {path}: unable to determine home directory")]
    PathExpansion { path: String },
    #[error("theme '{theme}' is not defined")]
    UnknownTheme { theme: String },
    #[error("invalid regex for key '{key}' in app '{app}': {source}")]
    InvalidRegex {
        key: String,
        app: String,
        #[source]
        source: regex::Error,
    },
    #[error("could not access file {} for app '{app}': {source}", path.display())]
    FileIo {
        app: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A post-apply command that could not be spawned or exited non-zero. Only
/// ever logged, so it stays out of `SwitchError`.
#[derive(Debug, Error)]
#[error("command '{cmd}' failed: {status}")]
pub struct CommandError {
    pub cmd: String,
    pub status: String,
    pub stderr: String,
}

pub type Result<T> = std::result::Result<T, SwitchError>;
