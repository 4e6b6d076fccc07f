use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionError;

/// Represents all possible errors that can occur during the app's lifecycle
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create directory \"{path}\": {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create file \"{path}\": {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing config: {0}")]
    Config(#[from] config::ConfigError),
    #[error("TOML Serialization Error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Logging setup error: {0}")]
    Logging(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    // My errors
    #[error("Failed to get working directory")]
    WorkDir,
    #[error("Invalid timeout for \"{0}\": {1}")]
    InvalidTimeout(&'static str, f64),
}
