//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::io::rawlog::RawlogError;
use crate::io::reference_map::ReferenceMapError;

/// Fatal errors that abort a run
#[derive(Error, Debug)]
pub enum FusionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Stream error: {0}")]
    Rawlog(#[from] RawlogError),

    #[error(transparent)]
    ReferenceMap(#[from] ReferenceMapError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FusionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FusionError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FusionError>;
