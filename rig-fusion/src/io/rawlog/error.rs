//! Rawlog I/O errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawlogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Codec(#[from] postcard::Error),

    #[error("Invalid rawlog: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, RawlogError>;
