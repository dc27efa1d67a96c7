//! Error type shared by the photometry modules

use std::path::PathBuf;

use thiserror::Error;

use crate::algo::InterpError;

/// Errors that can occur while building spectra/bandpasses or computing photometry
#[derive(Debug, Error)]
pub enum PhotometryError {
    /// A required configuration value (directory, environment variable) is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Two arrays that must agree in length (or grid) do not
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// The inputs are valid arrays but the requested quantity is undefined for them
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Unknown band key: {0}")]
    UnknownBand(String),

    /// Band keys passed alongside a phi array are not the keys it was built from
    #[error("Band order mismatch: phi array has {expected:?}, got {actual:?}")]
    BandOrderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A throughput or SED file/directory does not exist
    #[error("Missing resource: {}", .0.display())]
    MissingResource(PathBuf),

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {} line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Interp(#[from] InterpError),
}

impl PhotometryError {
    pub(crate) fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

/// Convenience alias used throughout the photometry modules
pub type Result<T> = std::result::Result<T, PhotometryError>;
