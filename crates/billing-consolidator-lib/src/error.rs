use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a consolidation run. Data-level problems (bad file
/// names, bad rows, missing files) are logged and skipped instead.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("input directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl BillingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BillingError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        BillingError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type BillingResult<T> = std::result::Result<T, BillingError>;
