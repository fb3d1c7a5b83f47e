use std::path::PathBuf;

use thiserror::Error;

/// Mandatory analysis input is missing.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{data_type} data is required for the analysis")]
    Missing { data_type: &'static str },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {operation} `{}`", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,

        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize `{key}`")]
    Encode {
        key: String,

        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize `{key}`")]
    Decode {
        key: String,

        #[source]
        source: serde_json::Error,
    },

    #[error("`{key}` holds `{actual}` while `{expected}` is expected")]
    TagMismatch { key: String, expected: &'static str, actual: String },
}
