use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{cache::sanitise, core::analysis::AnalysisResult, error::StorageError, prelude::*};

/// Directory of the saved analysis documents.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            operation: "create",
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn prefix(account_number: &str) -> String {
        format!("{}_analysis_", sanitise(account_number))
    }

    /// Save the analysis under its generation timestamp.
    #[instrument(skip_all, fields(account = %result.account_number))]
    pub fn save_analysis(&self, result: &AnalysisResult) -> Result<PathBuf, StorageError> {
        let file_name = format!(
            "{}{}.json",
            Self::prefix(&result.account_number),
            result.generated_at.format("%Y-%m-%d_%H-%M-%S"),
        );
        let path = self.dir.join(file_name);
        let contents = serde_json::to_vec_pretty(result).map_err(|source| StorageError::Encode {
            key: result.account_number.clone(),
            source,
        })?;
        fs::write(&path, contents).map_err(|source| StorageError::Io {
            operation: "write",
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "saved the analysis");
        Ok(path)
    }

    /// Load the most recently generated analysis of the account, if any.
    #[instrument(skip_all, fields(account = account_number))]
    pub fn load_latest_analysis(
        &self,
        account_number: &str,
    ) -> Result<Option<AnalysisResult>, StorageError> {
        let prefix = Self::prefix(account_number);
        let entries = fs::read_dir(&self.dir).map_err(|source| StorageError::Io {
            operation: "list",
            path: self.dir.clone(),
            source,
        })?;

        // The timestamp format sorts chronologically:
        let Some(file_name) = entries
            .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
            .filter(|file_name| file_name.starts_with(&prefix) && file_name.ends_with(".json"))
            .max()
        else {
            return Ok(None);
        };

        let path = self.dir.join(&file_name);
        debug!(path = %path.display(), "loading…");
        let contents = fs::read(&path).map_err(|source| StorageError::Io {
            operation: "read",
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|source| StorageError::Decode { key: file_name, source })
    }
}
