//! Ground-truth dataset loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EvalError;

/// One dataset question with the pages a good answer should cite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthItem {
    /// The question to ask.
    pub question: String,
    /// Expected Wikipedia page titles.
    #[serde(default)]
    pub expected_sources: Vec<String>,
}

/// Loads a JSON array of [`GroundTruthItem`]s.
///
/// # Errors
///
/// Returns [`EvalError::DatasetNotFound`] if `path` does not exist,
/// [`EvalError::Io`] if it cannot be read, and [`EvalError::DatasetParse`]
/// if it is not a valid dataset.
pub fn load_dataset(path: &Path) -> Result<Vec<GroundTruthItem>, EvalError> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            EvalError::DatasetNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EvalError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let items: Vec<GroundTruthItem> =
        serde_json::from_str(&contents).map_err(|source| EvalError::DatasetParse {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), questions = items.len(), "loaded ground truth");
    Ok(items)
}
