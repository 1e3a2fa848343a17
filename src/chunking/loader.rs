//! Loading UTF-8 text documents from disk

use super::Document;
use crate::error::{DocqaError, Result};
use std::path::Path;

/// Read a UTF-8 text file fully into memory.
///
/// A missing file, an unreadable file and invalid UTF-8 all fail with
/// `SourceNotFound`; the document is unusable in every case.
pub async fn load_document(path: &Path) -> Result<Document> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DocqaError::SourceNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;

    let text = String::from_utf8(bytes).map_err(|e| DocqaError::SourceNotFound {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    tracing::debug!("Loaded {} ({} bytes)", path.display(), text.len());

    Ok(Document::new(path.display().to_string(), text))
}
