//! Input types: the uploaded document and the kind of form it should fill.

use crate::config::PDF_MEDIA_TYPE;
use crate::error::IntakeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A file selected by the user, consumed once by a pipeline run.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Original file name, forwarded to the conversion service.
    pub file_name: String,
    /// Media type declared by the uploader (not sniffed).
    pub media_type: String,
    /// Raw file bytes.
    pub content: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            content: content.into(),
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Read a local file, declaring its media type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IntakeError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => IntakeError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => IntakeError::Internal(format!("Failed to read '{}': {e}", path.display())),
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let media_type = media_type_for(path);
        debug!("Loaded {} ({} bytes, {})", path.display(), content.len(), media_type);

        Ok(Self {
            file_name,
            media_type: media_type.to_string(),
            content,
        })
    }
}

// Bytes are elided so a 10 MiB upload does not end up in a log line.
impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Declared media type for a path, by extension.
pub fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MEDIA_TYPE,
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Which form the extracted record is meant to pre-fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Property,
    Tenant,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Property => f.write_str("property"),
            DocumentKind::Tenant => f.write_str("tenant"),
        }
    }
}
