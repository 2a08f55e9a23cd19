use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unsupported file type: {extension:?} (supported: pdf, jpg, jpeg, png)")]
pub struct UnsupportedInput {
    pub extension: String,
}

/// What the upload is, derived once from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Paginated,
    SingleImage,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Paginated => "paginated",
            DocumentKind::SingleImage => "single_image",
        }
    }
}

/// An accepted upload. Immutable once read; replaced wholesale by the next run.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading input: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            bytes,
        })
    }

    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

pub fn classify(doc: &UploadedDocument) -> Result<DocumentKind, UnsupportedInput> {
    match doc.extension().as_str() {
        "pdf" => Ok(DocumentKind::Paginated),
        "jpg" | "jpeg" | "png" => Ok(DocumentKind::SingleImage),
        other => Err(UnsupportedInput {
            extension: other.to_string(),
        }),
    }
}
