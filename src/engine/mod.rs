pub mod remote;
pub mod tesseract;

use crate::raster::PageBitmap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder text substituted for a page whose recognition call failed.
pub const RECOGNITION_FAILED_TEXT: &str = "Error occurred during OCR processing.";
/// Placeholder text substituted when a remote payload is missing its text field.
pub const MALFORMED_RESPONSE_TEXT: &str = "Unexpected response format.";

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("engine not available: {0}")]
    Unavailable(String),

    #[error("recognition failed: {0}")]
    Failed(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("image encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a single recognition call consumes.
pub enum RecognitionInput<'a> {
    /// A rendered page of a paginated document.
    Page(&'a PageBitmap),
    /// The raw upload, for single-image documents.
    File { bytes: &'a [u8], file_name: &'a str },
}

/// Structure a remote engine may attach beyond plain text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionMeta {
    pub primary_language: Option<String>,
    pub is_rotation_valid: Option<bool>,
    pub rotation_correction: Option<f64>,
    pub is_table: Option<bool>,
    pub is_diagram: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RecognitionMeta>,
}

impl RecognitionOutcome {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: None,
        }
    }
}

/// Push channel for in-flight progress, monotonic in [0, 1].
pub type ProgressFn<'a> = &'a mut dyn FnMut(f32);

pub trait RecognitionEngine {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn availability_hint(&self) -> String;

    fn recognize(
        &self,
        input: RecognitionInput<'_>,
        languages: &[String],
        progress: ProgressFn<'_>,
    ) -> Result<RecognitionOutcome, RecognitionError>;
}

impl<T: RecognitionEngine + ?Sized> RecognitionEngine for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn availability_hint(&self) -> String {
        (**self).availability_hint()
    }

    fn recognize(
        &self,
        input: RecognitionInput<'_>,
        languages: &[String],
        progress: ProgressFn<'_>,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        (**self).recognize(input, languages, progress)
    }
}
