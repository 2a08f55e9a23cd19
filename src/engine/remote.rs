use super::{
    ProgressFn, RecognitionEngine, RecognitionError, RecognitionInput, RecognitionMeta,
    RecognitionOutcome,
};
use crate::config;
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    natural_text: Option<String>,
    #[serde(default)]
    primary_language: Option<String>,
    #[serde(default)]
    is_rotation_valid: Option<bool>,
    #[serde(default)]
    rotation_correction: Option<f64>,
    #[serde(default)]
    is_table: Option<bool>,
    #[serde(default)]
    is_diagram: Option<bool>,
}

/// Remote recognition: one multipart upload per request against a structured
/// OCR endpoint. No incremental progress is available for the call.
pub struct RemoteEngine {
    client: Client,
    base_url: String,
}

impl RemoteEngine {
    pub fn new(cfg: &config::Remote) -> Result<Self, RecognitionError> {
        let timeout = if cfg.timeout_seconds > 0 {
            Some(Duration::from_secs(cfg.timeout_seconds))
        } else {
            None
        };
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: resolve_base_url(cfg),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn resolve_base_url(cfg: &config::Remote) -> String {
    if !cfg.base_url_env.is_empty() {
        if let Ok(url) = std::env::var(&cfg.base_url_env) {
            if !url.is_empty() {
                return url;
            }
        }
    }
    cfg.base_url.clone()
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()) {
        Some(ext) if ext == "pdf" => "application/pdf",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        _ => "image/png",
    }
}

impl RecognitionEngine for RemoteEngine {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn is_available(&self) -> bool {
        // Reachability is only known at call time.
        true
    }

    fn availability_hint(&self) -> String {
        format!("remote OCR endpoint configured at {}", self.base_url)
    }

    fn recognize(
        &self,
        input: RecognitionInput<'_>,
        _languages: &[String],
        progress: ProgressFn<'_>,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        progress(0.0);

        let (bytes, file_name) = match input {
            RecognitionInput::Page(page) => {
                (page.to_png_bytes()?, format!("page-{}.png", page.index))
            }
            RecognitionInput::File { bytes, file_name } => {
                (bytes.to_vec(), file_name.to_string())
            }
        };
        let mime = mime_for(&file_name);

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = multipart::Form::new().part("file", part);

        debug!("uploading to {}", self.base_url);
        let response = self
            .client
            .post(&self.base_url)
            .multipart(form)
            .send()?
            .error_for_status()?;
        let body = response.text()?;
        let parsed: RemoteResponse = serde_json::from_str(&body)
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;
        progress(1.0);

        match parsed.natural_text {
            Some(text) => Ok(RecognitionOutcome {
                text,
                meta: Some(RecognitionMeta {
                    primary_language: parsed.primary_language,
                    is_rotation_valid: parsed.is_rotation_valid,
                    rotation_correction: parsed.rotation_correction,
                    is_table: parsed.is_table,
                    is_diagram: parsed.is_diagram,
                }),
            }),
            None => Err(RecognitionError::MalformedResponse(
                "response is missing natural_text".into(),
            )),
        }
    }
}
