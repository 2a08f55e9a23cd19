use super::{
    ProgressFn, RecognitionEngine, RecognitionError, RecognitionInput, RecognitionOutcome,
};
use crate::config::Config;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

/// Local recognition via the Tesseract command line.
pub struct TesseractEngine {
    binary: String,
    model_dir: String,
    keep_stderr: bool,
}

impl TesseractEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            binary: cfg.tesseract.binary.clone(),
            model_dir: cfg.engine.model_dir.clone(),
            keep_stderr: cfg.debug.keep_engine_stderr,
        }
    }

    fn run(&self, image_path: &Path, languages: &[String]) -> Result<String, RecognitionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path).arg("stdout");
        if !languages.is_empty() {
            cmd.args(["-l", &languages.join("+")]);
        }
        if !self.model_dir.is_empty() {
            cmd.args(["--tessdata-dir", &self.model_dir]);
        }

        match cmd.output() {
            Ok(out) if out.status.success() => {
                if self.keep_stderr && !out.stderr.is_empty() {
                    debug!(
                        "tesseract stderr: {}",
                        String::from_utf8_lossy(&out.stderr).trim()
                    );
                }
                Ok(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => Err(RecognitionError::Failed(format!(
                "tesseract exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                RecognitionError::Unavailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.binary
                )),
            ),
            Err(e) => Err(RecognitionError::Io(e)),
        }
    }

    /// Stage the input as a file tesseract can read.
    fn stage_input(
        &self,
        dir: &Path,
        input: &RecognitionInput<'_>,
    ) -> Result<PathBuf, RecognitionError> {
        match input {
            RecognitionInput::Page(page) => {
                let path = dir.join(format!("page-{:03}.png", page.index));
                page.image.save(&path)?;
                Ok(path)
            }
            RecognitionInput::File { bytes, file_name } => {
                let ext = file_name
                    .rsplit_once('.')
                    .map(|(_, e)| e.to_ascii_lowercase())
                    .unwrap_or_else(|| "png".into());
                let path = dir.join(format!("upload.{ext}"));
                std::fs::write(&path, bytes)?;
                Ok(path)
            }
        }
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            format!("{} is available", self.binary)
        } else {
            format!(
                "{} not found in PATH (install tesseract-ocr)",
                self.binary
            )
        }
    }

    fn recognize(
        &self,
        input: RecognitionInput<'_>,
        languages: &[String],
        progress: ProgressFn<'_>,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        // The CLI yields no incremental signal, so the channel sees only the
        // start and finish of the call.
        progress(0.0);
        let tmp = TempDir::new()?;
        let image_path = self.stage_input(tmp.path(), &input)?;
        let text = self.run(&image_path, languages)?;
        progress(1.0);
        Ok(RecognitionOutcome::plain(text))
    }
}
