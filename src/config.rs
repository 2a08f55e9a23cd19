use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub hashing: Hashing,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub raster: Raster,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub tesseract: Tesseract,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub resume: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            resume: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashing {
    pub mode: String,
    pub fast_window_bytes: u64,
}
impl Default for Hashing {
    fn default() -> Self {
        Self {
            mode: "fast_2x16mb".into(),
            fast_window_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub max_input_file_bytes: u64,
    pub max_input_pages: u32,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
            max_input_pages: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Raster {
    /// Oversampling factor applied on top of the page's natural size.
    /// Higher values trade render time for recognition quality.
    pub scale: f32,
    pub device_pixel_ratio: f32,
    /// Directory holding the pdfium shared library. Empty = system library.
    pub pdfium_library_dir: String,
}
impl Default for Raster {
    fn default() -> Self {
        Self {
            scale: 3.0,
            device_pixel_ratio: 1.0,
            pdfium_library_dir: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    /// Recognition strategy: "tesseract" (local subprocess) or "remote".
    pub backend: String,
    pub languages: Vec<String>,
    /// Optional model directory override (tessdata dir for tesseract).
    pub model_dir: String,
}
impl Default for Engine {
    fn default() -> Self {
        Self {
            backend: "tesseract".into(),
            languages: vec!["tha".into(), "eng".into()],
            model_dir: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tesseract {
    pub binary: String,
}
impl Default for Tesseract {
    fn default() -> Self {
        Self {
            binary: "tesseract".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    pub base_url: String,
    /// Environment variable that overrides base_url when set.
    pub base_url_env: String,
    /// 0 disables the request timeout.
    pub timeout_seconds: u64,
}
impl Default for Remote {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/ocr".into(),
            base_url_env: "OCR_API_URL".into(),
            timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Postprocess {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub trim_trailing_whitespace: bool,
    pub control_chars_to_sanitize: Vec<u8>,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            trim_trailing_whitespace: true,
            control_chars_to_sanitize: (0u8..32)
                .filter(|&c| !matches!(c, 9 | 10 | 13))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub write_docx: bool,
    pub docx_filename: String,
    pub write_text: bool,
    pub text_filename: String,
    pub write_html: bool,
    pub html_filename: String,
    pub write_report_json: bool,
    pub report_filename: String,
    pub write_index_json: bool,
    pub write_page_images: bool,
}
impl Default for Export {
    fn default() -> Self {
        Self {
            write_docx: true,
            docx_filename: "ocr_results.docx".into(),
            write_text: true,
            text_filename: "ocr_results.txt".into(),
            write_html: false,
            html_filename: "preview.html".into(),
            write_report_json: true,
            report_filename: "report.json".into(),
            write_index_json: true,
            write_page_images: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub keep_engine_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_engine_stderr: true,
            dump_effective_config: true,
        }
    }
}
