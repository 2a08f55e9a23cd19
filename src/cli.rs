use crate::{
    classify::{self, UploadedDocument},
    config::Config,
    engine::{RecognitionEngine, remote::RemoteEngine, tesseract::TesseractEngine},
    export,
    pipeline::{Pipeline, PipelineProgress, ProgressSink},
    postprocess,
    raster::{LazyRasterizer, PageBitmap, PdfiumRasterizer},
    util::{ensure_dir, hash_file, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scantext")]
#[command(about = "Sequential OCR transcript pipeline for PDFs and images")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./scantext.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Doctor {},
    Classify {
        #[arg(long)]
        input: PathBuf,
    },
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::Classify { input } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            classify_cmd(input)
        }
        Command::Run { input, out_dir } => run(&args, &cfg, input, out_dir.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("scantext.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("scantext.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("logs").join("scantext.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("scantext.log"))
}

fn build_engine(cfg: &Config) -> Result<Box<dyn RecognitionEngine>> {
    match cfg.engine.backend.as_str() {
        "tesseract" => Ok(Box::new(TesseractEngine::new(cfg))),
        "remote" => Ok(Box::new(RemoteEngine::new(&cfg.remote)?)),
        other => Err(anyhow!("unknown engine.backend: {other}")),
    }
}

#[derive(Debug, Serialize)]
struct Diagnostics {
    engine: String,
    engine_available: bool,
    engine_hint: String,
    pdfium_available: bool,
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = build_engine(cfg)?;
    let diag = Diagnostics {
        engine: engine.name().to_string(),
        engine_available: engine.is_available(),
        engine_hint: engine.availability_hint(),
        pdfium_available: PdfiumRasterizer::available(&cfg.raster),
    };
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn classify_cmd(input: &Path) -> Result<()> {
    let doc = UploadedDocument::read(input)?;
    let kind = classify::classify(&doc)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "file_bytes": doc.bytes.len(),
            "kind": kind,
        }))?
    );
    Ok(())
}

fn run(args: &Args, cfg: &Config, input: &Path, out_override: Option<&Path>) -> Result<()> {
    validate_input(cfg, input)?;

    let cfg_norm = cfg.normalized_for_hash();
    let cfg_hash = sha256_hex(cfg_norm.as_bytes());
    let input_hash = hash_file(&cfg.hashing, input)
        .with_context(|| format!("hashing input: {}", input.display()))?;
    let job_id = sha256_hex(format!("{}:{}", cfg_hash, input_hash).as_bytes());

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let job_dir = out_root.join(&job_id);

    if job_dir.exists() && !cfg.global.resume {
        return Err(anyhow!(
            "job_dir already exists and resume=false: {}",
            job_dir.display()
        ));
    }

    ensure_dir(&job_dir)?;
    ensure_dir(&job_dir.join("final"))?;
    ensure_dir(&job_dir.join("logs"))?;

    let log_path = resolve_log_path(cfg, Some(&job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("job_id={job_id} out={}", job_dir.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let doc = UploadedDocument::read(input)?;
    let engine = build_engine(cfg)?;
    let rasterizer = LazyRasterizer::new(&cfg.raster);
    let mut pipeline = Pipeline::new(cfg, engine);

    let pages_dir = if cfg.export.write_page_images {
        let dir = job_dir.join("pages");
        ensure_dir(&dir)?;
        Some(dir)
    } else {
        None
    };
    let mut sink = CliProgress::new(pages_dir);

    let started = now_rfc3339();
    let output = pipeline.run(&doc, &rasterizer, &mut sink)?;
    sink.clear();

    let final_dir = job_dir.join("final");

    if cfg.export.write_docx {
        let docx = export::export_docx(&output.results)?;
        std::fs::write(final_dir.join(&cfg.export.docx_filename), docx)?;
    }

    if cfg.export.write_text {
        let texts: Vec<String> = output.results.iter().map(|r| r.text.clone()).collect();
        std::fs::write(
            final_dir.join(&cfg.export.text_filename),
            postprocess::merge_pages(&texts),
        )?;
    }

    if cfg.export.write_html {
        std::fs::write(
            final_dir.join(&cfg.export.html_filename),
            export::export_html(&output.results),
        )?;
    }

    if cfg.export.write_report_json {
        std::fs::write(
            final_dir.join(&cfg.export.report_filename),
            serde_json::to_string_pretty(&output.report)?,
        )?;
    }

    if cfg.export.write_index_json {
        let index = serde_json::json!({
            "job_id": job_id,
            "started": started,
            "finished": now_rfc3339(),
            "kind": output.kind,
            "page_count": output.report.page_count,
            "docx": format!("final/{}", cfg.export.docx_filename),
            "text": format!("final/{}", cfg.export.text_filename),
            "report": format!("final/{}", cfg.export.report_filename),
        });
        std::fs::write(
            job_dir.join("index.json"),
            serde_json::to_string_pretty(&index)?,
        )?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job_id": job_id,
                "job_dir": job_dir,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

/// Presentation adapter: two terminal bars, overall and current page, plus
/// optional page-preview PNGs under the job directory.
struct CliProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    page: ProgressBar,
    pages_dir: Option<PathBuf>,
}

impl CliProgress {
    fn new(pages_dir: Option<PathBuf>) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::default_bar()
            .template("{bar:30.cyan/blue} {pos:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");

        let overall = multi.add(ProgressBar::new(100));
        overall.set_style(style.clone());
        overall.set_message("overall");

        let page = multi.add(ProgressBar::new(100));
        page.set_style(style);
        page.set_message("current page");

        Self {
            multi,
            overall,
            page,
            pages_dir,
        }
    }

    fn clear(&self) {
        self.overall.finish_and_clear();
        self.page.finish_and_clear();
        let _ = self.multi.clear();
    }
}

impl ProgressSink for CliProgress {
    fn page_started(&mut self, page: u32, page_count: u32) {
        self.page.set_position(0);
        self.page.set_message(format!("page {page}/{page_count}"));
    }

    fn page_rendered(&mut self, page: &PageBitmap) {
        if let Some(dir) = &self.pages_dir {
            let path = dir.join(format!("page-{:03}.png", page.index));
            if let Err(err) = page.image.save(&path) {
                warn!("failed to write page preview {}: {err}", path.display());
            }
        }
    }

    fn progress(&mut self, progress: PipelineProgress) {
        self.overall.set_position(progress.overall.round() as u64);
        self.page.set_position(progress.current_page.round() as u64);
    }
}
