use crate::classify::{self, DocumentKind, UploadedDocument};
use crate::config::Config;
use crate::engine::{
    MALFORMED_RESPONSE_TEXT, RECOGNITION_FAILED_TEXT, RecognitionEngine, RecognitionError,
    RecognitionInput, RecognitionOutcome,
};
use crate::postprocess;
use crate::raster::{PageBitmap, RasterError, Rasterizer};
use crate::report::{InputInfo, PageReport, RunReport};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    UnsupportedInput(#[from] classify::UnsupportedInput),

    #[error(transparent)]
    Rasterization(#[from] RasterError),

    #[error("input exceeds {limit}: {actual}")]
    LimitExceeded { limit: &'static str, actual: u64 },
}

/// The two progress signals, both in [0, 100]. Mutated only by the pipeline,
/// read by whatever presents it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineProgress {
    pub current_page: f32,
    pub overall: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Classifying,
    Recognizing { page: u32 },
    Completed,
    Failed,
}

/// Push-based channel from the pipeline to a presentation adapter.
pub trait ProgressSink {
    fn begin(&mut self, _kind: DocumentKind, _page_count: u32) {}

    fn page_started(&mut self, _page: u32, _page_count: u32) {}

    /// Called once per rendered page, before recognition. Adapters that want
    /// page previews persist the bitmap here; the pipeline itself drops it
    /// after recognition.
    fn page_rendered(&mut self, _page: &PageBitmap) {}

    fn progress(&mut self, progress: PipelineProgress);

    fn finished(&mut self) {}
}

/// Discards everything. For headless runs and tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&mut self, _progress: PipelineProgress) {}
}

/// Proof that the holder belongs to the session's current run. Mutations
/// presented with a stale token are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken(u64);

/// Per-run state owned by the pipeline: the state machine, both progress
/// signals, and the committed result set.
#[derive(Debug)]
pub struct RunSession {
    generation: u64,
    state: RunState,
    progress: PipelineProgress,
    results: Vec<RecognitionOutcome>,
}

impl RunSession {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: RunState::Idle,
            progress: PipelineProgress::default(),
            results: Vec::new(),
        }
    }

    /// Starting a run invalidates every outstanding token and clears all
    /// state left over from the prior run.
    pub fn begin_run(&mut self) -> RunToken {
        self.generation += 1;
        self.state = RunState::Classifying;
        self.progress = PipelineProgress::default();
        self.results.clear();
        RunToken(self.generation)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn progress(&self) -> PipelineProgress {
        self.progress
    }

    /// Committed outcomes, in page order. Readers never observe a
    /// partially-written entry.
    pub fn results(&self) -> &[RecognitionOutcome] {
        &self.results
    }

    fn accepts(&self, token: RunToken) -> bool {
        token.0 == self.generation
            && !matches!(self.state, RunState::Completed | RunState::Failed)
    }

    pub fn set_state(&mut self, token: RunToken, state: RunState) -> bool {
        if !self.accepts(token) {
            return false;
        }
        self.state = state;
        true
    }

    pub fn set_progress(&mut self, token: RunToken, progress: PipelineProgress) -> bool {
        if !self.accepts(token) {
            return false;
        }
        self.progress = progress;
        true
    }

    pub fn push_result(&mut self, token: RunToken, outcome: RecognitionOutcome) -> bool {
        if !self.accepts(token) {
            return false;
        }
        self.results.push(outcome);
        true
    }
}

impl Default for RunSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct RunOutput {
    pub kind: DocumentKind,
    pub results: Vec<RecognitionOutcome>,
    pub report: RunReport,
}

pub struct Pipeline<E: RecognitionEngine> {
    cfg: Config,
    engine: E,
    session: RunSession,
}

impl<E: RecognitionEngine> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
            session: RunSession::new(),
        }
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }

    /// Drive one document through classify → (rasterize → recognize)* →
    /// result set. Pages run strictly sequentially; a failed recognition call
    /// substitutes a sentinel outcome so page order and count are preserved,
    /// while classification and rasterization failures abort the run.
    pub fn run(
        &mut self,
        doc: &UploadedDocument,
        rasterizer: &dyn Rasterizer,
        sink: &mut dyn ProgressSink,
    ) -> Result<RunOutput, PipelineError> {
        let Self {
            cfg,
            engine,
            session,
        } = self;

        let token = session.begin_run();
        sink.progress(session.progress());

        let kind = match classify::classify(doc) {
            Ok(kind) => kind,
            Err(err) => {
                session.set_state(token, RunState::Failed);
                return Err(err.into());
            }
        };
        info!("classified {} as {}", doc.file_name, kind.as_str());

        let file_bytes = doc.bytes.len() as u64;
        if file_bytes > cfg.limits.max_input_file_bytes {
            session.set_state(token, RunState::Failed);
            return Err(PipelineError::LimitExceeded {
                limit: "max_input_file_bytes",
                actual: file_bytes,
            });
        }

        let mut page_reports = Vec::new();

        let page_count = match kind {
            DocumentKind::Paginated => {
                let rendered = match rasterizer.open(&doc.bytes) {
                    Ok(rendered) => rendered,
                    Err(err) => {
                        session.set_state(token, RunState::Failed);
                        return Err(err.into());
                    }
                };

                let total = rendered.page_count();
                if total > cfg.limits.max_input_pages {
                    session.set_state(token, RunState::Failed);
                    return Err(PipelineError::LimitExceeded {
                        limit: "max_input_pages",
                        actual: total as u64,
                    });
                }
                sink.begin(kind, total);

                for index in 1..=total {
                    session.set_state(token, RunState::Recognizing { page: index });
                    sink.page_started(index, total);

                    let bitmap = match rendered.render(index) {
                        Ok(bitmap) => bitmap,
                        Err(err) => {
                            // Render failure is fatal for the whole document.
                            session.set_state(token, RunState::Failed);
                            return Err(err.into());
                        }
                    };
                    sink.page_rendered(&bitmap);

                    let (outcome, page_report) = recognize_one(
                        cfg,
                        engine,
                        RecognitionInput::Page(&bitmap),
                        index,
                        false,
                        token,
                        session,
                        sink,
                    );
                    session.push_result(token, outcome);
                    page_reports.push(page_report);

                    let mut progress = session.progress();
                    progress.overall = 100.0 * index as f32 / total as f32;
                    if index < total {
                        progress.current_page = 0.0;
                    }
                    session.set_progress(token, progress);
                    sink.progress(progress);
                }
                total
            }
            DocumentKind::SingleImage => {
                sink.begin(kind, 1);
                session.set_state(token, RunState::Recognizing { page: 1 });
                sink.page_started(1, 1);

                let (outcome, page_report) = recognize_one(
                    cfg,
                    engine,
                    RecognitionInput::File {
                        bytes: &doc.bytes,
                        file_name: &doc.file_name,
                    },
                    1,
                    true,
                    token,
                    session,
                    sink,
                );
                session.push_result(token, outcome);
                page_reports.push(page_report);

                let progress = PipelineProgress {
                    current_page: 100.0,
                    overall: 100.0,
                };
                session.set_progress(token, progress);
                sink.progress(progress);
                1
            }
        };

        session.set_state(token, RunState::Completed);
        sink.finished();

        let report = RunReport {
            input: InputInfo {
                path: doc.path.display().to_string(),
                file_name: doc.file_name.clone(),
                file_bytes,
                kind,
            },
            engine: engine.name().to_string(),
            page_count,
            pages: page_reports,
        };

        Ok(RunOutput {
            kind,
            results: session.results().to_vec(),
            report,
        })
    }
}

/// One recognition call with the sentinel substitution policy: an engine
/// failure yields a placeholder outcome instead of aborting the batch, which
/// keeps the result set index-aligned with the pages.
#[allow(clippy::too_many_arguments)]
fn recognize_one<E: RecognitionEngine>(
    cfg: &Config,
    engine: &E,
    input: RecognitionInput<'_>,
    index: u32,
    single_image: bool,
    token: RunToken,
    session: &mut RunSession,
    sink: &mut dyn ProgressSink,
) -> (RecognitionOutcome, PageReport) {
    let result = {
        let mut on_progress = |value: f32| {
            let mut progress = session.progress();
            progress.current_page = (value * 100.0).clamp(0.0, 100.0);
            if single_image {
                progress.overall = progress.current_page;
            }
            if session.set_progress(token, progress) {
                sink.progress(progress);
            }
        };
        engine.recognize(input, &cfg.engine.languages, &mut on_progress)
    };

    match result {
        Ok(outcome) => {
            let text = postprocess::normalize_text(&cfg.postprocess, &outcome.text);
            let report = PageReport {
                index,
                ok: true,
                chars: text.chars().count(),
                warning: None,
                meta: outcome.meta.clone(),
            };
            (
                RecognitionOutcome {
                    text,
                    meta: outcome.meta,
                },
                report,
            )
        }
        Err(err) => {
            warn!("recognition failed for page {index}: {err}");
            let text = sentinel_text(&err);
            let report = PageReport {
                index,
                ok: false,
                chars: text.chars().count(),
                warning: Some(err.to_string()),
                meta: None,
            };
            (RecognitionOutcome::plain(text), report)
        }
    }
}

fn sentinel_text(err: &RecognitionError) -> &'static str {
    match err {
        RecognitionError::MalformedResponse(_) => MALFORMED_RESPONSE_TEXT,
        _ => RECOGNITION_FAILED_TEXT,
    }
}
