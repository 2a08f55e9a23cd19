use scantext::classify::UploadedDocument;
use scantext::config::Config;
use scantext::engine::{
    MALFORMED_RESPONSE_TEXT, ProgressFn, RECOGNITION_FAILED_TEXT, RecognitionEngine,
    RecognitionError, RecognitionInput, RecognitionOutcome,
};
use scantext::pipeline::{
    NullSink, Pipeline, PipelineError, PipelineProgress, ProgressSink, RunSession, RunState,
};
use scantext::raster::{PageBitmap, PageRender, RasterError, Rasterizer};
use std::cell::RefCell;
use std::path::PathBuf;

fn doc(name: &str) -> UploadedDocument {
    UploadedDocument {
        path: PathBuf::from(name),
        file_name: name.to_string(),
        bytes: vec![0u8; 16],
    }
}

struct FakeRaster {
    pages: u32,
}

impl Rasterizer for FakeRaster {
    fn open<'a>(&'a self, _bytes: &'a [u8]) -> Result<Box<dyn PageRender + 'a>, RasterError> {
        Ok(Box::new(FakePages { pages: self.pages }))
    }
}

struct FakePages {
    pages: u32,
}

impl PageRender for FakePages {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn render(&self, index: u32) -> Result<PageBitmap, RasterError> {
        Ok(PageBitmap {
            index,
            image: image::DynamicImage::new_rgb8(4, 4),
        })
    }
}

struct BrokenRaster;

impl Rasterizer for BrokenRaster {
    fn open<'a>(&'a self, _bytes: &'a [u8]) -> Result<Box<dyn PageRender + 'a>, RasterError> {
        Err(RasterError::OpenDocument("no decode context".into()))
    }
}

#[derive(Default)]
struct ScriptedEngine {
    fail_pages: Vec<u32>,
    malformed_pages: Vec<u32>,
    calls: RefCell<Vec<u32>>,
}

impl RecognitionEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        "scripted".into()
    }

    fn recognize(
        &self,
        input: RecognitionInput<'_>,
        _languages: &[String],
        progress: ProgressFn<'_>,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        let index = match input {
            RecognitionInput::Page(page) => page.index,
            RecognitionInput::File { .. } => 1,
        };
        self.calls.borrow_mut().push(index);
        progress(0.5);
        progress(1.0);
        if self.fail_pages.contains(&index) {
            return Err(RecognitionError::Failed("boom".into()));
        }
        if self.malformed_pages.contains(&index) {
            return Err(RecognitionError::MalformedResponse(
                "response is missing natural_text".into(),
            ));
        }
        Ok(RecognitionOutcome::plain(format!("text for page {index}")))
    }
}

#[test]
fn paginated_run_is_ordered_and_complete() {
    let cfg = Config::default();
    let mut pipeline = Pipeline::new(&cfg, ScriptedEngine::default());
    let out = pipeline
        .run(&doc("scan.pdf"), &FakeRaster { pages: 3 }, &mut NullSink)
        .unwrap();

    assert_eq!(out.results.len(), 3);
    for (i, outcome) in out.results.iter().enumerate() {
        assert_eq!(outcome.text, format!("text for page {}", i + 1));
    }
    assert_eq!(pipeline.session().state(), RunState::Completed);
    assert_eq!(pipeline.session().progress().overall, 100.0);
    assert_eq!(out.report.page_count, 3);
    assert!(out.report.pages.iter().all(|p| p.ok));
}

#[test]
fn single_image_run_yields_one_result() {
    let cfg = Config::default();
    let mut pipeline = Pipeline::new(&cfg, ScriptedEngine::default());
    let out = pipeline
        .run(&doc("photo.png"), &FakeRaster { pages: 0 }, &mut NullSink)
        .unwrap();

    assert_eq!(out.results.len(), 1);
    assert_eq!(pipeline.session().progress().overall, 100.0);
    assert_eq!(pipeline.session().progress().current_page, 100.0);
}

#[test]
fn unsupported_extension_never_recognizes() {
    let cfg = Config::default();
    let engine = ScriptedEngine::default();
    let mut pipeline = Pipeline::new(&cfg, engine);
    let err = pipeline
        .run(&doc("file.txt"), &FakeRaster { pages: 1 }, &mut NullSink)
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedInput(_)));
    assert_eq!(pipeline.session().state(), RunState::Failed);
    assert!(pipeline.session().results().is_empty());
}

#[test]
fn failed_page_is_substituted_not_fatal() {
    let cfg = Config::default();
    let engine = ScriptedEngine {
        fail_pages: vec![2],
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(&cfg, engine);
    let out = pipeline
        .run(&doc("scan.pdf"), &FakeRaster { pages: 3 }, &mut NullSink)
        .unwrap();

    assert_eq!(out.results.len(), 3);
    assert_eq!(out.results[0].text, "text for page 1");
    assert_eq!(out.results[1].text, RECOGNITION_FAILED_TEXT);
    assert_eq!(out.results[2].text, "text for page 3");
    assert!(!out.report.pages[1].ok);
    assert!(out.report.pages[1].warning.is_some());
    assert_eq!(pipeline.session().state(), RunState::Completed);
}

#[test]
fn malformed_payload_gets_its_own_placeholder() {
    let cfg = Config::default();
    let engine = ScriptedEngine {
        malformed_pages: vec![1],
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(&cfg, engine);
    let out = pipeline
        .run(&doc("photo.png"), &FakeRaster { pages: 0 }, &mut NullSink)
        .unwrap();

    assert_eq!(out.results[0].text, MALFORMED_RESPONSE_TEXT);
    assert_eq!(pipeline.session().state(), RunState::Completed);
}

#[test]
fn raster_failure_aborts_the_run() {
    let cfg = Config::default();
    let engine = ScriptedEngine::default();
    let mut pipeline = Pipeline::new(&cfg, engine);
    let err = pipeline
        .run(&doc("scan.pdf"), &BrokenRaster, &mut NullSink)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Rasterization(_)));
    assert_eq!(pipeline.session().state(), RunState::Failed);
    assert!(pipeline.session().results().is_empty());
}

#[test]
fn new_run_resets_prior_state() {
    let cfg = Config::default();
    let mut pipeline = Pipeline::new(&cfg, ScriptedEngine::default());
    pipeline
        .run(&doc("scan.pdf"), &FakeRaster { pages: 3 }, &mut NullSink)
        .unwrap();
    assert_eq!(pipeline.session().results().len(), 3);

    let out = pipeline
        .run(&doc("photo.png"), &FakeRaster { pages: 0 }, &mut NullSink)
        .unwrap();
    assert_eq!(out.results.len(), 1);
    assert_eq!(pipeline.session().results().len(), 1);
}

#[test]
fn page_limit_is_enforced() {
    let mut cfg = Config::default();
    cfg.limits.max_input_pages = 2;
    let mut pipeline = Pipeline::new(&cfg, ScriptedEngine::default());
    let err = pipeline
        .run(&doc("scan.pdf"), &FakeRaster { pages: 3 }, &mut NullSink)
        .unwrap_err();

    assert!(matches!(err, PipelineError::LimitExceeded { .. }));
    assert_eq!(pipeline.session().state(), RunState::Failed);
}

struct RecordingSink {
    events: Vec<PipelineProgress>,
}

impl ProgressSink for RecordingSink {
    fn progress(&mut self, progress: PipelineProgress) {
        self.events.push(progress);
    }
}

#[test]
fn overall_progress_steps_per_page_and_page_progress_resets() {
    let cfg = Config::default();
    let mut pipeline = Pipeline::new(&cfg, ScriptedEngine::default());
    let mut sink = RecordingSink { events: Vec::new() };
    pipeline
        .run(&doc("scan.pdf"), &FakeRaster { pages: 2 }, &mut sink)
        .unwrap();

    // First event is the reset to (0, 0).
    assert_eq!(sink.events[0], PipelineProgress::default());
    // After page 1 of 2: overall at 50, per-page progress reset for page 2.
    assert!(
        sink.events
            .iter()
            .any(|p| p.overall == 50.0 && p.current_page == 0.0)
    );
    assert_eq!(sink.events.last().unwrap().overall, 100.0);

    let overalls: Vec<f32> = sink.events.iter().map(|p| p.overall).collect();
    assert!(overalls.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn stale_run_tokens_are_ignored() {
    let mut session = RunSession::new();
    let first = session.begin_run();
    let second = session.begin_run();

    assert!(!session.push_result(first, RecognitionOutcome::plain("stale")));
    assert!(session.push_result(second, RecognitionOutcome::plain("current")));
    assert_eq!(session.results().len(), 1);
    assert_eq!(session.results()[0].text, "current");
}

#[test]
fn terminal_session_rejects_further_mutation() {
    let mut session = RunSession::new();
    let token = session.begin_run();
    assert!(session.set_state(token, RunState::Completed));
    assert!(!session.push_result(token, RecognitionOutcome::plain("late")));
    assert!(!session.set_progress(
        token,
        PipelineProgress {
            current_page: 1.0,
            overall: 1.0
        }
    ));
}
