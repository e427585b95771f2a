//! Orchestrator tests against an in-process engine double.
//!
//! `FakeEngine` implements the engine traits without a browser: navigation
//! reads the persisted markup from disk, images settle instantly (or never,
//! when configured to hang), and export produces a real PDF via lopdf with
//! one page for the cover and one page per line item for the body. It
//! counts launches, disposals and open/closed contexts so session
//! ownership can be asserted exactly.

use async_trait::async_trait;
use inspection_report::compose::compose_body;
use inspection_report::model::{Comment, Inspection, LineItem, MediaRef, Section};
use inspection_report::{
    DocumentKind, EngineConfig, EngineContext, EngineError, EngineSession, ImageState,
    InspectionRecord, PipelineStage, PrintOptions, RenderStage, RenderingEngine, ReportConfig,
    ReportError, ReportPipeline, ReportProgressCallback,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use scraper::{Html, Selector};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

// ── Fake engine ──────────────────────────────────────────────────────────

#[derive(Default, Clone, Copy)]
struct Behaviour {
    fail_launch: bool,
    fail_export: Option<DocumentKind>,
    /// Export succeeds but returns bytes that are not a PDF.
    garbage_export: Option<DocumentKind>,
    hang_navigation: bool,
    hang_images: bool,
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    disposals: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

struct FakeEngine {
    behaviour: Behaviour,
    counters: Arc<Counters>,
}

impl FakeEngine {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            counters: Arc::new(Counters::default()),
        })
    }

    fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    fn disposals(&self) -> usize {
        self.counters.disposals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderingEngine for FakeEngine {
    async fn launch(&self, _config: &EngineConfig) -> Result<Arc<dyn EngineSession>, EngineError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        if self.behaviour.fail_launch {
            return Err(EngineError::Launch("chrome not found".into()));
        }
        Ok(Arc::new(FakeSession {
            behaviour: self.behaviour,
            counters: Arc::clone(&self.counters),
            disposed: AtomicBool::new(false),
        }))
    }
}

struct FakeSession {
    behaviour: Behaviour,
    counters: Arc<Counters>,
    disposed: AtomicBool,
}

#[async_trait]
impl EngineSession for FakeSession {
    async fn open_context(&self) -> Result<Box<dyn EngineContext>, EngineError> {
        if self.is_disposed() {
            return Err(EngineError::Disposed);
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            behaviour: self.behaviour,
            counters: Arc::clone(&self.counters),
            loaded: Mutex::new(None),
        }))
    }

    async fn dispose(&self) -> Result<(), EngineError> {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.counters.disposals.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct FakeContext {
    behaviour: Behaviour,
    counters: Arc<Counters>,
    /// (document, markup) of the last navigation.
    loaded: Mutex<Option<(DocumentKind, String)>>,
}

impl FakeContext {
    fn loaded(&self) -> Result<(DocumentKind, String), EngineError> {
        self.loaded
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EngineError::Protocol("nothing loaded".into()))
    }
}

#[async_trait]
impl EngineContext for FakeContext {
    async fn navigate(&self, url: &Url) -> Result<(), EngineError> {
        if self.behaviour.hang_navigation {
            futures::future::pending::<()>().await;
        }
        let path = url
            .to_file_path()
            .map_err(|_| EngineError::Navigation("not a file url".into()))?;
        let html = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| EngineError::Navigation(e.to_string()))?;
        let kind = if path.ends_with("cover.html") {
            DocumentKind::Cover
        } else {
            DocumentKind::Body
        };
        *self.loaded.lock().unwrap() = Some((kind, html));
        Ok(())
    }

    async fn image_count(&self) -> Result<usize, EngineError> {
        Ok(self.loaded()?.1.matches("<img ").count())
    }

    async fn wait_for_image(&self, _index: usize) -> Result<ImageState, EngineError> {
        if self.behaviour.hang_images {
            futures::future::pending::<()>().await;
        }
        Ok(ImageState::Errored)
    }

    async fn print_pdf(&self, _options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        let (kind, html) = self.loaded()?;
        if self.behaviour.fail_export == Some(kind) {
            return Err(EngineError::Protocol("printToPDF failed".into()));
        }
        if self.behaviour.garbage_export == Some(kind) {
            return Ok(b"<html>not a pdf</html>".to_vec());
        }
        let pages = match kind {
            DocumentKind::Cover => 1,
            DocumentKind::Body => html.matches(r#"class="line-item""#).count().max(1),
        };
        Ok(fake_pdf(kind.as_str(), pages))
    }

    async fn close(self: Box<Self>) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A real PDF whose page N shows "`label` N".
fn fake_pdf(label: &str, pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for i in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{label} {i}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness (`--nocapture` shows them).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("inspection_report=debug")
        .with_test_writer()
        .try_init();
}

fn item(name: &str, comments: Vec<Comment>) -> LineItem {
    LineItem {
        name: name.into(),
        comments,
        ..Default::default()
    }
}

fn record(sections: Vec<Section>) -> InspectionRecord {
    let mut rec = InspectionRecord {
        inspection: Inspection {
            sections,
            ..Default::default()
        },
        ..Default::default()
    };
    rec.inspection.client_info.name = "Dana Reyes".into();
    rec.inspection.address.full_address = "12 Elm St, Austin, TX 78701".into();
    rec.inspection.schedule.start_time = Some(1_700_000_000_000);
    rec.account.company_name = "Acme Inspections".into();
    rec
}

fn three_item_record() -> InspectionRecord {
    record(vec![Section {
        name: "Structural Systems".into(),
        section_number: "I".into(),
        line_items: vec![
            item("Foundations", vec![]),
            item("Grading and Drainage", vec![]),
            item("Roof Covering", vec![]),
        ],
        ..Default::default()
    }])
}

fn photo_record() -> InspectionRecord {
    record(vec![Section {
        name: "Electrical".into(),
        section_number: "II".into(),
        line_items: vec![item(
            "Service Panel",
            vec![Comment {
                label: "Observation".into(),
                text: "Double-tapped breaker".into(),
                photos: vec![MediaRef {
                    url: "http://10.255.255.1/never.jpg".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        )],
        ..Default::default()
    }])
}

fn config() -> ReportConfig {
    ReportConfig::builder()
        .navigation_timeout(Duration::from_secs(5))
        .image_timeout(Duration::from_millis(200))
        .build()
        .unwrap()
}

fn page_texts(pdf: &Path) -> Vec<String> {
    let doc = Document::load_mem(&std::fs::read(pdf).unwrap()).unwrap();
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
        .collect()
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<PipelineStage>>,
    rendered: Mutex<Vec<(DocumentKind, usize)>>,
    asset_timeouts: AtomicUsize,
    completed: AtomicUsize,
}

impl ReportProgressCallback for Recorder {
    fn on_stage_complete(&self, stage: PipelineStage, _elapsed_ms: u64) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_document_rendered(&self, kind: DocumentKind, pages: usize) {
        self.rendered.lock().unwrap().push((kind, pages));
    }

    fn on_asset_timeout(&self, _kind: DocumentKind, _index: usize) {
        self.asset_timeouts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_report_complete(&self, total_pages: usize) {
        self.completed.store(total_pages, Ordering::SeqCst);
    }
}

// ── Merge and ordering ───────────────────────────────────────────────────

#[tokio::test]
async fn merged_report_is_cover_then_body() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.pdf");
    let engine = FakeEngine::new(Behaviour::default());
    let pipeline = ReportPipeline::new(engine.clone(), config());

    let output = pipeline.run(&three_item_record(), &out, None).await.unwrap();

    assert_eq!(output.cover_pages, 1);
    assert_eq!(output.body_pages, 3);
    assert_eq!(output.page_count, 4);
    assert_eq!(output.path, out);

    let texts = page_texts(&out);
    assert_eq!(texts.len(), 4);
    assert!(texts[0].contains("cover 1"));
    assert!(texts[1].contains("body 1"));
    assert!(texts[3].contains("body 3"));
    assert!(!out.with_extension("pdf.tmp").exists());
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour::default());
    let pipeline = ReportPipeline::new(engine.clone(), config());
    let rec = three_item_record();

    let first = pipeline.run(&rec, dir.path().join("a.pdf"), None).await.unwrap();
    let second = pipeline.run(&rec, dir.path().join("b.pdf"), None).await.unwrap();

    assert_eq!(first.page_count, second.page_count);
    assert_eq!(first.cover_pages, second.cover_pages);
    assert_eq!(
        page_texts(&dir.path().join("a.pdf")),
        page_texts(&dir.path().join("b.pdf"))
    );
}

#[tokio::test]
async fn body_markup_keeps_record_order() {
    let rec = record(vec![
        Section {
            name: "Structural".into(),
            section_number: "I".into(),
            line_items: vec![item("Foundations", vec![]), item("Roof", vec![])],
            ..Default::default()
        },
        Section {
            name: "Plumbing".into(),
            section_number: "III".into(),
            line_items: vec![item("Water Heater", vec![])],
            ..Default::default()
        },
    ]);
    let html = Html::parse_document(&compose_body(&rec, config().timezone));
    let titles: Vec<String> = html
        .select(&Selector::parse(".sec-title, .alpha-title").unwrap())
        .map(|e| e.text().collect::<String>())
        .collect();
    assert_eq!(
        titles,
        vec![
            "I. STRUCTURAL",
            "A. Foundations",
            "B. Roof",
            "III. PLUMBING",
            "A. Water Heater",
        ]
    );
}

// ── Session ownership ────────────────────────────────────────────────────

#[tokio::test]
async fn supplied_session_is_reused_and_not_disposed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour::default());
    let pipeline = ReportPipeline::new(engine.clone(), config());
    let session = pipeline.launch_session().await.unwrap();

    for name in ["one.pdf", "two.pdf"] {
        let output = pipeline
            .run(&three_item_record(), dir.path().join(name), Some(&session))
            .await
            .unwrap();
        assert!(!output.stats.engine_launched);
    }

    assert_eq!(engine.launches(), 1);
    assert_eq!(engine.disposals(), 0);
    assert!(!session.is_disposed());

    session.dispose().await.unwrap();
    session.dispose().await.unwrap();
    assert_eq!(engine.disposals(), 1);
}

#[tokio::test]
async fn owned_session_is_disposed_every_run() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour::default());
    let pipeline = ReportPipeline::new(engine.clone(), config());

    for name in ["one.pdf", "two.pdf"] {
        let output = pipeline
            .run(&three_item_record(), dir.path().join(name), None)
            .await
            .unwrap();
        assert!(output.stats.engine_launched);
    }

    assert_eq!(engine.launches(), 2);
    assert_eq!(engine.disposals(), 2);
    let opened = engine.counters.opened.load(Ordering::SeqCst);
    assert_eq!(opened, 4);
    assert_eq!(engine.counters.closed.load(Ordering::SeqCst), opened);
}

#[tokio::test]
async fn owned_session_is_disposed_on_render_failure() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.pdf");
    let engine = FakeEngine::new(Behaviour {
        fail_export: Some(DocumentKind::Body),
        ..Default::default()
    });
    let pipeline = ReportPipeline::new(engine.clone(), config());

    let err = pipeline.run(&three_item_record(), &out, None).await.unwrap_err();

    match err {
        ReportError::RenderFailure {
            document, stage, ..
        } => {
            assert_eq!(document, DocumentKind::Body);
            assert_eq!(stage, RenderStage::Export);
        }
        other => panic!("expected RenderFailure, got {other}"),
    }
    assert_eq!(engine.disposals(), 1);
    assert!(!out.exists(), "no partial output");
    assert_eq!(
        engine.counters.closed.load(Ordering::SeqCst),
        engine.counters.opened.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn unparseable_export_fails_merge_and_disposes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.pdf");
    let engine = FakeEngine::new(Behaviour {
        garbage_export: Some(DocumentKind::Body),
        ..Default::default()
    });
    let pipeline = ReportPipeline::new(engine.clone(), config());

    let err = pipeline.run(&three_item_record(), &out, None).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::Merge);
    assert!(matches!(err, ReportError::MergeFailure { index: 1, .. }), "got: {err}");
    assert!(!out.exists(), "no partial output");
    assert!(!out.with_extension("pdf.tmp").exists());
    assert_eq!(engine.launches(), 1);
    assert_eq!(engine.disposals(), 1);
}

#[tokio::test]
async fn supplied_session_survives_failed_run() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour {
        fail_export: Some(DocumentKind::Cover),
        ..Default::default()
    });
    let pipeline = ReportPipeline::new(engine.clone(), config());
    let session = pipeline.launch_session().await.unwrap();

    let err = pipeline
        .run(&three_item_record(), dir.path().join("r.pdf"), Some(&session))
        .await
        .unwrap_err();
    assert_eq!(err.document(), Some(DocumentKind::Cover));
    assert_eq!(engine.disposals(), 0);
    assert!(!session.is_disposed());
    session.dispose().await.unwrap();
}

#[tokio::test]
async fn disposed_session_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour::default());
    let pipeline = ReportPipeline::new(engine.clone(), config());
    let session = pipeline.launch_session().await.unwrap();
    session.dispose().await.unwrap();

    let err = pipeline
        .run(&three_item_record(), dir.path().join("r.pdf"), Some(&session))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::SessionDisposed));
    assert_eq!(err.stage(), PipelineStage::EngineStart);
    assert_eq!(engine.launches(), 1);
}

#[tokio::test]
async fn launch_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("r.pdf");
    let engine = FakeEngine::new(Behaviour {
        fail_launch: true,
        ..Default::default()
    });
    let pipeline = ReportPipeline::new(engine.clone(), config());

    let err = pipeline.run(&three_item_record(), &out, None).await.unwrap_err();
    assert_eq!(err.stage(), PipelineStage::EngineStart);
    assert!(err.to_string().contains("chrome not found"));
    assert!(!out.exists());
}

// ── Timeouts ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn hanging_image_does_not_block_render() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour {
        hang_images: true,
        ..Default::default()
    });
    let recorder = Arc::new(Recorder::default());
    let config = ReportConfig::builder()
        .image_timeout(Duration::from_millis(100))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let pipeline = ReportPipeline::new(engine.clone(), config);

    let start = Instant::now();
    let output = pipeline
        .run(&photo_record(), dir.path().join("r.pdf"), None)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(output.page_count >= 2);
    assert_eq!(output.stats.body.images_found, 1);
    assert_eq!(output.stats.body.images_abandoned, 1);
    assert_eq!(output.stats.images_abandoned(), 1);
    assert_eq!(recorder.asset_timeouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn navigation_timeout_fails_the_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new(Behaviour {
        hang_navigation: true,
        ..Default::default()
    });
    let config = ReportConfig::builder()
        .navigation_timeout(Duration::from_millis(150))
        .build()
        .unwrap();
    let pipeline = ReportPipeline::new(engine.clone(), config);

    let err = pipeline
        .run(&three_item_record(), dir.path().join("r.pdf"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::RenderFailure {
            stage: RenderStage::NavigationTimeout,
            ..
        }
    ));
    assert_eq!(engine.disposals(), 1);
}

// ── Markup safety and the end-to-end scenario ────────────────────────────

#[tokio::test]
async fn comment_markup_stays_text() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let rec = record(vec![Section {
        name: "Interior <b>".into(),
        section_number: "IV".into(),
        line_items: vec![item(
            "Walls & \"Ceilings\"",
            vec![Comment {
                label: "Note".into(),
                text: "<script>alert('x')</script> & </div></div>".into(),
                ..Default::default()
            }],
        )],
        ..Default::default()
    }]);
    let config = ReportConfig::builder().work_dir(&work).build().unwrap();
    let pipeline = ReportPipeline::new(FakeEngine::new(Behaviour::default()), config);
    pipeline.run(&rec, dir.path().join("r.pdf"), None).await.unwrap();

    let body = std::fs::read_to_string(work.join("body.html")).unwrap();
    let html = Html::parse_document(&body);
    assert_eq!(html.select(&Selector::parse("script").unwrap()).count(), 0);
    assert_eq!(html.select(&Selector::parse("b").unwrap()).count(), 0);

    let narrative: String = html
        .select(&Selector::parse(".comment-block.narrative").unwrap())
        .flat_map(|e| e.text())
        .collect();
    assert!(narrative.contains("<script>alert('x')</script> & </div></div>"));
    // The closing tags in the text did not close the layout.
    assert_eq!(html.select(&Selector::parse(".page .section-container").unwrap()).count(), 1);
    assert!(work.join("cover.pdf").exists());
    assert!(work.join("body.pdf").exists());
}

#[tokio::test]
async fn checklist_and_photo_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let rec = record(vec![Section {
        name: "Structural Systems".into(),
        section_number: "I".into(),
        line_items: vec![
            item(
                "Foundations",
                vec![Comment {
                    label: "Type of Foundation".into(),
                    input_type: "checklist".into(),
                    options: vec!["Slab".into(), "Pier and Beam".into(), "Other".into()],
                    selected_options: vec!["Slab".into()],
                    ..Default::default()
                }],
            ),
            item(
                "Grading and Drainage",
                vec![Comment {
                    label: "Comments".into(),
                    text: "Soil is graded toward the foundation.".into(),
                    photos: vec![MediaRef {
                        url: "not a url at all".into(),
                        caption: Some("East side".into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
            ),
        ],
        ..Default::default()
    }]);
    let recorder = Arc::new(Recorder::default());
    let config = ReportConfig::builder()
        .work_dir(&work)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let pipeline = ReportPipeline::new(FakeEngine::new(Behaviour::default()), config);

    let output = pipeline.run(&rec, dir.path().join("r.pdf"), None).await.unwrap();
    assert_eq!(output.page_count, output.cover_pages + output.body_pages);
    assert_eq!(output.cover_pages, 1);
    assert_eq!(output.body_pages, 2);

    let html = Html::parse_document(&std::fs::read_to_string(work.join("body.html")).unwrap());
    let items = Selector::parse(".checklist .checklist-item input").unwrap();
    let checked = Selector::parse(".checklist .checklist-item input[checked]").unwrap();
    assert_eq!(html.select(&items).count(), 3);
    assert_eq!(html.select(&checked).count(), 1);
    let images: Vec<_> = html.select(&Selector::parse(".media-item img").unwrap()).collect();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].value().attr("src"), Some("not a url at all"));
    assert_eq!(output.stats.body.images_found, 1);
    assert_eq!(output.stats.body.images_settled, 1);

    assert_eq!(recorder.completed.load(Ordering::SeqCst), output.page_count);
    let rendered = recorder.rendered.lock().unwrap().clone();
    assert_eq!(rendered, vec![(DocumentKind::Cover, 1), (DocumentKind::Body, 2)]);
    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Compose,
            PipelineStage::Persist,
            PipelineStage::Render,
            PipelineStage::Merge,
            PipelineStage::Output,
        ]
    );
}
