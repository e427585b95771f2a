//! Report orchestration: record → merged PDF on disk.
//!
//! ```text
//!            ┌─ acquire session ─────────────┐
//! record ────┤                               ├─▶ persist ×2 ─▶ render ×2 ─▶ merge ─▶ write
//!            └─ compose cover ∥ compose body ┘   (concurrent)   (concurrent)  [cover, body]
//! ```
//!
//! A session started by the run is disposed by the run before it returns,
//! on success and on failure. A session supplied by the caller is only
//! borrowed and is left running.

use crate::artifact::PdfArtifact;
use crate::compose::{self, format_date, MarkupDocument};
use crate::config::{PageConfig, ReportConfig};
use crate::engine::chromium::ChromiumEngine;
use crate::engine::RenderingEngine;
use crate::error::{DocumentKind, PipelineStage, ReportError, Result};
use crate::model::InspectionRecord;
use crate::output::{ReportOutput, ReportStats};
use crate::pipeline::merge;
use crate::pipeline::render::{render_document, RenderJob};
use crate::session::{Ownership, SessionHandle, SessionLease};
use chrono::FixedOffset;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};
use url::Url;

/// Where intermediate markup and PDFs live during a run.
enum WorkDir {
    /// Caller-chosen; kept after the run for inspection.
    Kept(PathBuf),
    /// Removed when dropped.
    Temp(TempDir),
}

impl WorkDir {
    async fn prepare(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(dir) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| ReportError::WorkDirFailed {
                        path: dir.to_path_buf(),
                        source: e,
                    })?;
                // file:// URLs need an absolute path.
                let dir = tokio::fs::canonicalize(dir)
                    .await
                    .map_err(|e| ReportError::WorkDirFailed {
                        path: dir.to_path_buf(),
                        source: e,
                    })?;
                Ok(WorkDir::Kept(dir))
            }
            None => tempfile::Builder::new()
                .prefix("inspection-report-")
                .tempdir()
                .map(WorkDir::Temp)
                .map_err(|e| ReportError::WorkDirFailed {
                    path: std::env::temp_dir(),
                    source: e,
                }),
        }
    }

    fn path(&self) -> &Path {
        match self {
            WorkDir::Kept(p) => p,
            WorkDir::Temp(t) => t.path(),
        }
    }

    fn is_kept(&self) -> bool {
        matches!(self, WorkDir::Kept(_))
    }
}

/// Drives one report run end to end.
///
/// The pipeline is cheap to construct and holds no engine process itself;
/// each [`run`](Self::run) either starts one or borrows the caller's.
pub struct ReportPipeline {
    engine: Arc<dyn RenderingEngine>,
    config: ReportConfig,
}

impl ReportPipeline {
    pub fn new(engine: Arc<dyn RenderingEngine>, config: ReportConfig) -> Self {
        Self { engine, config }
    }

    /// A pipeline backed by a locally installed Chrome/Chromium.
    pub fn chromium(config: ReportConfig) -> Self {
        Self::new(Arc::new(ChromiumEngine), config)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Start an engine process the caller can pass to several runs.
    ///
    /// The caller owns it and must call [`SessionHandle::dispose`].
    pub async fn launch_session(&self) -> Result<SessionHandle> {
        SessionHandle::launch(self.engine.as_ref(), &self.config.engine).await
    }

    /// Generate the report for `record` and write it to `output_path`.
    ///
    /// Pass `session` to reuse a live engine; it is not disposed. Without
    /// one the run starts its own engine and disposes it before returning.
    /// Runs sharing one session must not overlap.
    pub async fn run(
        &self,
        record: &InspectionRecord,
        output_path: impl AsRef<Path>,
        session: Option<&SessionHandle>,
    ) -> Result<ReportOutput> {
        let total_start = Instant::now();
        let output_path = output_path.as_ref();
        info!("Starting report: {}", output_path.display());
        self.notify(|cb| cb.on_report_start());

        // ── Step 1: Acquire session ∥ compose ────────────────────────────
        let prepare_start = Instant::now();
        let (lease, documents) = tokio::join!(
            SessionLease::acquire(self.engine.as_ref(), &self.config.engine, session),
            compose_documents(record, self.config.timezone),
        );
        let lease = lease?;
        let prepare_duration_ms = prepare_start.elapsed().as_millis() as u64;

        let result = async {
            let (cover, body) = documents?;
            self.notify(|cb| cb.on_stage_complete(PipelineStage::Compose, prepare_duration_ms));
            self.run_with_session(record, output_path, lease.handle(), cover, body)
                .await
        }
        .await;

        let engine_launched = lease.ownership() == Ownership::Owned;
        lease.release().await;

        let mut output = result?;
        output.stats.prepare_duration_ms = prepare_duration_ms;
        output.stats.engine_launched = engine_launched;
        output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Report complete: {} pages ({} cover + {} body), {}ms total",
            output.page_count, output.cover_pages, output.body_pages, output.stats.total_duration_ms
        );
        self.notify(|cb| cb.on_report_complete(output.page_count));
        Ok(output)
    }

    async fn run_with_session(
        &self,
        record: &InspectionRecord,
        output_path: &Path,
        session: &SessionHandle,
        cover: MarkupDocument,
        body: MarkupDocument,
    ) -> Result<ReportOutput> {
        let mut stats = ReportStats::default();

        // ── Step 2: Persist markup ───────────────────────────────────────
        let persist_start = Instant::now();
        let work_dir = WorkDir::prepare(self.config.work_dir.as_deref()).await?;
        let (cover_url, body_url) =
            futures::try_join!(persist(work_dir.path(), &cover), persist(work_dir.path(), &body))?;
        stats.persist_duration_ms = persist_start.elapsed().as_millis() as u64;
        self.notify(|cb| cb.on_stage_complete(PipelineStage::Persist, stats.persist_duration_ms));

        // ── Step 3: Render both documents ────────────────────────────────
        let render_start = Instant::now();
        let cover_page = self.cover_page();
        let body_page = self.body_page(record);
        let progress = self.config.progress_callback.as_ref();
        // join, not try_join: each render closes its own context, so a failure
        // in one must not cancel the other mid-flight.
        let (cover_rendered, body_rendered) = tokio::join!(
            render_document(session, self.job(DocumentKind::Cover, cover_url, &cover_page), progress),
            render_document(session, self.job(DocumentKind::Body, body_url, &body_page), progress),
        );
        let (cover_pdf, cover_report) = cover_rendered?;
        let (body_pdf, body_report) = body_rendered?;
        stats.render_duration_ms = render_start.elapsed().as_millis() as u64;
        stats.cover = cover_report;
        stats.body = body_report;
        self.notify(|cb| cb.on_stage_complete(PipelineStage::Render, stats.render_duration_ms));

        if work_dir.is_kept() {
            futures::try_join!(
                keep_pdf(work_dir.path(), &cover_pdf),
                keep_pdf(work_dir.path(), &body_pdf)
            )?;
        }

        // ── Step 4: Merge [cover, body] ──────────────────────────────────
        let merge_start = Instant::now();
        let (merged, counts) = tokio::task::spawn_blocking(move || {
            merge::merge_counted(&[cover_pdf, body_pdf])
        })
        .await
        .map_err(|e| {
            ReportError::internal(PipelineStage::Merge, format!("Merge task panicked: {}", e))
        })??;
        let (cover_pages, body_pages) = (counts[0], counts[1]);
        stats.merge_duration_ms = merge_start.elapsed().as_millis() as u64;
        self.notify(|cb| {
            cb.on_document_rendered(DocumentKind::Cover, cover_pages);
            cb.on_document_rendered(DocumentKind::Body, body_pages);
            cb.on_stage_complete(PipelineStage::Merge, stats.merge_duration_ms);
        });
        debug!(
            "Merged {} + {} pages in {}ms",
            cover_pages, body_pages, stats.merge_duration_ms
        );

        // ── Step 5: Write output ─────────────────────────────────────────
        let write_start = Instant::now();
        write_output(output_path, merged.bytes()).await?;
        self.notify(|cb| {
            cb.on_stage_complete(PipelineStage::Output, write_start.elapsed().as_millis() as u64)
        });

        Ok(ReportOutput {
            path: output_path.to_path_buf(),
            page_count: cover_pages + body_pages,
            cover_pages,
            body_pages,
            stats,
        })
    }

    fn job<'a>(&self, kind: DocumentKind, url: Url, page: &'a PageConfig) -> RenderJob<'a> {
        RenderJob {
            kind,
            url,
            page,
            navigation_timeout: self.config.navigation_timeout,
            image_timeout: self.config.image_timeout,
        }
    }

    fn cover_page(&self) -> PageConfig {
        self.config
            .cover_page
            .clone()
            .unwrap_or_else(PageConfig::cover_default)
    }

    fn body_page(&self, record: &InspectionRecord) -> PageConfig {
        self.config.body_page.clone().unwrap_or_else(|| {
            let insp = &record.inspection;
            PageConfig::body_default(
                &insp.address.full_address,
                &format_date(insp.schedule.local_time(self.config.timezone)),
            )
        })
    }

    fn notify(&self, f: impl FnOnce(&dyn crate::progress::ReportProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            f(cb.as_ref());
        }
    }
}

/// Run both composers on blocking threads, concurrently.
async fn compose_documents(
    record: &InspectionRecord,
    timezone: FixedOffset,
) -> Result<(MarkupDocument, MarkupDocument)> {
    let record = Arc::new(record.clone());
    let spawn = |kind: DocumentKind| {
        let record = Arc::clone(&record);
        tokio::task::spawn_blocking(move || compose::compose(kind, &record, timezone))
    };
    let (cover, body) = tokio::join!(spawn(DocumentKind::Cover), spawn(DocumentKind::Body));
    let panicked = |e: tokio::task::JoinError| {
        ReportError::internal(PipelineStage::Compose, format!("Compose task panicked: {}", e))
    };
    Ok((cover.map_err(panicked)?, body.map_err(panicked)?))
}

/// Write a document's markup into `dir` and return its `file://` URL.
async fn persist(dir: &Path, doc: &MarkupDocument) -> Result<Url> {
    let path = dir.join(doc.file_name());
    tokio::fs::write(&path, &doc.html)
        .await
        .map_err(|e| ReportError::MarkupWriteFailed {
            document: doc.kind,
            path: path.clone(),
            source: e,
        })?;
    file_url(&path)
}

fn file_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|()| {
        ReportError::internal(
            PipelineStage::Persist,
            format!("not an absolute path: {}", path.display()),
        )
    })
}

/// Keep an intermediate PDF next to its markup (`cover.pdf`, `body.pdf`).
async fn keep_pdf(dir: &Path, artifact: &PdfArtifact) -> Result<()> {
    let name = artifact.kind().map(DocumentKind::as_str).unwrap_or("merged");
    let path = dir.join(format!("{name}.pdf"));
    tokio::fs::write(&path, artifact.bytes())
        .await
        .map_err(|e| ReportError::OutputWriteFailed { path, source: e })
}

/// Atomic write: temp file next to the target, then rename.
async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let failed = |e: std::io::Error| ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    Ok(())
}

/// Generate a report with a fresh Chromium session.
///
/// # Example
/// ```rust,no_run
/// use inspection_report::{generate_report, load_record, ReportConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let record = load_record("inspection.json").await?;
/// let output = generate_report(&record, "report.pdf", &ReportConfig::default()).await?;
/// println!("{} pages", output.page_count);
/// # Ok(())
/// # }
/// ```
pub async fn generate_report(
    record: &InspectionRecord,
    output_path: impl AsRef<Path>,
    config: &ReportConfig,
) -> Result<ReportOutput> {
    ReportPipeline::chromium(config.clone())
        .run(record, output_path, None)
        .await
}

/// Synchronous wrapper around [`generate_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_report_sync(
    record: &InspectionRecord,
    output_path: impl AsRef<Path>,
    config: &ReportConfig,
) -> Result<ReportOutput> {
    tokio::runtime::Runtime::new()
        .map_err(|e| {
            ReportError::internal(
                PipelineStage::Config,
                format!("Failed to create tokio runtime: {}", e),
            )
        })?
        .block_on(generate_report(record, output_path, config))
}
