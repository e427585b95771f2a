//! Page renderer: persisted markup → PDF bytes on one engine context.
//!
//! ## Steps
//!
//! 1. navigate to the markup's `file://` URL and wait until the document is
//!    parsed (not fully loaded), under the navigation deadline;
//! 2. wait for every `<img>` to load or fail, each under its own timeout,
//!    all images in parallel;
//! 3. export a paginated PDF with the document's page geometry and overlays.
//!
//! ## Why settle images separately?
//!
//! A "fully loaded" wait is held hostage by the slowest remote photo. Parsing
//! completes as soon as the markup is read; images are then given a bounded
//! window each, and one that neither loads nor fails is abandoned so the
//! export still happens. An abandoned image is never an error.
//!
//! The context is always closed before returning, on success and failure, so
//! a long-lived session does not accumulate tabs.

use crate::artifact::PdfArtifact;
use crate::config::PageConfig;
use crate::engine::{EngineContext, EngineError, ImageState, PrintOptions};
use crate::error::{DocumentKind, RenderStage, ReportError, Result};
use crate::output::RenderReport;
use crate::progress::ProgressCallback;
use crate::session::SessionHandle;
use futures::future::join_all;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of waiting on one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSettlement {
    Loaded,
    Errored,
    /// Neither loaded nor failed within the per-image timeout.
    TimedOut,
}

/// Everything needed to render one document.
#[derive(Debug, Clone)]
pub struct RenderJob<'a> {
    pub kind: DocumentKind,
    pub url: Url,
    pub page: &'a PageConfig,
    pub navigation_timeout: Duration,
    pub image_timeout: Duration,
}

/// Open a context on `session`, render `job` on it, and close it again.
pub async fn render_document(
    session: &SessionHandle,
    job: RenderJob<'_>,
    progress: Option<&ProgressCallback>,
) -> Result<(PdfArtifact, RenderReport)> {
    let kind = job.kind;
    let context = session.open_context().await.map_err(|e| match e {
        EngineError::Disposed => ReportError::render(
            kind,
            RenderStage::OpenContext,
            ReportError::SessionDisposed.to_string(),
        ),
        other => ReportError::render(kind, RenderStage::OpenContext, other.to_string()),
    })?;

    let result = render(context.as_ref(), job, progress).await;
    context.close().await;
    result
}

/// Render one document on an already-open context.
pub async fn render(
    context: &dyn EngineContext,
    job: RenderJob<'_>,
    progress: Option<&ProgressCallback>,
) -> Result<(PdfArtifact, RenderReport)> {
    let start = Instant::now();
    let kind = job.kind;

    // ── Step 1: Navigate and wait for parse ──────────────────────────────
    match tokio::time::timeout(job.navigation_timeout, context.navigate(&job.url)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(ReportError::render(kind, RenderStage::Navigation, e.to_string())),
        Err(_) => {
            return Err(ReportError::render(
                kind,
                RenderStage::NavigationTimeout,
                format!(
                    "document not parsed within {}ms",
                    job.navigation_timeout.as_millis()
                ),
            ))
        }
    }
    debug!("{} parsed after {}ms", kind, start.elapsed().as_millis());

    // ── Step 2: Settle images ────────────────────────────────────────────
    let settlements = settle_images(context, kind, job.image_timeout).await;
    let abandoned: Vec<usize> = settlements
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == AssetSettlement::TimedOut)
        .map(|(i, _)| i)
        .collect();
    for &index in &abandoned {
        warn!(
            "{} image #{} not settled within {}ms; rendering without it",
            kind,
            index,
            job.image_timeout.as_millis()
        );
        if let Some(cb) = progress {
            cb.on_asset_timeout(kind, index);
        }
    }

    // ── Step 3: Export ───────────────────────────────────────────────────
    let options = PrintOptions::from(job.page);
    let bytes = context
        .print_pdf(&options)
        .await
        .map_err(|e| ReportError::render(kind, RenderStage::Export, e.to_string()))?;
    if bytes.is_empty() {
        return Err(ReportError::render(
            kind,
            RenderStage::Export,
            "engine returned an empty PDF",
        ));
    }

    let report = RenderReport {
        kind: Some(kind),
        images_found: settlements.len(),
        images_settled: settlements.len() - abandoned.len(),
        images_abandoned: abandoned.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Rendered {} in {}ms ({} bytes, {}/{} images settled)",
        kind,
        report.duration_ms,
        bytes.len(),
        report.images_settled,
        report.images_found
    );

    Ok((PdfArtifact::rendered(kind, bytes), report))
}

/// Wait for every image of the current document, in parallel, each bounded
/// by `timeout`. Returns one settlement per image, in document order.
pub async fn settle_images(
    context: &dyn EngineContext,
    kind: DocumentKind,
    timeout: Duration,
) -> Vec<AssetSettlement> {
    let count = match context.image_count().await {
        Ok(n) => n,
        Err(e) => {
            warn!("{}: could not count images, exporting without waiting: {}", kind, e);
            return Vec::new();
        }
    };
    if count == 0 {
        return Vec::new();
    }
    debug!("{}: waiting on {} image(s)", kind, count);

    join_all((0..count).map(|index| async move {
        match tokio::time::timeout(timeout, context.wait_for_image(index)).await {
            Ok(Ok(ImageState::Loaded)) => AssetSettlement::Loaded,
            Ok(Ok(ImageState::Errored)) => AssetSettlement::Errored,
            Ok(Err(e)) => {
                debug!("{} image #{} probe failed: {}", kind, index, e);
                AssetSettlement::Errored
            }
            Err(_) => AssetSettlement::TimedOut,
        }
    }))
    .await
}
