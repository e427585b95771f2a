//! Progress-callback trait for report-generation events.
//!
//! Inject an [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to observe a run
//! as it moves through its stages. The CLI uses this to drive a spinner;
//! a service could forward the events to a job table instead.
//!
//! # Example
//!
//! ```rust
//! use inspection_report::{DocumentKind, ReportConfig, ReportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: Arc<AtomicUsize>,
//! }
//!
//! impl ReportProgressCallback for PageCounter {
//!     fn on_document_rendered(&self, kind: DocumentKind, pages: usize) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!         eprintln!("{kind} rendered: {pages} page(s)");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter {
//!     pages: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(counter as Arc<dyn ReportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{DocumentKind, PipelineStage};
use std::sync::Arc;

/// Called by the pipeline as a report run progresses.
///
/// Implementations must be `Send + Sync`: the cover and body renders run
/// concurrently, so `on_document_rendered` and `on_asset_timeout` may be
/// called from both at once. All methods default to no-ops.
pub trait ReportProgressCallback: Send + Sync {
    /// Called once, before the engine is acquired.
    fn on_report_start(&self) {}

    /// Called when a pipeline stage finishes.
    ///
    /// # Arguments
    /// * `stage`: the stage that just completed
    /// * `elapsed_ms`: wall-clock time spent in it
    fn on_stage_complete(&self, stage: PipelineStage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when one of the two documents has been exported.
    fn on_document_rendered(&self, kind: DocumentKind, pages: usize) {
        let _ = (kind, pages);
    }

    /// Called for each image that was abandoned after the per-image timeout.
    ///
    /// `index` is the image's position in document order.
    fn on_asset_timeout(&self, kind: DocumentKind, index: usize) {
        let _ = (kind, index);
    }

    /// Called once the merged report has been written.
    fn on_report_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;
