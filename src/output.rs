//! Result types returned by a report run.

use crate::error::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutput {
    /// Where the merged PDF was written.
    pub path: PathBuf,
    /// Pages in the merged PDF (`cover_pages + body_pages`).
    pub page_count: usize,
    pub cover_pages: usize,
    pub body_pages: usize,
    pub stats: ReportStats,
}

/// Timings and asset counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    /// Engine start + composition (they overlap).
    pub prepare_duration_ms: u64,
    pub persist_duration_ms: u64,
    /// Both renders (they overlap).
    pub render_duration_ms: u64,
    pub merge_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Whether this run started (and disposed) its own engine process.
    pub engine_launched: bool,
    pub cover: RenderReport,
    pub body: RenderReport,
}

impl ReportStats {
    /// Images abandoned after the per-image timeout, both documents.
    pub fn images_abandoned(&self) -> usize {
        self.cover.images_abandoned + self.body.images_abandoned
    }
}

/// What one document render observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderReport {
    pub kind: Option<DocumentKind>,
    pub images_found: usize,
    /// Loaded or errored within the per-image timeout.
    pub images_settled: usize,
    pub images_abandoned: usize,
    pub duration_ms: u64,
}
