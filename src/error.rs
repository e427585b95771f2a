//! Error types for the inspection-report library.
//!
//! Every failure that reaches the caller is fatal for the run: the pipeline
//! either persists the complete merged PDF or persists nothing. There is no
//! internal retry, because after a failed navigation or export the state of
//! the browser process is not something we can reason about. Callers that
//! want retries re-run the whole job.
//!
//! One outcome is deliberately *not* an error: an image that neither loads
//! nor fails within the per-image timeout. That is reported as
//! [`crate::pipeline::render::AssetSettlement::TimedOut`], logged, counted in
//! [`crate::output::ReportStats`], and rendering carries on.
//!
//! [`ReportError::stage`] maps every variant to the [`PipelineStage`] it came
//! from, and [`ReportError::RenderFailure`] names the document that broke, so
//! a failed run can always be diagnosed from its error alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two documents of a report an artifact or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// The fixed-layout cover / disclosure page.
    Cover,
    /// The data-driven inspection sections.
    Body,
}

impl DocumentKind {
    /// Stable lowercase name, used for intermediate file names and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Cover => "cover",
            DocumentKind::Body => "body",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step inside a single document render that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderStage {
    /// The session could not open a fresh context (or was already disposed).
    OpenContext,
    /// The engine rejected the navigation.
    Navigation,
    /// The document did not finish parsing before the navigation deadline.
    NavigationTimeout,
    /// PDF export failed.
    Export,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderStage::OpenContext => "open context",
            RenderStage::Navigation => "navigation",
            RenderStage::NavigationTimeout => "navigation timeout",
            RenderStage::Export => "pdf export",
        };
        f.write_str(s)
    }
}

/// Coarse pipeline stage, for "which part of the run failed" reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Config,
    EngineStart,
    Compose,
    Persist,
    Render,
    Merge,
    Output,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Config => "config",
            PipelineStage::EngineStart => "engine start",
            PipelineStage::Compose => "compose",
            PipelineStage::Persist => "persist markup",
            PipelineStage::Render => "render",
            PipelineStage::Merge => "merge",
            PipelineStage::Output => "write output",
        };
        f.write_str(s)
    }
}

/// All errors returned by the inspection-report library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Engine errors ─────────────────────────────────────────────────────
    /// The headless browser could not be started (missing binary, resource
    /// exhaustion, launch timeout).
    #[error(
        "Rendering engine failed to start: {detail}\n\
Check that Chrome/Chromium is installed, or pass its path with --chrome."
    )]
    EngineStartFailure { detail: String },

    /// A caller-supplied session had already been disposed when the run
    /// tried to acquire it.
    #[error("Rendering session has already been disposed")]
    SessionDisposed,

    // ── Render errors ─────────────────────────────────────────────────────
    /// Navigation or export failed for one of the two documents.
    #[error("Rendering the {document} document failed during {stage}: {detail}")]
    RenderFailure {
        document: DocumentKind,
        stage: RenderStage,
        detail: String,
    },

    // ── Merge errors ──────────────────────────────────────────────────────
    /// An input artifact is not a structurally valid PDF.
    #[error("Merge failed on input #{index}: {detail}")]
    MergeFailure { index: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not persist an intermediate markup document.
    #[error("Failed to write {document} markup to '{path}': {source}")]
    MarkupWriteFailed {
        document: DocumentKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the run's work directory.
    #[error("Failed to prepare work directory '{path}': {source}")]
    WorkDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the final PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Input / config errors ─────────────────────────────────────────────
    /// The inspection record could not be read or parsed.
    #[error("Invalid inspection record: {0}")]
    InvalidRecord(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a worker task panicked), tagged with
    /// the stage it happened in.
    #[error("Internal error during {stage}: {detail}")]
    Internal { stage: PipelineStage, detail: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Shorthand for a [`ReportError::RenderFailure`].
    pub fn render(document: DocumentKind, stage: RenderStage, detail: impl Into<String>) -> Self {
        Self::RenderFailure {
            document,
            stage,
            detail: detail.into(),
        }
    }

    /// Shorthand for a [`ReportError::MergeFailure`].
    pub fn merge(index: usize, detail: impl Into<String>) -> Self {
        Self::MergeFailure {
            index,
            detail: detail.into(),
        }
    }

    /// Shorthand for a [`ReportError::Internal`].
    pub fn internal(stage: PipelineStage, detail: impl Into<String>) -> Self {
        Self::Internal {
            stage,
            detail: detail.into(),
        }
    }

    /// The pipeline stage this error originated from.
    pub fn stage(&self) -> PipelineStage {
        match self {
            ReportError::EngineStartFailure { .. } | ReportError::SessionDisposed => {
                PipelineStage::EngineStart
            }
            ReportError::RenderFailure { .. } => PipelineStage::Render,
            ReportError::MergeFailure { .. } => PipelineStage::Merge,
            ReportError::MarkupWriteFailed { .. } | ReportError::WorkDirFailed { .. } => {
                PipelineStage::Persist
            }
            ReportError::OutputWriteFailed { .. } => PipelineStage::Output,
            ReportError::InvalidRecord(_) => PipelineStage::Compose,
            ReportError::InvalidConfig(_) => PipelineStage::Config,
            ReportError::Internal { stage, .. } => *stage,
        }
    }

    /// The document a render failure belongs to, if any.
    pub fn document(&self) -> Option<DocumentKind> {
        match self {
            ReportError::RenderFailure { document, .. }
            | ReportError::MarkupWriteFailed { document, .. } => Some(*document),
            _ => None,
        }
    }
}
