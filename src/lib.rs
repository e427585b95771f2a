//! # inspection-report
//!
//! Render a property-inspection record into one paginated PDF: a fixed
//! cover/disclosure page followed by the data-driven inspection sections.
//!
//! ## Why a browser?
//!
//! The report form is laid out with ordinary HTML and CSS, and paginated by
//! the browser's print engine, which also stamps a header and a "Page N of M"
//! footer on every page. The two documents are printed separately (they use
//! different margins and overlays) and then concatenated structurally with
//! `lopdf`, so nothing is rasterised twice.
//!
//! ## Pipeline Overview
//!
//! ```text
//! InspectionRecord
//!  │
//!  ├─ 1. Prepare  start (or borrow) a Chromium session ∥ compose cover + body HTML
//!  ├─ 2. Persist  write cover.html / body.html to the work directory
//!  ├─ 3. Render   one tab per document, concurrently: parse → settle images → print
//!  ├─ 4. Merge    [cover, body] by structural page copy
//!  └─ 5. Output   atomic write of the merged PDF; dispose the session if we started it
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inspection_report::{generate_report, load_record, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let record = load_record("inspection.json").await?;
//!     let output = generate_report(&record, "report.pdf", &ReportConfig::default()).await?;
//!     eprintln!("{} pages ({} cover + {} body)",
//!         output.page_count, output.cover_pages, output.body_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Reusing one browser
//!
//! Starting Chromium dominates the cost of a small report. Batch callers
//! launch a session once and pass it to each run; the runs leave it alone
//! and the caller disposes it at the end:
//!
//! ```rust,no_run
//! use inspection_report::{load_record, ReportConfig, ReportPipeline};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ReportPipeline::chromium(ReportConfig::default());
//! let session = pipeline.launch_session().await?;
//! for name in ["a", "b"] {
//!     let record = load_record(format!("{name}.json")).await?;
//!     pipeline.run(&record, format!("{name}.pdf"), Some(&session)).await?;
//! }
//! session.dispose().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `inspection-report` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! inspection-report = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::PdfArtifact;
pub use compose::MarkupDocument;
pub use config::{EngineConfig, Margins, PageConfig, PageSize, ReportConfig, ReportConfigBuilder};
pub use engine::chromium::ChromiumEngine;
pub use engine::{EngineContext, EngineError, EngineSession, ImageState, PrintOptions, RenderingEngine};
pub use error::{DocumentKind, PipelineStage, RenderStage, ReportError};
pub use model::{load_record, InspectionRecord};
pub use output::{RenderReport, ReportOutput, ReportStats};
pub use pipeline::render::AssetSettlement;
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback};
pub use report::{generate_report, generate_report_sync, ReportPipeline};
pub use session::{Ownership, SessionHandle, SessionLease};
