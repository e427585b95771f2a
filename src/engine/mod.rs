//! Rendering-engine seam.
//!
//! The pipeline talks to a headless browser only through these three traits:
//!
//! ```text
//! RenderingEngine ──launch──▶ EngineSession ──open_context──▶ EngineContext
//!  (factory)                  (one process)                  (one tab)
//! ```
//!
//! [`chromium`] is the production implementation. Tests drive the pipeline
//! with an in-process double that implements the same traits.
//!
//! Contexts of one session are independent: two may be driven concurrently,
//! and a failure in one leaves the other usable. Once a session is disposed
//! every call on it, and on contexts it opened, returns
//! [`EngineError::Disposed`].

pub mod chromium;

use crate::config::{EngineConfig, PageConfig};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Low-level engine failure, before the pipeline attaches document context.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine session has been disposed")]
    Disposed,

    #[error("failed to launch engine: {0}")]
    Launch(String),

    #[error("navigation rejected: {0}")]
    Navigation(String),

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Terminal state of one embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Loaded,
    Errored,
}

/// Export parameters handed to the engine, in the engine's units (inches).
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub print_background: bool,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
}

/// Blank overlay; stops the engine printing its own default header/footer
/// when only one of the two is configured.
const EMPTY_OVERLAY: &str = "<span></span>";

impl PrintOptions {
    /// Whether the engine should reserve header/footer boxes at all.
    pub fn has_overlays(&self) -> bool {
        self.header_template.is_some() || self.footer_template.is_some()
    }

    /// Header markup to send, blank when only a footer is configured.
    pub fn header_or_blank(&self) -> Option<String> {
        self.has_overlays().then(|| {
            self.header_template
                .clone()
                .unwrap_or_else(|| EMPTY_OVERLAY.to_string())
        })
    }

    /// Footer markup to send, blank when only a header is configured.
    pub fn footer_or_blank(&self) -> Option<String> {
        self.has_overlays().then(|| {
            self.footer_template
                .clone()
                .unwrap_or_else(|| EMPTY_OVERLAY.to_string())
        })
    }
}

impl From<&PageConfig> for PrintOptions {
    fn from(page: &PageConfig) -> Self {
        let (paper_width, paper_height) = page.size.inches();
        let (margin_top, margin_right, margin_bottom, margin_left) = page.margins.inches();
        Self {
            paper_width,
            paper_height,
            margin_top,
            margin_right,
            margin_bottom,
            margin_left,
            print_background: page.print_background,
            header_template: page.header.as_ref().map(|h| h.as_str().to_string()),
            footer_template: page.footer.as_ref().map(|f| f.as_str().to_string()),
        }
    }
}

/// Factory for engine sessions.
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Start one engine process and return it ready for contexts.
    async fn launch(&self, config: &EngineConfig) -> EngineResult<Arc<dyn EngineSession>>;
}

/// One live engine process.
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Open a fresh, independent navigable context.
    async fn open_context(&self) -> EngineResult<Box<dyn EngineContext>>;

    /// Terminate the process and every context it owns. Idempotent.
    async fn dispose(&self) -> EngineResult<()>;

    fn is_disposed(&self) -> bool;
}

/// One navigable page of a session.
#[async_trait]
pub trait EngineContext: Send + Sync {
    /// Navigate to `url` and return once the document has been parsed
    /// (subresources may still be loading). Callers apply their own deadline.
    async fn navigate(&self, url: &Url) -> EngineResult<()>;

    /// Number of `<img>` elements in the current document.
    async fn image_count(&self) -> EngineResult<usize>;

    /// Resolve when image `index` has loaded or failed. May never resolve
    /// for a stalled request; callers bound it with a timeout.
    async fn wait_for_image(&self, index: usize) -> EngineResult<ImageState>;

    /// Export the current document as PDF bytes.
    async fn print_pdf(&self, options: &PrintOptions) -> EngineResult<Vec<u8>>;

    /// Close the context. Errors are not actionable and are only logged.
    async fn close(self: Box<Self>);
}
