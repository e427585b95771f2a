//! Configuration types for report generation.
//!
//! All run behaviour is controlled through [`ReportConfig`], built via its
//! [`ReportConfigBuilder`]. Page geometry lives in two [`PageConfig`]s (one
//! per document), engine launch settings in [`EngineConfig`], and the two
//! pipeline timeouts sit on the top-level struct.
//!
//! The defaults reproduce the standard report layout: US Letter, a footer-only
//! cover page, and body pages with a status-legend header and a numbered
//! footer.

use crate::compose::overlay::OverlayTemplate;
use crate::error::ReportError;
use crate::progress::ProgressCallback;
use chrono::{FixedOffset, Offset, Utc};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Millimetres per inch; the engine takes paper geometry in inches.
const MM_PER_INCH: f64 = 25.4;

/// Configuration for one report run.
///
/// # Example
/// ```rust
/// use inspection_report::ReportConfig;
/// use std::time::Duration;
///
/// let config = ReportConfig::builder()
///     .navigation_timeout(Duration::from_secs(20))
///     .image_timeout(Duration::from_secs(3))
///     .build()
///     .unwrap();
/// assert_eq!(config.image_timeout, Duration::from_secs(3));
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Page geometry and overlays for the cover document.
    ///
    /// When `None` the built-in cover layout is used (see
    /// [`PageConfig::cover_default`]); its footer needs no per-run data.
    pub cover_page: Option<PageConfig>,

    /// Page geometry and overlays for the body document.
    ///
    /// When `None` the built-in body layout is used, with a header carrying
    /// the property address and inspection date (see
    /// [`PageConfig::body_default`]).
    pub body_page: Option<PageConfig>,

    /// Absolute deadline for a document to finish parsing after navigation.
    /// Default: 30 s. Expiry fails the run.
    pub navigation_timeout: Duration,

    /// How long a single image may take to load or fail before it is
    /// abandoned. Default: 5 s. Expiry never fails the run.
    pub image_timeout: Duration,

    /// Browser launch settings (only used when the run starts its own engine).
    pub engine: EngineConfig,

    /// Keep intermediate HTML and PDFs here instead of a throwaway temp dir.
    pub work_dir: Option<PathBuf>,

    /// UTC offset applied when printing the scheduled inspection time.
    /// Default: UTC.
    pub timezone: FixedOffset,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cover_page: None,
            body_page: None,
            navigation_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(5),
            engine: EngineConfig::default(),
            work_dir: None,
            timezone: Utc.fix(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("cover_page", &self.cover_page)
            .field("body_page", &self.body_page)
            .field("navigation_timeout", &self.navigation_timeout)
            .field("image_timeout", &self.image_timeout)
            .field("engine", &self.engine)
            .field("work_dir", &self.work_dir)
            .field("timezone", &self.timezone)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReportProgressCallback>"),
            )
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReportConfig`].
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl fmt::Debug for ReportConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ReportConfigBuilder {
    pub fn cover_page(mut self, page: PageConfig) -> Self {
        self.config.cover_page = Some(page);
        self
    }

    pub fn body_page(mut self, page: PageConfig) -> Self {
        self.config.body_page = Some(page);
        self
    }

    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.config.navigation_timeout = timeout;
        self
    }

    pub fn image_timeout(mut self, timeout: Duration) -> Self {
        self.config.image_timeout = timeout;
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    /// UTC offset in minutes (e.g. `-360` for US Central standard time).
    pub fn timezone_offset_minutes(mut self, minutes: i32) -> Self {
        if let Some(offset) = FixedOffset::east_opt(minutes.saturating_mul(60)) {
            self.config.timezone = offset;
        }
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config;
        if c.navigation_timeout.is_zero() {
            return Err(ReportError::InvalidConfig(
                "Navigation timeout must be > 0".into(),
            ));
        }
        if c.image_timeout.is_zero() {
            return Err(ReportError::InvalidConfig(
                "Image timeout must be > 0".into(),
            ));
        }
        for page in [&c.cover_page, &c.body_page].into_iter().flatten() {
            page.validate()?;
        }
        Ok(self.config)
    }
}

// ── Page geometry ────────────────────────────────────────────────────────

/// Physical paper size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSize {
    /// 8.5 × 11 in. (default)
    #[default]
    Letter,
    /// 8.5 × 14 in.
    Legal,
    /// 210 × 297 mm.
    A4,
    /// Arbitrary width × height in inches.
    Custom { width_in: f64, height_in: f64 },
}

impl PageSize {
    /// `(width, height)` in inches.
    pub fn inches(self) -> (f64, f64) {
        match self {
            PageSize::Letter => (8.5, 11.0),
            PageSize::Legal => (8.5, 14.0),
            PageSize::A4 => (210.0 / MM_PER_INCH, 297.0 / MM_PER_INCH),
            PageSize::Custom {
                width_in,
                height_in,
            } => (width_in, height_in),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub top_mm: f64,
    pub right_mm: f64,
    pub bottom_mm: f64,
    pub left_mm: f64,
}

impl Margins {
    pub fn new(top_mm: f64, right_mm: f64, bottom_mm: f64, left_mm: f64) -> Self {
        Self {
            top_mm,
            right_mm,
            bottom_mm,
            left_mm,
        }
    }

    /// `(top, right, bottom, left)` in inches.
    pub fn inches(&self) -> (f64, f64, f64, f64) {
        (
            self.top_mm / MM_PER_INCH,
            self.right_mm / MM_PER_INCH,
            self.bottom_mm / MM_PER_INCH,
            self.left_mm / MM_PER_INCH,
        )
    }
}

/// Everything the renderer needs to paginate one document.
///
/// This is a closed set: paper size, margins, background printing, and two
/// independently optional overlays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageConfig {
    pub size: PageSize,
    pub margins: Margins,
    pub print_background: bool,
    pub header: Option<OverlayTemplate>,
    pub footer: Option<OverlayTemplate>,
}

impl PageConfig {
    /// Cover page: Letter, 10/10/15/10 mm, promulgation footer, no header.
    pub fn cover_default() -> Self {
        Self {
            size: PageSize::Letter,
            margins: Margins::new(10.0, 10.0, 15.0, 10.0),
            print_background: true,
            header: None,
            footer: Some(OverlayTemplate::cover_footer()),
        }
    }

    /// Body pages: Letter, 25/10/15/10 mm, legend header and numbered footer.
    ///
    /// The header carries per-run strings, so it is built from the record's
    /// address and the formatted inspection date.
    pub fn body_default(address: &str, date: &str) -> Self {
        Self {
            size: PageSize::Letter,
            margins: Margins::new(25.0, 10.0, 15.0, 10.0),
            print_background: true,
            header: Some(OverlayTemplate::body_header(address, date)),
            footer: Some(OverlayTemplate::body_footer()),
        }
    }

    fn validate(&self) -> Result<(), ReportError> {
        let (w, h) = self.size.inches();
        if !(w > 0.0 && h > 0.0) {
            return Err(ReportError::InvalidConfig(format!(
                "Page size must be positive, got {w}×{h} in"
            )));
        }
        let (t, r, b, l) = self.margins.inches();
        if [t, r, b, l].iter().any(|m| *m < 0.0) {
            return Err(ReportError::InvalidConfig(
                "Margins must not be negative".into(),
            ));
        }
        if l + r >= w || t + b >= h {
            return Err(ReportError::InvalidConfig(
                "Margins leave no printable area".into(),
            ));
        }
        Ok(())
    }
}

// ── Engine ───────────────────────────────────────────────────────────────

/// Flags every engine launch uses. The pipeline is a batch job, so sandbox,
/// GPU, and background throttling are all off.
pub const BATCH_MODE_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-setuid-sandbox",
    "--disable-web-security",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-background-timer-throttling",
];

/// Headless browser launch settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Browser binary. `None` lets the engine auto-detect Chrome/Chromium.
    pub executable: Option<PathBuf>,
    /// How long to wait for the browser process to come up. Default: 20 s.
    pub launch_timeout: Duration,
    /// Extra flags appended after [`BATCH_MODE_ARGS`].
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: None,
            launch_timeout: Duration::from_secs(20),
            extra_args: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// All command-line flags for a launch, batch-mode flags first.
    pub fn args(&self) -> Vec<String> {
        BATCH_MODE_ARGS
            .iter()
            .map(|a| a.to_string())
            .chain(self.extra_args.iter().cloned())
            .collect()
    }
}
