//! Document composers: record → markup.
//!
//! Composers are pure. They never touch the filesystem or the engine, so the
//! orchestrator can run them on blocking threads alongside engine start-up.
//!
//! Module map:
//! - `cover`: fixed-layout cover and disclosure page
//! - `body`: data-driven inspection sections
//! - `overlay`: per-page header/footer templates printed by the engine
//! - `escape`: the single escaping routine for record text

pub mod body;
pub mod cover;
pub mod escape;
pub mod overlay;

use crate::error::DocumentKind;
use crate::model::InspectionRecord;
use chrono::{DateTime, FixedOffset};

pub use body::compose_body;
pub use cover::compose_cover;
pub use escape::escape_html;

/// Markup for one document, produced once and consumed once by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument {
    pub kind: DocumentKind,
    pub html: String,
}

impl MarkupDocument {
    /// File name the markup is persisted under (`cover.html`, `body.html`).
    pub fn file_name(&self) -> String {
        format!("{}.html", self.kind.as_str())
    }
}

/// Compose one document of the report.
pub fn compose(kind: DocumentKind, record: &InspectionRecord, timezone: FixedOffset) -> MarkupDocument {
    let html = match kind {
        DocumentKind::Cover => compose_cover(record, timezone),
        DocumentKind::Body => compose_body(record, timezone),
    };
    MarkupDocument { kind, html }
}

/// `MM/DD/YYYY`, or empty when the record has no schedule.
pub fn format_date(time: Option<DateTime<FixedOffset>>) -> String {
    time.map(|t| t.format("%m/%d/%Y").to_string())
        .unwrap_or_default()
}

/// `MM/DD/YYYY h:mmAM`, or empty when the record has no schedule.
pub fn format_date_time(time: Option<DateTime<FixedOffset>>) -> String {
    time.map(|t| t.format("%m/%d/%Y %-I:%M%p").to_string())
        .unwrap_or_default()
}
