//! Pipeline stages that turn markup into the final PDF.
//!
//! ## Data Flow
//!
//! ```text
//! cover.html ──▶ render ──┐
//!                         ├──▶ merge ──▶ report.pdf
//! body.html  ──▶ render ──┘
//!     (file://)  (engine)     (lopdf)
//! ```
//!
//! 1. [`render`]: navigate one engine context to the persisted markup,
//!    settle its images, export a PDF; runs once per document, concurrently
//! 2. [`merge`]: structural concatenation in the fixed order
//!    `[cover, body]`; pure CPU work over bytes already in memory

pub mod merge;
pub mod render;
