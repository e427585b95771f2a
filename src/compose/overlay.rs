//! Header and footer overlays.
//!
//! The engine prints overlays in their own box, once per physical page,
//! outside the document's DOM and stylesheet. They may use the engine's
//! placeholder elements, filled in per page:
//!
//! * `<span class="pageNumber"></span>`: current page number
//! * `<span class="totalPages"></span>`: page count of *this* document
//!
//! Anything else in an overlay is static text fixed at compose time (the
//! property address, the inspection date, company identity), and goes
//! through [`escape_html`] like every other record field.

use super::escape::escape_html;

/// Form id and promulgation line printed on every page.
pub const FORM_ID: &str = "REI 7-6 (8/9/2021)";
pub const PROMULGATION: &str =
    "Promulgated by the Texas Real Estate Commission • (512) 936-3000 • www.trec.texas.gov";

/// Placeholder the engine replaces with the current page number.
pub const PAGE_NUMBER: &str = r#"<span class="pageNumber"></span>"#;
/// Placeholder the engine replaces with the total page count.
pub const TOTAL_PAGES: &str = r#"<span class="totalPages"></span>"#;

/// An overlay's markup. Always self-contained (carries its own `<style>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayTemplate(String);

impl OverlayTemplate {
    /// Wrap raw overlay markup. The caller is responsible for escaping.
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Footer of the cover page: form id and promulgation line, unnumbered.
    pub fn cover_footer() -> Self {
        Self(format!(
            r#"<style>
  .pdf-footer {{ font-family: 'Times New Roman', Times, serif; font-size: 12px; width: 100%;
                 display: flex; justify-content: space-between; align-items: center; padding: 0 10mm; }}
</style>
<div class="pdf-footer">
  <div>{form}</div>
  <div>{promulgation}</div>
</div>"#,
            form = FORM_ID,
            promulgation = PROMULGATION,
        ))
    }

    /// Header of the body pages: report identification and status legend.
    pub fn body_header(address: &str, date: &str) -> Self {
        Self(format!(
            r#"<style>
  .pdf-header {{ font-family: 'Times New Roman', Times, serif; font-size: 13px; width: 100%; padding: 4px 12mm 0 12mm; }}
  .pdf-header .legend {{ display: flex; gap: 45px; font-weight: 700; margin-top: 3px; margin-left: 3px; padding: 1px 7.5px; }}
  .pdf-header .box {{ margin-top: 2px; border: 2px solid #000; display: flex; gap: 12.5px; padding: 1px 8.5px; font-weight: 700; width: 100%; }}
</style>
<div class="pdf-header">
  <div style="margin-left: 3px;">Report: {address} - {date}</div>
  <div class="legend">
    <span>I=Inspected</span><span>NI=Not Inspected</span><span>NP=Not Present</span><span>D=Deficient</span>
  </div>
  <div class="box"><span>I</span><span>NI</span><span>NP</span><span>D</span></div>
</div>"#,
            address = escape_html(address),
            date = escape_html(date),
        ))
    }

    /// Footer of the body pages: "Page N of M" above the promulgation line.
    pub fn body_footer() -> Self {
        Self(format!(
            r#"<style>
  .pdf-footer {{ font-family: 'Times New Roman', Times, serif; width: 100%; padding: 0 10mm; }}
  .pdf-footer .page-number {{ font-size: 14px; text-align: center; margin-bottom: 4px; }}
  .pdf-footer .bottom-line {{ font-size: 12px; display: flex; justify-content: space-between; align-items: center; }}
</style>
<div class="pdf-footer">
  <div class="page-number">Page {page} of {total}</div>
  <div class="bottom-line">
    <div>{form}</div>
    <div>{promulgation}</div>
  </div>
</div>"#,
            page = PAGE_NUMBER,
            total = TOTAL_PAGES,
            form = FORM_ID,
            promulgation = PROMULGATION,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_header_escapes_address() {
        let h = OverlayTemplate::body_header("1 <Main> & Co", "01/02/2024");
        assert!(h.as_str().contains("1 &lt;Main&gt; &amp; Co - 01/02/2024"));
        assert!(!h.as_str().contains("<Main>"));
    }

    #[test]
    fn body_footer_uses_engine_placeholders() {
        let f = OverlayTemplate::body_footer();
        assert!(f.as_str().contains(PAGE_NUMBER));
        assert!(f.as_str().contains(TOTAL_PAGES));
    }

    #[test]
    fn cover_footer_is_unnumbered() {
        let f = OverlayTemplate::cover_footer();
        assert!(f.as_str().contains(FORM_ID));
        assert!(!f.as_str().contains("pageNumber"));
    }
}
