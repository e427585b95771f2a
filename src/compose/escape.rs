//! The one escaping routine every composer goes through.
//!
//! Record fields are untrusted: inspectors paste text from anywhere, and a
//! stray `<` or an embedded NUL must never change the structure of the
//! document we hand to the engine. Two passes, in order:
//!
//! 1. Drop C0 control characters (except tab, LF, CR) and DEL. They are not
//!    allowed in HTML text and some engines stop parsing on them.
//! 2. Encode the five markup metacharacters `& < > " '`. Quotes are encoded
//!    too, so the same output is safe in attribute values.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("static regex"));

/// Escape untrusted text for use in element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let cleaned: Cow<'_, str> = RE_CONTROL.replace_all(input, "");
    let mut out = String::with_capacity(cleaned.len() + 8);
    for ch in cleaned.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}
