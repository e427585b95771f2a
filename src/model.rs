//! Inspection record: the immutable input of a report run.
//!
//! The shapes mirror the JSON export produced by the inspection app
//! (`{ "inspection": { … }, "account": { … } }`, camelCase keys). Every
//! field the composers do not strictly need is optional or defaulted, so a
//! sparse export still loads; the pipeline itself never mutates a record.

use crate::error::{ReportError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Explicit `null` reads as the field's default, same as a missing key.
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Root of an inspection export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub inspection: Inspection,
    #[serde(default, deserialize_with = "null_default")]
    pub account: Account,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inspection {
    #[serde(deserialize_with = "null_default")]
    pub client_info: ClientInfo,
    #[serde(deserialize_with = "null_default")]
    pub inspector: Inspector,
    #[serde(deserialize_with = "null_default")]
    pub address: Address,
    #[serde(deserialize_with = "null_default")]
    pub schedule: Schedule,
    #[serde(deserialize_with = "null_default")]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInfo {
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub email: String,
    #[serde(deserialize_with = "null_default")]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inspector {
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(deserialize_with = "null_default")]
    pub full_address: String,
    #[serde(deserialize_with = "null_default")]
    pub street: String,
    #[serde(deserialize_with = "null_default")]
    pub city: String,
    #[serde(deserialize_with = "null_default")]
    pub state: String,
    #[serde(deserialize_with = "null_default")]
    pub zipcode: String,
}

/// Scheduled inspection time, in epoch milliseconds.
///
/// Exports carry either `startTime` or the older `date` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
    pub start_time: Option<i64>,
    pub date: Option<i64>,
}

impl Schedule {
    /// `startTime` when present, otherwise `date`.
    pub fn starts_at(&self) -> Option<i64> {
        self.start_time.or(self.date)
    }

    /// Scheduled time in the given offset, if the export carries one.
    pub fn local_time(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        self.starts_at()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.with_timezone(&offset))
    }
}

/// The inspection company the report is issued under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    #[serde(deserialize_with = "null_default")]
    pub company_name: String,
    #[serde(deserialize_with = "null_default")]
    pub email: String,
    #[serde(deserialize_with = "null_default")]
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub section_number: String,
    #[serde(deserialize_with = "null_default")]
    pub order: i64,
    #[serde(deserialize_with = "null_default")]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub title: String,
    #[serde(with = "status_code")]
    pub inspection_status: Option<InspectionStatus>,
    #[serde(deserialize_with = "null_default")]
    pub comments: Vec<Comment>,
}

impl LineItem {
    /// `title`, falling back to `name`.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// The four report-form status boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionStatus {
    Inspected,
    NotInspected,
    NotPresent,
    Deficient,
}

impl InspectionStatus {
    /// Status boxes in the order they are printed.
    pub const ALL: [InspectionStatus; 4] = [
        InspectionStatus::Inspected,
        InspectionStatus::NotInspected,
        InspectionStatus::NotPresent,
        InspectionStatus::Deficient,
    ];

    pub fn code(self) -> &'static str {
        match self {
            InspectionStatus::Inspected => "I",
            InspectionStatus::NotInspected => "NI",
            InspectionStatus::NotPresent => "NP",
            InspectionStatus::Deficient => "D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InspectionStatus::Inspected => "Inspected",
            InspectionStatus::NotInspected => "Not Inspected",
            InspectionStatus::NotPresent => "Not Present",
            InspectionStatus::Deficient => "Deficient",
        }
    }

    /// Parse a status code; unknown codes are treated as unset.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

/// Serde adapter: `"I" | "NI" | "NP" | "D"` ↔ `Option<InspectionStatus>`.
mod status_code {
    use super::InspectionStatus;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        status: &Option<InspectionStatus>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match status {
            Some(s) => serializer.serialize_str(s.code()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<InspectionStatus>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(InspectionStatus::from_code))
    }
}

/// A note attached to a line item.
///
/// Rendered as a checklist when `input_type` is `"checklist"` and `options`
/// is non-empty; otherwise as narrative text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub label: String,
    #[serde(deserialize_with = "null_default")]
    pub text: String,
    #[serde(deserialize_with = "null_default")]
    pub content: String,
    #[serde(deserialize_with = "null_default")]
    pub comment_text: String,
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_default")]
    pub input_type: String,
    #[serde(deserialize_with = "null_default")]
    pub options: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub selected_options: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub location: String,
    #[serde(deserialize_with = "null_default")]
    pub photos: Vec<MediaRef>,
    #[serde(deserialize_with = "null_default")]
    pub videos: Vec<MediaRef>,
}

impl Comment {
    pub fn is_checklist(&self) -> bool {
        self.input_type == "checklist" && !self.options.is_empty()
    }

    pub fn is_selected(&self, option: &str) -> bool {
        self.selected_options.iter().any(|s| s == option)
    }

    /// First non-empty of `text`, `content`, `commentText`.
    ///
    /// The three fields are interchangeable in the export and nothing says
    /// which one wins; this order is fixed so output is deterministic.
    // TODO: collapse the three text fields once the export schema has one.
    pub fn display_text(&self) -> &str {
        [&self.text, &self.content, &self.comment_text]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// A photo or video reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaRef {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub url: String,
    pub caption: Option<String>,
    pub description: Option<String>,
}

impl MediaRef {
    /// First non-empty of `caption`, `description`.
    pub fn display_caption(&self) -> Option<&str> {
        [self.caption.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// Sequential line-item label: `A`…`Z`, then `AA`, `AB`, …
pub fn line_item_label(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

impl InspectionRecord {
    /// Parse a record from its JSON export.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReportError::InvalidRecord(e.to_string()))
    }

    pub fn sections(&self) -> &[Section] {
        &self.inspection.sections
    }
}

/// Read and parse a record from a JSON file.
pub async fn load_record(path: impl AsRef<Path>) -> Result<InspectionRecord> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReportError::InvalidRecord(format!("{}: {e}", path.display())))?;
    InspectionRecord::from_json_str(&json)
}
