//! Body composer: inspection sections → markup.
//!
//! Sections and line items are emitted strictly in record order. Each line
//! item gets the four status boxes, a sequential letter (restarting at `A` in
//! every section) and its comments; a comment is either a checklist or a
//! narrative block, followed by its photos and videos.
//!
//! Every record string goes through [`escape_html`]; nothing else in this
//! file builds markup from record data.

use super::escape::escape_html;
use super::format_date;
use crate::model::{line_item_label, Comment, InspectionRecord, InspectionStatus, LineItem, MediaRef, Section};
use chrono::FixedOffset;

const STYLE: &str = include_str!("body.css");

/// Compose the body document for a record.
pub fn compose_body(record: &InspectionRecord, timezone: FixedOffset) -> String {
    let insp = &record.inspection;
    let address = escape_html(&insp.address.full_address);
    let date = format_date(insp.schedule.local_time(timezone));

    let mut sections = String::new();
    for section in &insp.sections {
        write_section(&mut sections, section);
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Inspection Report</title>
    <style>
{style}
    </style>
  </head>
  <body>
    <div class="page" role="document" aria-label="Inspection Report Sections">
      <div class="top-id">Report Identification: {address} - {date}</div>
{sections}
      <div class="footer">
        <div class="bottom-bar">
          <div>{company} • {phone}</div>
          <div>{email}</div>
        </div>
      </div>
    </div>
  </body>
</html>
"#,
        style = STYLE,
        address = address,
        date = date,
        sections = sections,
        company = escape_html(&record.account.company_name),
        phone = escape_html(&record.account.phone_number),
        email = escape_html(&record.account.email),
    )
}

fn write_section(out: &mut String, section: &Section) {
    out.push_str(&format!(
        r#"      <div class="section-container">
        <div class="sec-title">{}. {}</div>
"#,
        escape_html(&section.section_number),
        escape_html(&section.name.to_uppercase()),
    ));
    for (index, item) in section.line_items.iter().enumerate() {
        write_line_item(out, item, index);
    }
    out.push_str("      </div>\n");
}

fn write_line_item(out: &mut String, item: &LineItem, index: usize) {
    out.push_str(&format!(
        r#"        <div class="line-item" data-label="{label}">
          <div class="line-item-header">
            <div class="checkbox-row">
              <div class="checkbox-group">{boxes}</div>
              <div class="alpha-title">{label}. {title}</div>
            </div>
          </div>
"#,
        label = line_item_label(index),
        boxes = status_boxes(item.inspection_status),
        title = escape_html(item.display_title()),
    ));

    if !item.comments.is_empty() {
        out.push_str("          <div class=\"subhead-main\">\n");
        for comment in &item.comments {
            if comment.is_checklist() {
                write_checklist(out, comment);
            } else {
                write_narrative(out, comment);
            }
            write_media(out, comment);
        }
        out.push_str("          </div>\n");
    }
    out.push_str("        </div>\n");
}

fn checkbox(checked: bool, label: &str) -> String {
    format!(
        r#"<input class="chk" type="checkbox"{} aria-label="{}" />"#,
        if checked { " checked" } else { "" },
        escape_html(label),
    )
}

fn status_boxes(status: Option<InspectionStatus>) -> String {
    InspectionStatus::ALL
        .iter()
        .map(|s| checkbox(status == Some(*s), s.label()))
        .collect()
}

fn write_checklist(out: &mut String, comment: &Comment) {
    out.push_str(&format!(
        r#"            <div class="comment-block checklist">
              <p><span class="label">{}:</span></p>
              <div class="checklist-group">
"#,
        escape_html(&comment.label),
    ));
    for option in &comment.options {
        out.push_str(&format!(
            "                <div class=\"checklist-item\">{}<span>{}</span></div>\n",
            checkbox(comment.is_selected(option), option),
            escape_html(option),
        ));
    }
    out.push_str("              </div>\n            </div>\n");
}

fn write_narrative(out: &mut String, comment: &Comment) {
    out.push_str(&format!(
        r#"            <div class="comment-block narrative">
              <p><span class="label">{}:</span></p>
"#,
        escape_html(&comment.label),
    ));
    for paragraph in comment
        .display_text()
        .split('\n')
        .filter(|p| !p.trim().is_empty())
    {
        out.push_str(&format!("              <p>{}</p>\n", escape_html(paragraph)));
    }
    if !comment.location.is_empty() {
        out.push_str(&format!(
            "              <p><strong>Location:</strong> {}</p>\n",
            escape_html(&comment.location),
        ));
    }
    out.push_str("            </div>\n");
}

fn write_media(out: &mut String, comment: &Comment) {
    if !comment.photos.is_empty() {
        out.push_str("            <div class=\"media-row\">\n");
        for photo in &comment.photos {
            let caption = photo.display_caption().unwrap_or("");
            out.push_str(&format!(
                "              <div class=\"media-item\"><img src=\"{}\" alt=\"{}\" />{}</div>\n",
                escape_html(&photo.url),
                escape_html(caption),
                caption_block(photo),
            ));
        }
        out.push_str("            </div>\n");
    }

    // Videos cannot play in a PDF; they become linked thumbnails.
    if !comment.videos.is_empty() {
        out.push_str("            <div class=\"media-row\">\n");
        for video in &comment.videos {
            out.push_str(&format!(
                "              <div class=\"media-item\"><a href=\"{url}\" class=\"video-link\" title=\"Click to watch video\">{thumb}</a>{caption}</div>\n",
                url = escape_html(&video.url),
                thumb = video_thumbnail(&escape_html(&video.url)),
                caption = caption_block(video),
            ));
        }
        out.push_str("            </div>\n");
    }
}

fn video_thumbnail(url: &str) -> String {
    format!(
        r#"<div class="video-thumbnail"><video src="{url}" preload="metadata"></video><div class="play-button-overlay"><svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="60" height="60"><circle cx="12" cy="12" r="12" fill="rgba(0,0,0,0.7)"/><polygon points="9,6 9,18 18,12" fill="white"/></svg></div></div>"#
    )
}

fn caption_block(media: &MediaRef) -> String {
    media
        .display_caption()
        .map(|c| format!(r#"<div class="media-caption">{}</div>"#, escape_html(c)))
        .unwrap_or_default()
}
