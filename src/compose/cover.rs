//! Cover composer: report identification plus the fixed disclosure text.
//!
//! Only the header box is data driven (client, date/time, address,
//! inspector, company); the disclosure sections below it are constant.

use super::escape::escape_html;
use super::format_date_time;
use crate::compose::overlay::{FORM_ID, PROMULGATION};
use crate::model::InspectionRecord;
use chrono::FixedOffset;

const STYLE: &str = include_str!("cover.css");

/// Fixed disclosure body. Plain markup, no record data.
const DISCLOSURES: &str = r#"      <section>
        <h2>Purpose of Inspection</h2>
        <p>
          A real estate inspection is a visual survey of a structure and a basic
          performance evaluation of the systems and components of a building. It
          provides information regarding the general condition of a residence at
          the time the inspection was conducted. <strong>It is important</strong>
          that you carefully read ALL of this information. Ask the inspector to
          clarify any items or comments that are unclear.
        </p>
      </section>
      <section>
        <h2>Responsibility of the Inspector</h2>
        <p>
          This inspection is governed by the Texas Real Estate Commission (TREC)
          Standards of Practice (SOPs), which dictates the minimum requirements
          for a real estate inspection.
        </p>
        <p class="lead">The inspector <strong>IS required</strong> to:</p>
        <ul>
          <li>use this Property Inspection Report form for the inspection;</li>
          <li>inspect only those components and conditions that are present, visible, and accessible at the time of the inspection;</li>
          <li>indicate whether each item was inspected, not inspected, or not present;</li>
          <li>indicate an item as Deficient (D) if a condition exists that adversely and materially affects the performance of a system or component <strong>OR</strong> constitutes a hazard to life, limb or property as specified by the SOPs; and</li>
          <li>explain the inspector's findings in the corresponding section in the body of the report form.</li>
        </ul>
        <p class="lead">The inspector <strong>IS NOT required</strong> to:</p>
        <ul>
          <li>identify all potential hazards;</li>
          <li>turn on decommissioned equipment, systems, utilities, or apply an open flame or light a pilot to operate any appliance;</li>
          <li>climb over obstacles, move furnishings or stored items;</li>
          <li>prioritize or emphasize the importance of one deficiency over another;</li>
          <li>provide follow-up services to verify that proper repairs have been made; or</li>
          <li>inspect any system or component listed under the optional section of the SOPs (22 TAC 535.233).</li>
        </ul>
      </section>
      <section>
        <h2>Responsibility of the Client</h2>
        <p>
          While items identified as Deficient (D) in an inspection report DO NOT
          obligate any party to make repairs or take other actions, in the event
          that any further evaluations are needed, it is the responsibility of
          the client to obtain further evaluations and/or cost estimates from
          qualified service professionals regarding any items reported as
          Deficient (D). It is recommended that any further evaluations and/or
          cost estimates take place prior to the expiration of any contractual
          time limitations, such as option periods.
        </p>
        <p class="note">
          <strong>Please Note:</strong> Evaluations performed by service
          professionals in response to items reported as Deficient (D) on the
          report may lead to the discovery of additional deficiencies that were
          not present, visible, or accessible at the time of the inspection. Any
          repairs made after the date of the inspection may render information
          contained in this report obsolete or invalid.
        </p>
      </section>
      <section>
        <h2>Report Limitations</h2>
        <p>
          This report is provided for the benefit of the named client and is
          based on observations made by the named inspector on the date the
          inspection was performed (indicated above).
        </p>
        <p>ONLY those items specifically noted as being inspected on the report were inspected.</p>
        <p class="lead">This inspection is NOT:</p>
        <ul>
          <li>a technically exhaustive inspection of the structure, its systems, or its components and may not reveal all deficiencies;</li>
          <li>an inspection to verify compliance with any building codes;</li>
          <li>an inspection to verify compliance with manufacturer's installation instructions for any system or component; and DOES NOT</li>
          <li>imply insurability or warrantability of the structure or its components.</li>
        </ul>
      </section>
"#;

/// Compose the cover document for a record.
pub fn compose_cover(record: &InspectionRecord, timezone: FixedOffset) -> String {
    let insp = &record.inspection;
    let when = format_date_time(insp.schedule.local_time(timezone));

    let fields: String = [
        (escape_html(&insp.client_info.name), "Name of Client", 2),
        (when, "Date of Inspection", 1),
        (escape_html(&insp.address.full_address), "Address of Inspected Property", 3),
        (escape_html(&insp.inspector.name), "Name of Inspector", 2),
        ("N/A".to_string(), "TREC License #", 1),
        (escape_html(&record.account.company_name), "Name of Sponsor (if applicable)", 2),
        ("N/A".to_string(), "TREC License #", 1),
    ]
    .into_iter()
    .map(|(value, label, span)| {
        format!(
            r#"          <div class="header-field col-span-{span}">
            <div class="header-field-value">{value}</div>
            <div class="header-field-label">{label}</div>
          </div>
"#
        )
    })
    .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>PROPERTY INSPECTION REPORT FORM</title>
    <style>
{style}
    </style>
  </head>
  <body>
    <div class="page" role="document" aria-label="Property Inspection Report Form">
      <div class="title">PROPERTY INSPECTION REPORT FORM</div>
      <section class="header-section" aria-label="Report Header">
        <div class="header-grid">
{fields}        </div>
      </section>
{disclosures}      <footer role="contentinfo">
        <div>{form}</div>
        <div>{promulgation}</div>
      </footer>
    </div>
  </body>
</html>
"#,
        style = STYLE,
        fields = fields,
        disclosures = DISCLOSURES,
        form = FORM_ID,
        promulgation = PROMULGATION,
    )
}
