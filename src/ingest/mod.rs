use thiserror::Error;

use crate::db::models::Email;
use crate::graph::GraphMessage;

pub mod dates;
pub mod links;

/// Stored in `relevant_dates` when no date is recognized. Feed clients
/// treat this literal as "no date found".
pub const NO_DATE: &str = "null";

const FLAGGED_STATUS: &str = "flagged";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("upstream message missing required field: {0}")]
    MissingField(&'static str),
}

/// Pure transform from a provider message to the persisted record. The
/// caller owns persistence; nothing is written here.
pub fn normalize(message: &GraphMessage) -> Result<Email, NormalizeError> {
    let email_id = require(message.id.as_deref(), "id")?;
    // Subjects may legitimately be empty; only absence is malformed.
    let subject = message
        .subject
        .as_deref()
        .ok_or(NormalizeError::MissingField("subject"))?;

    let from = message
        .from
        .as_ref()
        .and_then(|recipient| recipient.email_address.as_ref())
        .ok_or(NormalizeError::MissingField("from.emailAddress"))?;
    let sender_email = require(from.address.as_deref(), "from.emailAddress.address")?;
    let sender_name = require(from.name.as_deref(), "from.emailAddress.name")?;

    let has_attachment = message
        .has_attachments
        .ok_or(NormalizeError::MissingField("hasAttachments"))?;
    let content = message
        .body
        .as_ref()
        .and_then(|body| body.content.as_deref())
        .ok_or(NormalizeError::MissingField("body.content"))?;
    let email_url = require(message.web_link.as_deref(), "webLink")?;
    let is_read = message
        .is_read
        .ok_or(NormalizeError::MissingField("isRead"))?;
    let flag_status = message
        .flag
        .as_ref()
        .and_then(|flag| flag.flag_status.as_deref())
        .ok_or(NormalizeError::MissingField("flag.flagStatus"))?;
    let time_received = require(message.received_date_time.as_deref(), "receivedDateTime")?;

    let links = links::extract_links(content);
    let relevant_dates = dates::first_date(&body_text(content))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NO_DATE.to_string());

    Ok(Email {
        email_id: email_id.to_string(),
        sender_email: sender_email.to_string(),
        sender_name: sender_name.to_string(),
        subject: subject.to_string(),
        has_attachment,
        attachments: Vec::new(),
        content: content.to_string(),
        links,
        relevant_dates,
        venue: String::new(),
        email_url: email_url.to_string(),
        is_read,
        is_flagged: flag_status.eq_ignore_ascii_case(FLAGGED_STATUS),
        time_received: time_received.to_string(),
    })
}

fn require<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, NormalizeError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(NormalizeError::MissingField(field))
}

/// Plain-text rendering of the HTML body for the date scan. html2text
/// chokes on some pathological markup, so the conversion is guarded.
fn body_text(content: &str) -> String {
    std::panic::catch_unwind(|| {
        html2text::from_read(content.as_bytes(), 120)
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    })
    .unwrap_or_default()
}
