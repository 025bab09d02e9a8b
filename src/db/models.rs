use rusqlite::{Result as SqlResult, Row};
use serde::{Deserialize, Serialize};

/// The two per-user mark relations kept by the store. Both are append-only
/// logs queried with set semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Read,
    Flagged,
}

impl Relation {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Read => "read_marks",
            Self::Flagged => "flagged_marks",
        }
    }
}

/// Normalized email record persisted once per inbound provider message.
/// Serialized field names follow the feed client's wire contract
/// (`emailID`, camelCase for the rest).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    #[serde(rename = "emailID")]
    pub email_id: String,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub has_attachment: bool,
    pub attachments: Vec<String>,
    pub content: String,
    pub links: Vec<String>,
    /// First recognizable calendar date in the body, `YYYY-MM-DD`, or the
    /// literal string "null" when nothing parsed.
    pub relevant_dates: String,
    pub venue: String,
    #[serde(rename = "emailURL")]
    pub email_url: String,
    pub is_read: bool,
    pub is_flagged: bool,
    pub time_received: String,
}

/// One append to a read/flagged relation. Duplicates for the same
/// (user, email) pair are legal; membership queries collapse them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelationMark {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "emailID")]
    pub email_id: String,
    pub subject: String,
    pub marked_at: String,
}

/// Identity record owned by the external identity layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub name: String,
    pub email: String,
}

/// Mirror update that exhausted its retries (or failed terminally) against
/// the mail provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadLetter {
    pub id: String,
    pub action: String,
    pub email_id: String,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: String,
}

fn parse_json_array(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
        .unwrap_or_default()
}

impl Email {
    pub fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            email_id: row.get("email_id")?,
            sender_email: row.get("sender_email")?,
            sender_name: row.get("sender_name")?,
            subject: row.get("subject")?,
            has_attachment: row.get("has_attachment")?,
            attachments: parse_json_array(row.get("attachments")?),
            content: row.get("content")?,
            links: parse_json_array(row.get("links")?),
            relevant_dates: row.get("relevant_dates")?,
            venue: row.get("venue")?,
            email_url: row.get("email_url")?,
            is_read: row.get("is_read")?,
            is_flagged: row.get("is_flagged")?,
            time_received: row.get("time_received")?,
        })
    }
}

impl RelationMark {
    pub fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            email_id: row.get("email_id")?,
            subject: row.get("subject")?,
            marked_at: row.get("marked_at")?,
        })
    }
}

impl User {
    pub fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
        })
    }
}

impl DeadLetter {
    pub fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            action: row.get("action")?,
            email_id: row.get("email_id")?,
            attempts: row.get("attempts")?,
            last_error: row.get("last_error")?,
            failed_at: row.get("failed_at")?,
        })
    }
}
