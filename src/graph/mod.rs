use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod client;

pub use client::GraphMailClient;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph request failed: status={status} body={body}")]
    Status { status: u16, body: String },

    #[error("graph request timed out after {0:?}")]
    Timeout(Duration),

    #[error("graph transport: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("decode graph response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GraphError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(client::REQUEST_TIMEOUT)
        } else {
            Self::Transport(error)
        }
    }
}

/// Seam over the external mail provider. Implemented by the Graph client in
/// production and by stubs in tests.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// All inbox messages for the session owner, in provider order.
    async fn fetch_inbox(&self, access_token: &str) -> Result<Vec<GraphMessage>, GraphError>;

    /// Mirror a local read mark onto the provider message.
    async fn mark_read(&self, access_token: &str, message_id: &str) -> Result<(), GraphError>;

    /// Mirror a local flag mark onto the provider message.
    async fn set_flag(&self, access_token: &str, message_id: &str) -> Result<(), GraphError>;
}

/// Response page from the `/messages` list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphMessagesPage {
    pub value: Vec<GraphMessage>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphMessage {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<GraphRecipient>,
    #[serde(rename = "hasAttachments")]
    pub has_attachments: Option<bool>,
    pub body: Option<GraphBody>,
    #[serde(rename = "webLink")]
    pub web_link: Option<String>,
    #[serde(rename = "isRead")]
    pub is_read: Option<bool>,
    pub flag: Option<GraphFlag>,
    #[serde(rename = "receivedDateTime")]
    pub received_date_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphRecipient {
    #[serde(rename = "emailAddress")]
    pub email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphEmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphBody {
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphFlag {
    #[serde(rename = "flagStatus")]
    pub flag_status: Option<String>,
}
