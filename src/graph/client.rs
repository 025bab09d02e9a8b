use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::time::sleep;

use super::{GraphError, GraphMessage, GraphMessagesPage, MailProvider};

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_API_BASE_ENV: &str = "MAILFEED_GRAPH_API_BASE";
const INBOX_PAGE_SIZE: usize = 50;
const MAX_RATE_LIMIT_RETRIES: usize = 5;
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const REDACTED_BODY_MAX_LEN: usize = 200;

const MESSAGE_SELECT_FIELDS: &str =
    "id,subject,from,hasAttachments,body,webLink,isRead,flag,receivedDateTime";

fn graph_api_base() -> String {
    std::env::var(GRAPH_API_BASE_ENV)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| GRAPH_API_BASE.to_string())
}

fn redact_response_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= REDACTED_BODY_MAX_LEN {
        trimmed.to_string()
    } else {
        format!(
            "{}…[truncated {} bytes]",
            &trimmed[..REDACTED_BODY_MAX_LEN],
            trimmed.len()
        )
    }
}

/// Microsoft Graph mail client operating on delegated (per-session) access
/// tokens. Every request carries a bounded timeout; list requests retry on
/// 429 honoring `retry-after`.
#[derive(Debug, Clone)]
pub struct GraphMailClient {
    client: Client,
    base: String,
}

impl GraphMailClient {
    pub fn new() -> Result<Self, GraphError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base: graph_api_base(),
        })
    }

    fn inbox_url(&self) -> String {
        format!(
            "{}/me/mailFolders/inbox/messages?$top={INBOX_PAGE_SIZE}&$select={MESSAGE_SELECT_FIELDS}",
            self.base
        )
    }

    fn message_url(&self, message_id: &str) -> String {
        format!("{}/me/messages/{message_id}", self.base)
    }

    async fn fetch_messages_page_with_retry(
        &self,
        token: &str,
        url: &str,
    ) -> Result<GraphMessagesPage, GraphError> {
        let mut backoff_seconds = 1u64;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let response = self
                .client
                .get(url)
                .bearer_auth(token)
                .header("accept", "application/json")
                .send()
                .await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    let body = response.text().await?;
                    return Err(GraphError::Status {
                        status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                        body: redact_response_body(&body),
                    });
                }

                let retry_after_seconds = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(backoff_seconds);

                sleep(Duration::from_secs(retry_after_seconds)).await;
                backoff_seconds = (backoff_seconds * 2).min(32);
                continue;
            }

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(GraphError::Status {
                    status: status.as_u16(),
                    body: redact_response_body(&body),
                });
            }

            let page: GraphMessagesPage = serde_json::from_str(&body)?;
            return Ok(page);
        }

        Err(GraphError::Status {
            status: 0,
            body: "graph messages request failed without response".to_string(),
        })
    }

    async fn patch_message(
        &self,
        token: &str,
        message_id: &str,
        patch: serde_json::Value,
    ) -> Result<(), GraphError> {
        let response = self
            .client
            .patch(self.message_url(message_id))
            .bearer_auth(token)
            .json(&patch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(GraphError::Status {
                status: status.as_u16(),
                body: redact_response_body(&body),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MailProvider for GraphMailClient {
    async fn fetch_inbox(&self, access_token: &str) -> Result<Vec<GraphMessage>, GraphError> {
        let mut messages = Vec::new();
        let mut next_url = self.inbox_url();

        loop {
            let page = self
                .fetch_messages_page_with_retry(access_token, &next_url)
                .await?;
            messages.extend(page.value);

            match page.next_link {
                Some(url) => next_url = url,
                None => break,
            }
        }

        Ok(messages)
    }

    async fn mark_read(&self, access_token: &str, message_id: &str) -> Result<(), GraphError> {
        self.patch_message(access_token, message_id, json!({ "isRead": true }))
            .await
    }

    async fn set_flag(&self, access_token: &str, message_id: &str) -> Result<(), GraphError> {
        self.patch_message(
            access_token,
            message_id,
            json!({ "flag": { "flagStatus": "flagged" } }),
        )
        .await
    }
}
