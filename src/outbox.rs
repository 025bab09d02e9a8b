//! Bounded outbox that mirrors local read/flag marks onto the mail
//! provider. Delivery is decoupled from the HTTP response: jobs are queued,
//! retried a few times with backoff, and recorded as dead letters when they
//! keep failing. Mirror failures never surface to the HTTP caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::models::DeadLetter;
use crate::db::Database;
use crate::graph::{GraphError, MailProvider};

const OUTBOX_CAPACITY: usize = 256;
const MAX_MIRROR_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorAction {
    MarkRead,
    Flag,
}

impl MirrorAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::MarkRead => "mark_read",
            Self::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MirrorJob {
    pub action: MirrorAction,
    pub email_id: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct MirrorOutbox {
    tx: mpsc::Sender<MirrorJob>,
    db: Arc<Mutex<Database>>,
}

impl MirrorOutbox {
    /// Starts the drain worker and returns the enqueue handle. The worker
    /// runs until every handle is dropped.
    pub fn spawn(provider: Arc<dyn MailProvider>, db: Arc<Mutex<Database>>) -> Self {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        tokio::spawn(drain(rx, provider, Arc::clone(&db)));
        Self { tx, db }
    }

    /// Queues a mirror update without blocking the caller. When the queue
    /// is full or the worker is gone the job goes straight to the
    /// dead-letter table.
    pub async fn enqueue(&self, job: MirrorJob) {
        if let Err(send_error) = self.tx.try_send(job) {
            let job = match send_error {
                mpsc::error::TrySendError::Full(job)
                | mpsc::error::TrySendError::Closed(job) => job,
            };
            warn!(
                action = job.action.as_str(),
                email_id = %job.email_id,
                "mirror outbox unavailable, dead-lettering"
            );
            record_dead_letter(&self.db, &job, 0, "mirror outbox unavailable").await;
        }
    }
}

async fn drain(
    mut rx: mpsc::Receiver<MirrorJob>,
    provider: Arc<dyn MailProvider>,
    db: Arc<Mutex<Database>>,
) {
    while let Some(job) = rx.recv().await {
        deliver(provider.as_ref(), &db, job).await;
    }
}

async fn deliver(provider: &dyn MailProvider, db: &Arc<Mutex<Database>>, job: MirrorJob) {
    let mut backoff = BASE_BACKOFF;

    for attempt in 1..=MAX_MIRROR_ATTEMPTS {
        let result = match job.action {
            MirrorAction::MarkRead => provider.mark_read(&job.access_token, &job.email_id).await,
            MirrorAction::Flag => provider.set_flag(&job.access_token, &job.email_id).await,
        };

        match result {
            Ok(()) => {
                debug!(
                    action = job.action.as_str(),
                    email_id = %job.email_id,
                    attempt,
                    "mirror update delivered"
                );
                return;
            }
            Err(error) => {
                if !is_retryable(&error) || attempt == MAX_MIRROR_ATTEMPTS {
                    warn!(
                        action = job.action.as_str(),
                        email_id = %job.email_id,
                        attempt,
                        error = %error,
                        "mirror update failed, dead-lettering"
                    );
                    record_dead_letter(db, &job, attempt, &error.to_string()).await;
                    return;
                }

                warn!(
                    action = job.action.as_str(),
                    email_id = %job.email_id,
                    attempt,
                    error = %error,
                    "mirror update failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}

fn is_retryable(error: &GraphError) -> bool {
    match error {
        GraphError::Timeout(_) | GraphError::Transport(_) => true,
        GraphError::Status { status, .. } => *status == 429 || *status >= 500,
        GraphError::Decode(_) => false,
    }
}

async fn record_dead_letter(
    db: &Arc<Mutex<Database>>,
    job: &MirrorJob,
    attempts: u32,
    last_error: &str,
) {
    let letter = DeadLetter {
        id: Uuid::new_v4().to_string(),
        action: job.action.as_str().to_string(),
        email_id: job.email_id.clone(),
        attempts,
        last_error: last_error.to_string(),
        failed_at: Utc::now().to_rfc3339(),
    };

    let db = db.lock().await;
    if let Err(error) = db.insert_dead_letter(&letter) {
        warn!(error = %error, "failed to record mirror dead letter");
    }
}
