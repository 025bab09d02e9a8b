//! HTTP surface: the JSON routes the feed client talks to, all under
//! `/api`. Wire field names (`userID`, `emailID`, `socketid`) follow the
//! client's existing contract.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::models::{Email, Relation, RelationMark};
use crate::db::Database;
use crate::feed;
use crate::graph::MailProvider;
use crate::ingest;
use crate::outbox::{MirrorAction, MirrorJob, MirrorOutbox};
use crate::realtime::SocketRegistry;

pub mod auth;
pub mod error;

pub use auth::AuthContext;
pub use error::ApiError;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Database>>,
    pub provider: Arc<dyn MailProvider>,
    pub outbox: MirrorOutbox,
    pub sockets: Arc<SocketRegistry>,
}

pub fn router(context: ApiContext) -> Router {
    Router::new()
        .route("/api/whoami", get(whoami))
        .route("/api/initsocket", post(init_socket))
        .route("/api/emails", get(fetch_emails))
        .route("/api/read", get(list_read).post(mark_read))
        .route("/api/flag", get(list_flagged).post(mark_flagged))
        .route("/api/user", get(get_user))
        .route("/api/feed", get(get_feed))
        .route("/api/flagged", get(get_flagged))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(context)
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(rename = "userID")]
    user_id: String,
}

/// Scope for relation queries. Absent means the legacy unscoped path.
#[derive(Debug, Deserialize)]
struct ScopeQuery {
    #[serde(rename = "userID")]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarkBody {
    #[serde(rename = "userID")]
    user_id: String,
    subject: String,
    #[serde(rename = "emailID")]
    email_id: String,
}

#[derive(Debug, Deserialize)]
struct InitSocketBody {
    socketid: String,
}

async fn whoami(
    State(context): State<ApiContext>,
    auth: AuthContext,
) -> Result<Response, ApiError> {
    match auth {
        AuthContext::Authenticated(session) => {
            context.db.lock().await.upsert_user(&session.user)?;
            Ok(Json(session.user).into_response())
        }
        AuthContext::Anonymous => Ok(Json(json!({})).into_response()),
    }
}

async fn init_socket(
    State(context): State<ApiContext>,
    auth: AuthContext,
    Json(body): Json<InitSocketBody>,
) -> Json<serde_json::Value> {
    if let AuthContext::Authenticated(session) = auth {
        context
            .sockets
            .add_user(&session.user.user_id, &body.socketid)
            .await;
    }
    Json(json!({}))
}

/// Fetches the inbox from the provider, normalizes every message, persists
/// the records, and returns them in provider order.
async fn fetch_emails(
    State(context): State<ApiContext>,
    auth: AuthContext,
) -> Result<Json<Vec<Email>>, ApiError> {
    let session = auth.into_session()?;
    let messages = context.provider.fetch_inbox(&session.access_token).await?;

    let records = messages
        .iter()
        .map(ingest::normalize)
        .collect::<Result<Vec<_>, _>>()?;

    let db = context.db.lock().await;
    for record in &records {
        db.insert_email(record)?;
    }
    drop(db);

    Ok(Json(records))
}

async fn mark_read(
    State(context): State<ApiContext>,
    auth: AuthContext,
    Json(body): Json<MarkBody>,
) -> Result<Json<RelationMark>, ApiError> {
    append_mark(context, auth, body, Relation::Read, MirrorAction::MarkRead).await
}

async fn mark_flagged(
    State(context): State<ApiContext>,
    auth: AuthContext,
    Json(body): Json<MarkBody>,
) -> Result<Json<RelationMark>, ApiError> {
    append_mark(context, auth, body, Relation::Flagged, MirrorAction::Flag).await
}

/// The local append is awaited before responding; the provider mirror is
/// queued afterwards and never gates the response.
async fn append_mark(
    context: ApiContext,
    auth: AuthContext,
    body: MarkBody,
    relation: Relation,
    action: MirrorAction,
) -> Result<Json<RelationMark>, ApiError> {
    let session = auth.into_session()?;

    let mark = RelationMark {
        user_id: body.user_id,
        email_id: body.email_id,
        subject: body.subject,
        marked_at: Utc::now().to_rfc3339(),
    };
    context.db.lock().await.mark_relation(relation, &mark)?;

    context
        .outbox
        .enqueue(MirrorJob {
            action,
            email_id: mark.email_id.clone(),
            access_token: session.access_token,
        })
        .await;

    Ok(Json(mark))
}

async fn list_read(
    State(context): State<ApiContext>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let ids = context
        .db
        .lock()
        .await
        .relation_ids(Relation::Read, scope.user_id.as_deref())?;
    Ok(Json(ids))
}

async fn list_flagged(
    State(context): State<ApiContext>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let ids = context
        .db
        .lock()
        .await
        .relation_ids(Relation::Flagged, scope.user_id.as_deref())?;
    Ok(Json(ids))
}

async fn get_user(
    State(context): State<ApiContext>,
    Query(query): Query<UserQuery>,
) -> Result<Response, ApiError> {
    let user = context.db.lock().await.get_user(&query.user_id)?;
    Ok(match user {
        Some(user) => Json(user).into_response(),
        None => Json(json!({})).into_response(),
    })
}

/// Unread emails for the user, newest first.
async fn get_feed(
    State(context): State<ApiContext>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<Email>>, ApiError> {
    let db = context.db.lock().await;
    let emails = db.list_emails()?;
    let read_ids: HashSet<String> = db
        .relation_ids(Relation::Read, scope.user_id.as_deref())?
        .into_iter()
        .collect();
    drop(db);

    Ok(Json(feed::compose_feed(emails, &read_ids)))
}

/// Flagged emails for the profile page, newest first.
async fn get_flagged(
    State(context): State<ApiContext>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<Email>>, ApiError> {
    let db = context.db.lock().await;
    let emails = db.list_emails()?;
    let flagged_ids: HashSet<String> = db
        .relation_ids(Relation::Flagged, scope.user_id.as_deref())?
        .into_iter()
        .collect();
    drop(db);

    Ok(Json(feed::compose_flagged(emails, &flagged_ids)))
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    tracing::warn!(%method, %uri, "API route not found");
    (StatusCode::NOT_FOUND, Json(json!({ "msg": "API route not found" })))
}
