use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use mailfeed::api::{self, ApiContext};
use mailfeed::db::Database;
use mailfeed::graph::{GraphError, GraphMessage, MailProvider};
use mailfeed::outbox::MirrorOutbox;
use mailfeed::realtime::SocketRegistry;

struct StubProvider {
    messages: Vec<GraphMessage>,
}

#[async_trait]
impl MailProvider for StubProvider {
    async fn fetch_inbox(&self, _access_token: &str) -> Result<Vec<GraphMessage>, GraphError> {
        Ok(self.messages.clone())
    }

    async fn mark_read(&self, _access_token: &str, _message_id: &str) -> Result<(), GraphError> {
        Ok(())
    }

    async fn set_flag(&self, _access_token: &str, _message_id: &str) -> Result<(), GraphError> {
        Ok(())
    }
}

fn graph_message(id: &str, body_html: &str, received_at: &str) -> GraphMessage {
    serde_json::from_value(json!({
        "id": id,
        "subject": format!("Subject {id}"),
        "from": { "emailAddress": { "name": "Events Office", "address": "events@example.edu" } },
        "hasAttachments": false,
        "body": { "contentType": "html", "content": body_html },
        "webLink": format!("https://outlook.example/{id}"),
        "isRead": false,
        "flag": { "flagStatus": "notFlagged" },
        "receivedDateTime": received_at
    }))
    .expect("build graph message")
}

fn test_app(messages: Vec<GraphMessage>) -> (Router, Arc<Mutex<Database>>, PathBuf) {
    let path = std::env::temp_dir().join(format!("mailfeed-api-it-{}.db", Uuid::new_v4()));
    let db = Arc::new(Mutex::new(Database::open(&path).expect("open db")));
    let provider: Arc<dyn MailProvider> = Arc::new(StubProvider { messages });
    let outbox = MirrorOutbox::spawn(Arc::clone(&provider), Arc::clone(&db));

    let context = ApiContext {
        db: Arc::clone(&db),
        provider,
        outbox,
        sockets: Arc::new(SocketRegistry::new()),
    };
    (api::router(context), db, path)
}

fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder
        .header("authorization", "Bearer test-token")
        .header("x-user-id", "user-1")
        .header("x-user-name", "Test User")
        .header("x-user-email", "user@example.com")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response JSON")
}

#[tokio::test]
async fn whoami_is_empty_for_anonymous_and_user_for_session() {
    let (app, db, path) = test_app(vec![]);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/whoami")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({}));

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/whoami"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await;
    assert_eq!(user["userID"], "user-1");
    assert_eq!(user["name"], "Test User");

    let stored = db
        .lock()
        .await
        .get_user("user-1")
        .expect("get user")
        .expect("user persisted by whoami");
    assert_eq!(stored.email, "user@example.com");

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn emails_require_a_session() {
    let (app, _db, path) = test_app(vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/emails")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn emails_are_normalized_and_persisted() {
    let body_html = r#"<p>RSVP <a href="https://rsvp.example/form">here</a>
        on Thursday, February 2, 2023.</p>"#;
    let (app, db, path) = test_app(vec![graph_message(
        "msg-1",
        body_html,
        "2026-02-01T12:00:00Z",
    )]);

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/emails"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);

    let records = body_json(response).await;
    let records = records.as_array().expect("records array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["emailID"], "msg-1");
    assert_eq!(records[0]["links"], json!(["https://rsvp.example/form"]));
    assert_eq!(records[0]["relevantDates"], "2023-02-02");

    let stored = db
        .lock()
        .await
        .get_email("msg-1")
        .expect("get email")
        .expect("record persisted before responding");
    assert_eq!(stored.sender_email, "events@example.edu");

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn malformed_upstream_message_is_a_server_error() {
    let mut broken = graph_message("msg-1", "<p>Hi</p>", "2026-02-01T12:00:00Z");
    broken.from = None;
    let (app, _db, path) = test_app(vec![broken]);

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/emails"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = body_json(response).await;
    assert!(error["error"]
        .as_str()
        .expect("error message")
        .contains("from.emailAddress"));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn double_read_mark_lists_the_id_once() {
    let (app, db, path) = test_app(vec![]);

    let mark = json!({ "userID": "user-1", "subject": "Subject msg-1", "emailID": "msg-1" });
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                authed(Request::builder().method("POST").uri("/api/read"))
                    .header("content-type", "application/json")
                    .body(Body::from(mark.to_string()))
                    .expect("build request"),
            )
            .await
            .expect("send request");
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["userID"], "user-1");
        assert_eq!(created["emailID"], "msg-1");
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/read?userID=user-1")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(["msg-1"]));

    let stored = db
        .lock()
        .await
        .list_marks(mailfeed::db::models::Relation::Read, "user-1")
        .expect("list raw marks");
    assert_eq!(stored.len(), 2, "both appends reach storage");

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn flag_mark_requires_a_session() {
    let (app, _db, path) = test_app(vec![]);

    let mark = json!({ "userID": "user-1", "subject": "Subject", "emailID": "msg-1" });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/flag")
                .header("content-type", "application/json")
                .body(Body::from(mark.to_string()))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn initsocket_registers_the_session_socket() {
    let (app, _db, path) = test_app(vec![]);

    let response = app
        .oneshot(
            authed(Request::builder().method("POST").uri("/api/initsocket"))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "socketid": "socket-9" }).to_string()))
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({}));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn user_lookup_returns_stored_user_or_empty_object() {
    let (app, db, path) = test_app(vec![]);

    db.lock()
        .await
        .upsert_user(&mailfeed::db::models::User {
            user_id: "user-1".to_string(),
            name: "Test User".to_string(),
            email: "user@example.com".to_string(),
        })
        .expect("seed user");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user?userID=user-1")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Test User");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user?userID=missing")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(body_json(response).await, json!({}));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn unmatched_routes_answer_404_with_the_fixed_body() {
    let (app, _db, path) = test_app(vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/definitely-not-a-route")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "msg": "API route not found" }));

    let _ = std::fs::remove_file(path);
}
