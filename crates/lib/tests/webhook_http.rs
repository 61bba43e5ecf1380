//! HttpWebhookSink against a local receiver.

mod common;

use axum::{http::StatusCode, routing::post, Json, Router};
use common::{inbound, serve};
use lib::bot::{HttpWebhookSink, WebhookError, WebhookRecord, WebhookSink};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn posts_record_as_json() {
    let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let received_in = received.clone();
    let app = Router::new().route(
        "/hook",
        post(move |Json(body): Json<serde_json::Value>| {
            let received = received_in.clone();
            async move {
                received.lock().unwrap().push(body);
                StatusCode::NO_CONTENT
            }
        }),
    );
    let addr = serve(app).await;

    let sink = HttpWebhookSink::new(format!("http://{}/hook", addr));
    let mut message = inbound("!prompt hello");
    message.author.avatar_url = None;
    let record = WebhookRecord::new("hello", "Hi there", &message);
    sink.post(&record).await.expect("post");

    let received = received.lock().unwrap();
    assert_eq!(
        received[0],
        json!({
            "title": "hello",
            "description": "Hi there",
            "timestamp": "2024-05-01T12:30:45.000Z",
            "username": "Ada L.",
            "avatar": null
        })
    );
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let app = Router::new().route("/hook", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let addr = serve(app).await;

    let sink = HttpWebhookSink::new(format!("http://{}/hook", addr));
    let record = WebhookRecord::new("p", "r", &inbound("!prompt p"));
    match sink.post(&record).await {
        Err(WebhookError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected status error, got {:?}", other),
    }
}
