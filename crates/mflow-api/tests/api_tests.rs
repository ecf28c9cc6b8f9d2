//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use mflow_api::{create_router, ApiConfig, AppState};
use mflow_media::FfmpegRunner;
use mflow_queue::{Scheduler, SchedulerConfig, TracingStatusSink, WebhookNotifier, Worker};
use mflow_storage::{LocalStorage, StorageConfig};
use mflow_worker::{MediaJobHandler, WorkerConfig};

struct TestApp {
    dir: TempDir,
    router: Router,
    // Held so queued jobs stay queued.
    _worker: Worker<MediaJobHandler>,
}

fn app(max_queue_length: usize) -> TestApp {
    let dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(StorageConfig {
        root: dir.path().join("store"),
        public_base_url: "http://media.test".to_string(),
        local_input_root: None,
    })
    .unwrap();
    let handler = MediaJobHandler::new(
        Arc::new(storage),
        FfmpegRunner::new(),
        WorkerConfig {
            work_dir: dir.path().join("work"),
        },
    );
    let (scheduler, worker) = Scheduler::new(
        handler,
        Arc::new(TracingStatusSink),
        WebhookNotifier::new().unwrap(),
        SchedulerConfig {
            max_queue_length,
            build_number: "42".to_string(),
        },
    );

    let state = AppState::new(ApiConfig::default(), scheduler, dir.path().join("store"));
    TestApp {
        router: create_router(state, None),
        dir,
        _worker: worker,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn caption_body(webhook_url: Option<&str>) -> String {
    let mut body = json!({
        "video_url": "/does/not/exist.mp4",
        "captions": "/does/not/exist.ass",
        "id": "req-1",
    });
    if let Some(url) = webhook_url {
        body["webhook_url"] = json!(url);
    }
    body.to_string()
}

#[tokio::test]
async fn test_health_reports_queue_state() {
    let app = app(3);
    let health = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app.router, health()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue_length"], 0);
    assert_eq!(body["max_queue_length"], 3);
    assert!(body["queue_id"].is_u64());

    send(
        &app.router,
        post_json("/v1/video/caption", &caption_body(Some("http://127.0.0.1:9/hook"))),
    )
    .await;
    let (_, body) = send(&app.router, health()).await;
    assert_eq!(body["queue_length"], 1);
}

#[tokio::test]
async fn test_malformed_json_is_400_with_detail() {
    let app = app(0);

    let (status, body) = send(&app.router, post_json("/v1/ffmpeg/compose", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, body) = send(&app.router, post_json("/v1/video/caption", r#"{"captions": "a.ass"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("video_url"));
}

#[tokio::test]
async fn test_request_without_webhook_runs_inline() {
    let app = app(0);

    let (status, body) = send(&app.router, post_json("/v1/video/caption", &caption_body(None))).await;

    // The job itself failed to fetch its input; the HTTP status mirrors it.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["endpoint"], "/v1/video/caption");
    assert_eq!(body["id"], "req-1");
    assert_eq!(body["build_number"], "42");
    assert_eq!(body["queue_time"], 0.0);
    assert!(body["response"].is_null());
    assert!(body["message"].as_str().unwrap().contains("Download failed"));
}

#[tokio::test]
async fn test_request_with_webhook_is_queued() {
    let app = app(0);

    let (status, body) = send(
        &app.router,
        post_json("/v1/video/caption", &caption_body(Some("http://127.0.0.1:9/hook"))),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["code"], 202);
    assert_eq!(body["message"], "processing");
    assert_eq!(body["max_queue_length"], "unlimited");
    assert_eq!(body["queue_length"], 1);
    assert!(body["job_id"].is_string());
}

#[tokio::test]
async fn test_bypass_queue_runs_inline_even_with_webhook() {
    let app = app(0);

    let (status, body) = send(
        &app.router,
        post_json(
            "/v1/video/caption?bypass_queue=true",
            &caption_body(Some("http://127.0.0.1:9/hook")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
}

#[tokio::test]
async fn test_full_queue_is_429() {
    let app = app(1);
    let body = caption_body(Some("http://127.0.0.1:9/hook"));

    let (status, _) = send(&app.router, post_json("/v1/video/caption", &body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, rejected) = send(&app.router, post_json("/v1/video/caption", &body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected["code"], 429);
    assert_eq!(rejected["message"], "MAX_QUEUE_LENGTH (1) reached");
    assert!(rejected.get("max_queue_length").is_none());
}

#[tokio::test]
async fn test_image_request_defaults_are_applied() {
    let app = app(0);

    let (status, body) = send(
        &app.router,
        post_json("/v1/image/convert/video", r#"{"image_url": "/does/not/exist.png"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["endpoint"], "/v1/image/convert/video");
}

#[tokio::test]
async fn test_server_local_files_are_never_fetched() {
    let app = app(0);
    let secret = app.dir.path().join("secret.txt");
    std::fs::write(&secret, b"private").unwrap();
    let body = json!({
        "inputs": [{"file_url": secret.to_string_lossy(), "options": []}],
        "filters": [],
        "outputs": [{"options": [{"option": "-f", "argument": "data"}]}],
    });

    let (status, body) = send(&app.router, post_json("/v1/ffmpeg/compose", &body.to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("local paths are not accepted"));
    assert_eq!(std::fs::read_dir(app.dir.path().join("store")).unwrap().count(), 0);
}

#[tokio::test]
async fn test_published_files_are_downloadable() {
    let app = app(0);
    std::fs::write(app.dir.path().join("store").join("abc_output_0.mp4"), b"video-bytes").unwrap();

    let request = Request::builder()
        .uri("/download/abc_output_0.mp4")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"video-bytes");

    let missing = Request::builder()
        .uri("/download/nope.mp4")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
