mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use yuanbao_gateway::{create_router, AppState, WorkerPool};

use common::{orchestrator, pool_with, FakeFactory, PageState};

fn replying() -> PageState {
    PageState::ready()
        .with_reply(&[(0, "正在生成"), (1_500, "你好，我是元宝。")])
        .with_session_after_send("conv-9")
}

struct TestApp {
    router: Router,
    pool: Arc<WorkerPool>,
    _upload_dir: tempfile::TempDir,
}

async fn app(template: fn() -> PageState, request_timeout: Duration) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(template);
    let pool = Arc::new(pool_with(1, &factory));
    pool.bootstrap().await;

    let state = AppState::new(
        Arc::clone(&pool),
        Arc::new(orchestrator(upload_dir.path().to_path_buf())),
        request_timeout,
    );
    TestApp {
        router: create_router(state),
        pool,
        _upload_dir: upload_dir,
    }
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn chat_body(model: &str, content: &str) -> String {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": content}]
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_chat_completion_success() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(
        &app.router,
        post("/v1/chat/completions", chat_body("deepseek", "你好")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "chatcmpl-conv-9");
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "deepseek");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "你好，我是元宝。");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    // "用户: 你好" 6 个字符，回复 8 个字符
    assert_eq!(body["usage"]["prompt_tokens"], 6);
    assert_eq!(body["usage"]["completion_tokens"], 8);
    assert_eq!(body["usage"]["total_tokens"], 14);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_model_echoes_default() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(
        &app.router,
        post("/v1/chat/completions", chat_body("gpt-4", "你好")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "hunyuan");
}

#[tokio::test(start_paused = true)]
async fn test_empty_body_is_bad_request() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(&app.router, post("/v1/chat/completions", Body::empty())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("请求数据为空"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_json_is_bad_request() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(&app.router, post("/v1/chat/completions", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("无效的JSON格式"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_messages_is_bad_request() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(
        &app.router,
        post("/v1/chat/completions", json!({"messages": []}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("消息内容不能为空"));
    // 校验失败不占用标签页
    assert!(app.pool.acquire().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_lists_supported_models() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(&app.router, get("/v1/models")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["hunyuan", "deepseek"]);
}

#[tokio::test(start_paused = true)]
async fn test_health_lists_workers() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_workers"], 1);
    assert_eq!(body["total_workers"], 1);
    assert_eq!(body["workers"][0]["status"], "ok");
    assert_eq!(body["workers"][0]["busy"], false);
    assert_eq!(body["workers"][0]["title"], "腾讯元宝");
}

#[tokio::test(start_paused = true)]
async fn test_busy_pool_returns_503() {
    let app = app(replying, Duration::from_secs(300)).await;
    let _lease = app.pool.acquire().await.unwrap();

    let (status, body) = send(
        &app.router,
        post("/v1/chat/completions", chat_body("hunyuan", "你好")),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "server_busy");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_at_capacity_one() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (first, second) = tokio::join!(
        send(&app.router, post("/v1/chat/completions", chat_body("hunyuan", "你好"))),
        send(&app.router, post("/v1/chat/completions", chat_body("hunyuan", "在吗"))),
    );

    let mut statuses = vec![first.0.as_u16(), second.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 503]);
}

#[tokio::test(start_paused = true)]
async fn test_legacy_plain_string_body() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, body) = send(&app.router, post("/hunyuan", "\"你好\"")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "chatcmpl-conv-9");
    assert_eq!(body["choices"][0]["message"]["content"], "你好，我是元宝。");
}

#[tokio::test(start_paused = true)]
async fn test_legacy_requires_some_content() {
    let app = app(replying, Duration::from_secs(300)).await;

    let (status, _) = send(
        &app.router,
        post("/hunyuan", json!({"sequence": "new", "picture": "new"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_session_is_server_error() {
    let app = app(replying, Duration::from_secs(300)).await;
    let body = json!({
        "messages": [{"role": "user", "content": "继续"}],
        "sequence": "conv-404"
    });

    let (status, body) = send(
        &app.router,
        post("/v1/chat/completions", body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "session_not_found");
    // 失败后标签页已释放
    assert!(app.pool.acquire().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_returns_504_and_releases_worker() {
    fn silent() -> PageState {
        PageState::ready()
    }
    let app = app(silent, Duration::from_secs(5)).await;

    let (status, body) = send(
        &app.router,
        post("/v1/chat/completions", chat_body("hunyuan", "你好")),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["type"], "timeout_error");
    assert!(app.pool.acquire().await.is_ok());
}
