//! HTTP 接口层
//!
//! 只做线上格式与 [`Task`](crate::workflow::Task) / [`ResponseEnvelope`](crate::workflow::ResponseEnvelope)
//! 之间的转换，不直接接触句柄。

mod chat;
mod error;
mod health;
mod models;
pub mod schema;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// 创建路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/hunyuan", post(chat::legacy_completion))
        .route("/v1/models", get(models::list_models))
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
