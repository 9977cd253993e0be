use axum::{extract::State, Json};

use super::state::AppState;
use crate::pool::PoolHealth;

/// `GET /health`：返回各标签页最近记录的状态，不打扰正在处理的请求
pub async fn health_check(State(state): State<AppState>) -> Json<PoolHealth> {
    Json(state.pool.health())
}
