//! 对话接口：`POST /v1/chat/completions` 与旧 `POST /hunyuan`

use axum::{body::Bytes, extract::State, Json};
use tokio::time::timeout;
use tracing::{debug, error, info};

use super::schema::{parse_body, ChatCompletionResponse, PreparedRequest};
use super::state::AppState;
use crate::error::{GatewayError, GatewayResult};

/// OpenAI 兼容格式
pub async fn chat_completions(
    State(state): State<AppState>,
    body: Bytes,
) -> GatewayResult<Json<ChatCompletionResponse>> {
    info!("收到OpenAI格式请求");
    let prepared = PreparedRequest::from_chat(parse_body(&body, false)?)?;
    if prepared.stream {
        debug!("请求了流式输出，按非流式返回");
    }
    complete(&state, prepared).await.map(Json)
}

/// 旧格式，响应同样是 chat.completion 对象
pub async fn legacy_completion(
    State(state): State<AppState>,
    body: Bytes,
) -> GatewayResult<Json<ChatCompletionResponse>> {
    info!("收到原有格式请求，转换为OpenAI格式");
    let prepared = PreparedRequest::from_legacy(parse_body(&body, true)?)?;
    complete(&state, prepared).await.map(Json)
}

/// 占用一个标签页执行编排；超过外层截止时间时放弃等待并释放占用
async fn complete(
    state: &AppState,
    prepared: PreparedRequest,
) -> GatewayResult<ChatCompletionResponse> {
    let deadline = state.request_timeout;
    let work = async {
        let lease = state.pool.acquire().await?;
        state.orchestrator.run(&lease, &prepared.task).await
    };

    let envelope = match timeout(deadline, work).await {
        Ok(result) => result?,
        Err(_) => {
            error!("请求处理超过 {:?}，放弃等待", deadline);
            return Err(GatewayError::Timeout {
                timeout_secs: deadline.as_secs(),
            });
        }
    };

    info!(
        "请求处理完成: ID={}, 文本长度={}",
        envelope.session_id,
        envelope.text.chars().count()
    );
    Ok(ChatCompletionResponse::new(
        prepared.model,
        &prepared.task.query_text,
        envelope,
    ))
}
