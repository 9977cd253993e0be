//! 错误类型
//!
//! - [`HandleError`]：自动化句柄（浏览器标签页）层面的失败
//! - [`GatewayError`]：一次请求在池 / 编排层面的失败，附带稳定的 HTTP 状态与 `type`/`code`

use axum::http::StatusCode;
use thiserror::Error;

/// 自动化句柄错误
#[derive(Debug, Error)]
pub enum HandleError {
    /// 选择器没有匹配到第 index 个元素
    #[error("未找到元素: {selector} (索引 {index})")]
    NotFound { selector: String, index: usize },

    /// 浏览器 / CDP 调用失败
    #[error("浏览器操作失败: {0}")]
    Browser(String),

    /// 页面脚本返回了无法解析的结果
    #[error("执行脚本失败: {0}")]
    Script(String),

    /// 本地文件操作失败
    #[error("文件操作失败: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for HandleError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        HandleError::Browser(err.to_string())
    }
}

impl From<serde_json::Error> for HandleError {
    fn from(err: serde_json::Error) -> Self {
        HandleError::Script(err.to_string())
    }
}

/// 句柄层结果类型
pub type HandleResult<T> = Result<T, HandleError>;

/// 请求处理错误
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 没有空闲标签页且池已满
    #[error("系统繁忙，请稍后再试")]
    Busy,

    /// 请求体为空或无法解析
    #[error("{0}")]
    MalformedRequest(String),

    /// 目标会话不存在
    #[error("无法定位会话: {session_id}")]
    SessionNotFound { session_id: String },

    /// 会话操作失败（新建会话、读取当前会话 ID）
    #[error("会话操作失败: {0}")]
    SessionOperationFailed(String),

    /// 模型切换失败（软失败，只记录日志）
    #[error("模型切换失败: {model}")]
    ModelSwitchFailed { model: String },

    /// 图片或文件上传失败
    #[error("上传失败: {0}")]
    UploadFailed(String),

    /// 输入或发送消息失败
    #[error("消息发送失败: {0}")]
    SendFailed(String),

    /// 回复始终没有出现
    #[error("等待回复超时（{timeout_secs}秒）")]
    ResponseTimeout { timeout_secs: u64 },

    /// 标签页初始化耗尽重试次数
    #[error("标签页 {worker_id} 初始化失败（已尝试 {attempts} 次）")]
    WorkerInitFailed { worker_id: usize, attempts: usize },

    /// 请求超过外层截止时间
    #[error("请求处理超时（{timeout_secs}秒）")]
    Timeout { timeout_secs: u64 },

    /// 句柄层错误
    #[error(transparent)]
    Handle(#[from] HandleError),
}

impl GatewayError {
    /// HTTP 状态码：客户端 400，容量 503，超时 504，其余 500
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Busy | GatewayError::WorkerInitFailed { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::ResponseTimeout { .. } | GatewayError::Timeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 错误体中的 `type`
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MalformedRequest(_) => "invalid_request_error",
            GatewayError::ResponseTimeout { .. } | GatewayError::Timeout { .. } => "timeout_error",
            _ => "server_error",
        }
    }

    /// 错误体中的 `code`
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Busy => "server_busy",
            GatewayError::MalformedRequest(_) => "invalid_request_error",
            GatewayError::SessionNotFound { .. } => "session_not_found",
            GatewayError::SessionOperationFailed(_) => "session_operation_failed",
            GatewayError::ModelSwitchFailed { .. } => "model_switch_failed",
            GatewayError::UploadFailed(_) => "upload_failed",
            GatewayError::SendFailed(_) => "send_failed",
            GatewayError::ResponseTimeout { .. } | GatewayError::Timeout { .. } => "timeout",
            GatewayError::WorkerInitFailed { .. } => "worker_init_failed",
            GatewayError::Handle(_) => "server_error",
        }
    }

    // ========== 便捷构造函数 ==========

    /// 请求格式错误
    pub fn malformed(message: impl Into<String>) -> Self {
        GatewayError::MalformedRequest(message.into())
    }

    /// 上传失败
    pub fn upload(message: impl Into<String>) -> Self {
        GatewayError::UploadFailed(message.into())
    }

    /// 发送失败
    pub fn send(message: impl Into<String>) -> Self {
        GatewayError::SendFailed(message.into())
    }

    /// 会话操作失败
    pub fn session_op(message: impl Into<String>) -> Self {
        GatewayError::SessionOperationFailed(message.into())
    }
}

/// 请求处理结果类型
pub type GatewayResult<T> = Result<T, GatewayError>;
