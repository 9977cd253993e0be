//! 单次请求的任务数据
//!
//! 封装"这次请求要在哪个会话、用哪个模型、发什么"这一信息

use std::fmt::Display;

/// 请求新会话时使用的会话标识
pub const NEW_SESSION: &str = "new";

/// 目标会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    /// 新建会话
    New,
    /// 切换到（或停留在）指定会话
    Existing(String),
}

impl SessionTarget {
    /// 缺省、空白或 `"new"` 均表示新会话
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(NEW_SESSION) => SessionTarget::New,
            Some(id) => SessionTarget::Existing(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionTarget::New => NEW_SESSION,
            SessionTarget::Existing(id) => id,
        }
    }
}

/// 一个文件附件（`fileN` / `filenameN`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// 请求中的字段名，如 `file1`
    pub key: String,
    /// 声明的文件名
    pub filename: String,
    /// base64 内容（可带 data URI 前缀）
    pub data: String,
}

impl FileAttachment {
    /// 扩展名（小写，不含点）
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// 随消息上传的媒体
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Media {
    /// 单张图片（base64，可带 data URI 前缀）
    pub image: Option<String>,
    /// 多个文件附件
    pub files: Vec<FileAttachment>,
}

impl Media {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.files.is_empty()
    }
}

/// 一次请求的任务
#[derive(Debug, Clone)]
pub struct Task {
    pub query_text: String,
    pub target_session: SessionTarget,
    /// 请求中的模型标识，未知值在编排时回落到默认模型
    pub requested_model: Option<String>,
    pub media: Media,
}

impl Task {
    pub fn new(query_text: impl Into<String>, target_session: SessionTarget) -> Self {
        Self {
            query_text: query_text.into(),
            target_session,
            requested_model: None,
            media: Media::default(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.requested_model = model;
        self
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = media;
        self
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[会话 {} 模型 {} 图片 {} 文件 {}]",
            self.target_session.as_str(),
            self.requested_model.as_deref().unwrap_or("-"),
            if self.media.image.is_some() { 1 } else { 0 },
            self.media.files.len()
        )
    }
}

/// 编排结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub session_id: String,
    pub text: String,
}
