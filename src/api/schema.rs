//! 请求 / 响应的线上格式
//!
//! 两种入口（OpenAI 兼容格式、旧 `/hunyuan` 格式）都在这里转换成 [`Task`]，
//! 结果统一包装成 OpenAI 兼容的 chat.completion 对象。

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{GatewayError, GatewayResult};
use crate::models::ChatModel;
use crate::workflow::{FileAttachment, Media, ResponseEnvelope, SessionTarget, Task};

/// 表示“不上传图片”的 picture 取值
const NO_PICTURE: &str = "new";

static FILE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^file(\d+)$").expect("静态正则"));

// ========== 请求 ==========

/// `POST /v1/chat/completions` 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    /// 接受但不支持流式，始终一次性返回
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sequence: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<InboundContent>,
}

/// 消息内容：纯文本或内容片段数组
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundContent {
    Text(String),
    Parts(Vec<InboundContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundContentPart {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundContent {
    fn flatten(&self) -> String {
        match self {
            InboundContent::Text(text) => text.clone(),
            InboundContent::Parts(parts) => parts
                .iter()
                .filter(|part| part.kind.as_deref().is_none_or(|kind| kind == "text"))
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// 旧 `POST /hunyuan` 请求体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sequence: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub picture: Option<String>,
}

/// 字符串、数字、布尔都接受为字符串，null 视为缺省
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// 把 OpenAI messages 拼成一段文本，未知角色忽略
pub fn messages_to_text(messages: &[InboundMessage]) -> String {
    messages
        .iter()
        .filter_map(|message| {
            let content = message
                .content
                .as_ref()
                .map(InboundContent::flatten)
                .unwrap_or_default();
            let prefix = match message.role.as_deref().unwrap_or("user") {
                "system" => "系统指令",
                "assistant" => "助手",
                "user" => "用户",
                _ => return None,
            };
            Some(format!("{}: {}", prefix, content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 收集 `fileN` 附件，按 N 排序；文件名取同编号的 `filenameN`，缺省为字段名
pub fn extract_attachments(body: &Map<String, JsonValue>) -> Vec<FileAttachment> {
    let mut numbered: Vec<(u64, FileAttachment)> = body
        .iter()
        .filter_map(|(key, value)| {
            let caps = FILE_KEY.captures(key)?;
            let number = caps[1].parse::<u64>().ok()?;
            let data = value.as_str().filter(|data| !data.trim().is_empty())?;
            let filename = body
                .get(&format!("filename{}", &caps[1]))
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map_or_else(|| key.clone(), str::to_string);
            Some((
                number,
                FileAttachment {
                    key: key.clone(),
                    filename,
                    data: data.to_string(),
                },
            ))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    numbered.into_iter().map(|(_, file)| file).collect()
}

/// picture 为空或为 `"new"` 时视为没有图片
fn picture_payload(picture: Option<String>) -> Option<String> {
    picture.filter(|p| {
        let p = p.trim();
        !p.is_empty() && p != NO_PICTURE
    })
}

/// 解析请求体为 JSON 对象
///
/// - 空请求体：“请求数据为空”
/// - 非 JSON：“无效的JSON格式”
/// - `lenient` 为真时（旧接口）：JSON 字符串再解析一次，解析失败则当作 `{"text": s}`；
///   其他非对象值当作 `{"text": 值}`
pub fn parse_body(raw: &[u8], lenient: bool) -> GatewayResult<Map<String, JsonValue>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::malformed("请求数据为空"));
    }
    let value: JsonValue =
        serde_json::from_slice(raw).map_err(|_| GatewayError::malformed("无效的JSON格式"))?;

    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Err(GatewayError::malformed("请求数据为空")),
        JsonValue::String(inner) if lenient => match serde_json::from_str::<JsonValue>(&inner) {
            Ok(JsonValue::Object(map)) => Ok(map),
            _ => Ok(text_only(inner)),
        },
        other if lenient => Ok(text_only(other.to_string())),
        _ => Err(GatewayError::malformed("请求数据必须是JSON对象")),
    }
}

fn text_only(text: String) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert("text".to_string(), JsonValue::String(text));
    map
}

/// 经过校验、可以交给编排流程的请求
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub task: Task,
    /// 回显在响应里的模型（未知值已回落为默认）
    pub model: ChatModel,
    pub stream: bool,
}

impl PreparedRequest {
    /// OpenAI 兼容格式
    pub fn from_chat(body: Map<String, JsonValue>) -> GatewayResult<Self> {
        let files = extract_attachments(&body);
        let request: ChatCompletionRequest = serde_json::from_value(JsonValue::Object(body))
            .map_err(|e| GatewayError::malformed(format!("请求格式错误: {}", e)))?;

        let text = messages_to_text(&request.messages);
        if text.trim().is_empty() {
            return Err(GatewayError::malformed("消息内容不能为空"));
        }

        let model = ChatModel::resolve(request.model.as_deref());
        let task = Task::new(text, SessionTarget::parse(request.sequence.as_deref()))
            .with_model(request.model)
            .with_media(Media {
                image: picture_payload(request.picture),
                files,
            });
        Ok(Self {
            task,
            model,
            stream: request.stream.unwrap_or(false),
        })
    }

    /// 旧 `/hunyuan` 格式：文本、图片、文件至少要有一个
    pub fn from_legacy(body: Map<String, JsonValue>) -> GatewayResult<Self> {
        let files = extract_attachments(&body);
        let request: LegacyRequest = serde_json::from_value(JsonValue::Object(body))
            .map_err(|e| GatewayError::malformed(format!("请求格式错误: {}", e)))?;

        let text = request.text.unwrap_or_default();
        let media = Media {
            image: picture_payload(request.picture),
            files,
        };
        if text.trim().is_empty() && media.is_empty() {
            return Err(GatewayError::malformed("消息内容不能为空"));
        }

        let model = ChatModel::resolve(request.mode.as_deref());
        let task = Task::new(text, SessionTarget::parse(request.sequence.as_deref()))
            .with_model(request.mode)
            .with_media(media);
        Ok(Self {
            task,
            model,
            stream: false,
        })
    }
}

// ========== 响应 ==========

#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: AssistantMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

/// 用量按字符数统计
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl ChatCompletionResponse {
    pub fn new(model: ChatModel, prompt: &str, envelope: ResponseEnvelope) -> Self {
        let prompt_tokens = prompt.chars().count();
        let completion_tokens = envelope.text.chars().count();
        Self {
            id: format!("chatcmpl-{}", envelope.session_id),
            object: "chat.completion",
            created: now_unix_secs(),
            model: model.id().to_string(),
            choices: vec![ChatChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant",
                    content: envelope.text,
                },
                finish_reason: "stop",
            }],
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        }
    }
}

/// `GET /v1/models` 响应
#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Serialize)]
pub struct ModelCard {
    pub id: &'static str,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: &'static str,
}

impl ModelList {
    pub fn supported() -> Self {
        let created = now_unix_secs();
        Self {
            object: "list",
            data: ChatModel::ALL
                .into_iter()
                .map(|model| ModelCard {
                    id: model.id(),
                    object: "model",
                    created,
                    owned_by: "tencent",
                })
                .collect(),
        }
    }
}

/// 当前 Unix 时间戳（秒）
pub fn now_unix_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
