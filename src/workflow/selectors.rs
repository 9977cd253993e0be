//! 页面选择器表
//!
//! 每个控件一组候选，按优先级排列，交给 [`Locator`](crate::infrastructure::Locator) 逐个尝试。

/// 消息气泡（最后一个即最新回复）
pub const MESSAGE_BUBBLE: &str = ".agent-chat__bubble__content";

/// 会话列表中处于激活状态的会话
pub const ACTIVE_SESSION: &[&str] = &[
    ".yb-recent-conv-list__item.active",
    ".active-conversation",
    "[data-active='true']",
];

/// 会话元素上保存会话 ID 的属性
pub const SESSION_ID_ATTR: &str = "dt-cid";

/// 新建会话按钮
pub const NEW_SESSION_BUTTON: &[&str] = &[
    ".yb-tencent-yuanbao-list__item .yb-tencent-yuanbao-list__logo",
    ".new-conversation",
    "[data-testid='new-conversation']",
];

/// 新会话的欢迎语 / 空状态
pub const WELCOME_MARKER: &[&str] = &[
    ".agent-chat__conv--agent-homepage-v2__greeting",
    ".welcome-message",
    ".empty-state",
];

/// 模型切换按钮
pub const MODEL_SWITCH: &[&str] = &["div[dt-button-id='model_switch'][dt-mod-id='main_mod']"];

/// 模型下拉选项的名称
pub const MODEL_OPTION: &str = ".ybc-model-select-dropdown-item-name";

/// 上传按钮
pub const UPLOAD_BUTTON: &[&str] = &["span[class*='upload-icon']"];

/// 图片文件输入控件
pub const IMAGE_FILE_INPUT: &[&str] = &[
    "input[accept*='capture=filesystem,.jpg,.jpeg,.png,.webp,.bmp,.gif']",
    "input[type='file'][accept*='.png']",
];

/// 文档文件输入控件
pub const DOCUMENT_FILE_INPUT: &[&str] = &[
    "input[accept*='capture=filesystem,,.pdf,.xls,.xlsx,.ppt,.pptx,.doc,.docx,.txt,.csv,.text,.bat,.c,.cpp,.cs,.css,.go,.h,.hpp,.ini,.java,.js,.json,.log,.lua,.md,.php,.pl,.py,.rb,.sh,.sql,.swift,.tex,.toml,.vue,.yaml,.yml,.xml,.html']",
    "input[type='file'][accept*='.pdf']",
];

/// 上传失败提示
pub const UPLOAD_ERROR: &[&str] = &[".upload-error-message", ".error-message", ".alert-danger"];

/// 点击以关闭上传对话框
pub const DIALOG_DISMISS: &str = "body";

/// 消息输入框
pub const MESSAGE_INPUT: &[&str] = &[
    ".ql-editor.ql-blank",
    ".message-input",
    "textarea[placeholder='输入你的问题']",
    "[contenteditable='true']",
];

/// 发送按钮
pub const SEND_BUTTON: &[&str] = &["#yuanbao-send-btn"];

/// 会话列表中指向指定会话的元素
pub fn session_item(session_id: &str) -> Vec<String> {
    let id = escape_attr(session_id);
    vec![
        format!("[dt-cid='{id}']"),
        format!(".conversation-item[data-id='{id}']"),
        format!("[data-session-id='{id}']"),
    ]
}

/// 转义单引号属性值
fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// 多个选择器合并为一个 CSS 选择器列表，任意一个命中即可
pub fn any_of(selectors: &[&str]) -> String {
    selectors.join(", ")
}
