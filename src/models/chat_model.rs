/// 可切换的对话模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatModel {
    /// 混元（默认）
    Hunyuan,
    /// DeepSeek
    DeepSeek,
}

impl ChatModel {
    /// 请求未指定或指定了未知模型时使用
    pub const DEFAULT: ChatModel = ChatModel::Hunyuan;

    /// 全部模型，按 `/v1/models` 展示顺序
    pub const ALL: [ChatModel; 2] = [ChatModel::Hunyuan, ChatModel::DeepSeek];

    /// 对外的模型标识
    pub fn id(self) -> &'static str {
        match self {
            ChatModel::Hunyuan => "hunyuan",
            ChatModel::DeepSeek => "deepseek",
        }
    }

    /// 模型下拉选项中用来识别该模型的文字
    pub fn label_keyword(self) -> &'static str {
        match self {
            ChatModel::Hunyuan => "Hunyuan",
            ChatModel::DeepSeek => "DeepSeek",
        }
    }

    /// 从标识解析（忽略大小写与首尾空白）
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.id().eq_ignore_ascii_case(id))
    }

    /// 解析请求中的模型，缺省或未知时回落到默认模型
    pub fn resolve(requested: Option<&str>) -> Self {
        requested.and_then(Self::from_id).unwrap_or(Self::DEFAULT)
    }

    /// 下拉选项文字是否对应该模型（忽略大小写的包含判断）
    pub fn matches_label(self, label: &str) -> bool {
        label
            .to_lowercase()
            .contains(&self.label_keyword().to_lowercase())
    }
}

impl std::fmt::Display for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
