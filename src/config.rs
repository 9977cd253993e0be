//! 程序配置
//!
//! 默认值 → 可选 TOML 文件（`GATEWAY_CONFIG`）→ 环境变量，后者覆盖前者。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 标签页池容量（同时存在的 Worker 上限）
    pub max_workers: usize,
    /// Worker 初始化最大尝试次数
    pub init_max_retries: usize,
    /// 两次初始化尝试之间的等待
    pub init_retry_backoff: Duration,
    /// 健康刷新周期
    pub refresh_interval: Duration,
    /// 单个请求的外层截止时间
    pub request_timeout: Duration,
    /// 目标URL
    pub target_url: String,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 是否自行启动无头浏览器（否则连接调试端口上已登录的浏览器）
    pub headless: bool,
    /// 浏览器可执行文件路径（仅无头模式使用）
    pub chrome_executable: Option<PathBuf>,
    /// 上传临时文件目录
    pub upload_dir: PathBuf,
    /// 输出日志文件
    pub log_file: String,
    /// 页面交互时间参数
    pub ui: UiTimings,
    /// 回复稳定检测时间参数
    pub stabilizer: StabilizerTimings,
}

/// 页面交互的等待与停顿
#[derive(Clone, Copy, Debug)]
pub struct UiTimings {
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 定位输入框、发送按钮、当前会话等元素时每个选择器的等待上限
    pub locator_timeout: Duration,
    /// 定位上传相关元素时每个选择器的等待上限
    pub upload_locator_timeout: Duration,
    /// 查找会话列表元素的等待上限（0 表示只探测一次）
    pub session_probe_timeout: Duration,
    /// 点击后的停顿
    pub action_settle: Duration,
    /// 新会话欢迎语的等待上限
    pub welcome_wait: Duration,
    /// 文件提交后的停顿
    pub upload_settle: Duration,
    /// 健康刷新后的停顿
    pub refresh_settle: Duration,
}

impl Default for UiTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            locator_timeout: Duration::from_secs(8),
            upload_locator_timeout: Duration::from_secs(5),
            session_probe_timeout: Duration::ZERO,
            action_settle: Duration::from_millis(500),
            welcome_wait: Duration::from_secs(2),
            upload_settle: Duration::from_secs(2),
            refresh_settle: Duration::from_millis(500),
        }
    }
}

/// 回复稳定检测参数
#[derive(Clone, Copy, Debug)]
pub struct StabilizerTimings {
    /// 首次稳定判定所需的不变时长
    pub initial_wait: Duration,
    /// 复查与最终确认所需的不变时长
    pub confirm_wait: Duration,
    /// 单次稳定检测的超时
    pub timeout: Duration,
    /// 疑似回显时复查前的额外等待
    pub echo_backoff: Duration,
    /// 回显校验轮数
    pub max_rounds: usize,
}

impl Default for StabilizerTimings {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_millis(500),
            confirm_wait: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            echo_backoff: Duration::from_secs(1),
            max_rounds: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_workers: 3,
            init_max_retries: 3,
            init_retry_backoff: Duration::from_secs(2),
            refresh_interval: Duration::from_secs(600),
            request_timeout: Duration::from_secs(300),
            target_url: "https://yuanbao.tencent.com/login".to_string(),
            browser_debug_port: 9222,
            headless: false,
            chrome_executable: None,
            upload_dir: std::env::temp_dir(),
            log_file: "app.log".to_string(),
            ui: UiTimings::default(),
            stabilizer: StabilizerTimings::default(),
        }
    }
}

/// TOML 配置文件中允许出现的字段，全部可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileOverlay {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_workers: Option<usize>,
    pub init_max_retries: Option<usize>,
    pub init_retry_backoff_ms: Option<u64>,
    pub refresh_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub target_url: Option<String>,
    pub browser_debug_port: Option<u16>,
    pub headless: Option<bool>,
    pub chrome_executable: Option<PathBuf>,
    pub upload_dir: Option<PathBuf>,
    pub log_file: Option<String>,
}

impl Config {
    /// 读取配置：默认值，叠加 `GATEWAY_CONFIG` 指向的 TOML 文件，再叠加环境变量
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("GATEWAY_CONFIG") {
            config.apply_file(Path::new(&path));
        }
        config.apply_env();
        config
    }

    /// 叠加 TOML 配置文件；读取或解析失败时记录告警并保持原值
    pub fn apply_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<FileOverlay>(&raw) {
                Ok(overlay) => self.apply_overlay(overlay),
                Err(e) => warn!("配置文件 {} 解析失败，忽略: {}", path.display(), e),
            },
            Err(e) => warn!("配置文件 {} 读取失败，忽略: {}", path.display(), e),
        }
    }

    /// 只从环境变量读取（未设置或无法解析的项使用默认值）
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_overlay(&mut self, overlay: FileOverlay) {
        if let Some(v) = overlay.host {
            self.host = v;
        }
        if let Some(v) = overlay.port {
            self.port = v;
        }
        if let Some(v) = overlay.max_workers {
            self.max_workers = v.max(1);
        }
        if let Some(v) = overlay.init_max_retries {
            self.init_max_retries = v.max(1);
        }
        if let Some(v) = overlay.init_retry_backoff_ms {
            self.init_retry_backoff = Duration::from_millis(v);
        }
        if let Some(v) = overlay.refresh_interval_secs {
            self.refresh_interval = Duration::from_secs(v);
        }
        if let Some(v) = overlay.request_timeout_secs {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = overlay.target_url {
            self.target_url = v;
        }
        if let Some(v) = overlay.browser_debug_port {
            self.browser_debug_port = v;
        }
        if let Some(v) = overlay.headless {
            self.headless = v;
        }
        if overlay.chrome_executable.is_some() {
            self.chrome_executable = overlay.chrome_executable;
        }
        if let Some(v) = overlay.upload_dir {
            self.upload_dir = v;
        }
        if let Some(v) = overlay.log_file {
            self.log_file = v;
        }
    }

    fn apply_env(&mut self) {
        let default = self.clone();
        self.host = std::env::var("HOST").unwrap_or(default.host);
        self.port = env_parse("PORT").unwrap_or(default.port);
        self.max_workers = env_parse::<usize>("MAX_WORKERS").map(|v| v.max(1)).unwrap_or(default.max_workers);
        self.init_max_retries = env_parse::<usize>("INIT_MAX_RETRIES").map(|v| v.max(1)).unwrap_or(default.init_max_retries);
        self.init_retry_backoff = env_parse("INIT_RETRY_BACKOFF_MS").map(Duration::from_millis).unwrap_or(default.init_retry_backoff);
        self.refresh_interval = env_parse("REFRESH_INTERVAL_SECS").map(Duration::from_secs).unwrap_or(default.refresh_interval);
        self.request_timeout = env_parse("REQUEST_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(default.request_timeout);
        self.target_url = std::env::var("TARGET_URL").unwrap_or(default.target_url);
        self.browser_debug_port = env_parse("BROWSER_DEBUG_PORT").unwrap_or(default.browser_debug_port);
        self.headless = env_parse("HEADLESS").unwrap_or(default.headless);
        self.chrome_executable = std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from).or(default.chrome_executable);
        self.upload_dir = std::env::var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(default.upload_dir);
        self.log_file = std::env::var("LOG_FILE").unwrap_or(default.log_file);
    }

    /// 监听地址字符串
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("环境变量 {}='{}' 无法解析，使用默认值", key, raw);
            None
        }
    }
}
