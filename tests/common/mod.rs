//! 测试用的内存页面与工厂
//!
//! `FakePage` 用一张 "选择器 → 元素" 表模拟页面；点击发送按钮后，最后一个消息气泡
//! 按脚本随（tokio 的）时间推进变化。所有操作都记录在 `actions` 里供断言。

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use yuanbao_gateway::config::{StabilizerTimings, UiTimings};
use yuanbao_gateway::error::{HandleError, HandleResult};
use yuanbao_gateway::pool::{WorkerPool, WorkerSettings};
use yuanbao_gateway::workflow::selectors::{
    ACTIVE_SESSION, DIALOG_DISMISS, DOCUMENT_FILE_INPUT, IMAGE_FILE_INPUT, MESSAGE_BUBBLE,
    MESSAGE_INPUT, MODEL_OPTION, MODEL_SWITCH, NEW_SESSION_BUTTON, SEND_BUTTON, SESSION_ID_ATTR,
    UPLOAD_BUTTON, WELCOME_MARKER,
};
use yuanbao_gateway::workflow::SessionOrchestrator;
use yuanbao_gateway::{AutomationHandle, HandleFactory};

pub type SharedPage = Arc<Mutex<PageState>>;

/// 页面上发生过的操作
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Reload,
    Click(String, usize),
    Clear(String),
    Type(String, String),
    SetFiles {
        selector: String,
        paths: Vec<PathBuf>,
        /// 提交时文件是否都存在
        existed: bool,
    },
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
}

impl FakeElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attrs: HashMap::new(),
        }
    }

    pub fn session(id: &str) -> Self {
        let mut attrs = HashMap::new();
        attrs.insert(SESSION_ID_ATTR.to_string(), id.to_string());
        Self {
            text: format!("会话 {}", id),
            attrs,
        }
    }
}

pub struct PageState {
    pub elements: HashMap<String, Vec<FakeElement>>,
    /// 发送前已有的消息气泡
    pub history: Vec<String>,
    /// 点击发送后最后一个气泡的文本：(距发送的时长, 文本)
    pub reply_script: Vec<(Duration, String)>,
    pub sent_at: Option<Instant>,
    /// 点击发送后当前会话变为该 ID
    pub session_after_send: Option<String>,
    /// 点击某个选择器后当前会话变为该 ID
    pub activates: HashMap<String, String>,
    pub actions: Vec<Action>,
    pub reload_error: bool,
    pub title: String,
    /// 读取标题前的延迟
    pub title_delay: Option<Duration>,
    /// 标题被读取的次数
    pub title_reads: usize,
    /// 接下来这么多次读取消息气泡会失败
    pub failing_bubble_reads: usize,
}

impl PageState {
    /// 所有控件齐全、当前会话为 `conv-1`、列表中还有 `conv-2` 的页面
    pub fn ready() -> Self {
        let mut state = Self {
            elements: HashMap::new(),
            history: Vec::new(),
            reply_script: Vec::new(),
            sent_at: None,
            session_after_send: None,
            activates: HashMap::new(),
            actions: Vec::new(),
            reload_error: false,
            title: "腾讯元宝".to_string(),
            title_delay: None,
            title_reads: 0,
            failing_bubble_reads: 0,
        };
        state.put(ACTIVE_SESSION[0], vec![FakeElement::session("conv-1")]);
        state.put("[dt-cid='conv-2']", vec![FakeElement::session("conv-2")]);
        state
            .activates
            .insert("[dt-cid='conv-2']".to_string(), "conv-2".to_string());
        state.put(NEW_SESSION_BUTTON[0], vec![FakeElement::default()]);
        state.put(WELCOME_MARKER[0], vec![FakeElement::text("有什么可以帮你？")]);
        state.put(MODEL_SWITCH[0], vec![FakeElement::default()]);
        state.put(
            MODEL_OPTION,
            vec![FakeElement::text("Hunyuan-T1"), FakeElement::text("DeepSeek-R1")],
        );
        state.put(UPLOAD_BUTTON[0], vec![FakeElement::default()]);
        state.put(IMAGE_FILE_INPUT[0], vec![FakeElement::default()]);
        state.put(DOCUMENT_FILE_INPUT[0], vec![FakeElement::default()]);
        state.put(MESSAGE_INPUT[0], vec![FakeElement::default()]);
        state.put(SEND_BUTTON[0], vec![FakeElement::default()]);
        state.put(DIALOG_DISMISS, vec![FakeElement::default()]);
        state
    }

    pub fn put(&mut self, selector: &str, elements: Vec<FakeElement>) {
        self.elements.insert(selector.to_string(), elements);
    }

    pub fn remove(&mut self, selector: &str) {
        self.elements.remove(selector);
    }

    /// 回复脚本：每个元素为 (距发送的毫秒数, 文本)
    pub fn with_reply(mut self, frames: &[(u64, &str)]) -> Self {
        self.reply_script = frames
            .iter()
            .map(|(ms, text)| (Duration::from_millis(*ms), text.to_string()))
            .collect();
        self
    }

    pub fn with_session_after_send(mut self, session_id: &str) -> Self {
        self.session_after_send = Some(session_id.to_string());
        self
    }

    /// 当作消息已经在此刻发出（直接测试回复检测时使用）
    pub fn reply_started_now(mut self) -> Self {
        self.sent_at = Some(Instant::now());
        self
    }

    fn bubbles(&self) -> Vec<String> {
        let mut bubbles = self.history.clone();
        if let Some(sent_at) = self.sent_at {
            let elapsed = sent_at.elapsed();
            if let Some((_, text)) = self
                .reply_script
                .iter()
                .filter(|(offset, _)| *offset <= elapsed)
                .last()
            {
                bubbles.push(text.clone());
            }
        }
        bubbles
    }

    /// 先按完整选择器查找；找不到时把顶层逗号分隔的选择器列表按并集处理
    fn matching(&self, selector: &str) -> Vec<FakeElement> {
        if selector == MESSAGE_BUBBLE {
            return self.bubbles().iter().map(|t| FakeElement::text(t)).collect();
        }
        if let Some(elements) = self.elements.get(selector) {
            return elements.clone();
        }
        split_selector_list(selector)
            .into_iter()
            .flat_map(|s| self.elements.get(s).cloned().unwrap_or_default())
            .collect()
    }

    fn set_active_session(&mut self, session_id: &str) {
        self.put(ACTIVE_SESSION[0], vec![FakeElement::session(session_id)]);
    }

    pub fn clicks(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Click(selector, _) => Some(selector.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn typed(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Type(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reloads(&self) -> usize {
        self.actions.iter().filter(|a| **a == Action::Reload).count()
    }
}

/// 只在方括号和引号之外的逗号处切分，`[accept*='.png,.jpg']` 这样的属性值保持完整
pub fn split_selector_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn not_found(selector: &str, index: usize) -> HandleError {
    HandleError::NotFound {
        selector: selector.to_string(),
        index,
    }
}

pub struct FakePage {
    pub state: SharedPage,
}

impl FakePage {
    pub fn new(state: PageState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

#[async_trait]
impl AutomationHandle for FakePage {
    async fn reload(&self) -> HandleResult<()> {
        let mut state = self.state.lock();
        state.actions.push(Action::Reload);
        if state.reload_error {
            return Err(HandleError::Browser("模拟刷新失败".to_string()));
        }
        Ok(())
    }

    async fn title(&self) -> HandleResult<String> {
        let (delay, title) = {
            let mut state = self.state.lock();
            state.title_reads += 1;
            (state.title_delay, state.title.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(title)
    }

    async fn count(&self, selector: &str) -> HandleResult<usize> {
        Ok(self.state.lock().matching(selector).len())
    }

    async fn texts(&self, selector: &str) -> HandleResult<Vec<String>> {
        let mut state = self.state.lock();
        if selector == MESSAGE_BUBBLE && state.failing_bubble_reads > 0 {
            state.failing_bubble_reads -= 1;
            return Err(HandleError::Browser("模拟读取失败".to_string()));
        }
        Ok(state
            .matching(selector)
            .into_iter()
            .map(|e| e.text)
            .collect())
    }

    async fn attribute(
        &self,
        selector: &str,
        index: usize,
        name: &str,
    ) -> HandleResult<Option<String>> {
        let state = self.state.lock();
        let element = state
            .matching(selector)
            .into_iter()
            .nth(index)
            .ok_or_else(|| not_found(selector, index))?;
        Ok(element.attrs.get(name).cloned())
    }

    async fn click(&self, selector: &str, index: usize) -> HandleResult<()> {
        let mut state = self.state.lock();
        if state.matching(selector).len() <= index {
            return Err(not_found(selector, index));
        }
        state.actions.push(Action::Click(selector.to_string(), index));

        if selector == SEND_BUTTON[0] {
            state.sent_at = Some(Instant::now());
            if let Some(id) = state.session_after_send.clone() {
                state.set_active_session(&id);
            }
        }
        if let Some(id) = state.activates.get(selector).cloned() {
            state.set_active_session(&id);
        }
        Ok(())
    }

    async fn clear(&self, selector: &str) -> HandleResult<()> {
        let mut state = self.state.lock();
        if state.matching(selector).is_empty() {
            return Err(not_found(selector, 0));
        }
        state.actions.push(Action::Clear(selector.to_string()));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> HandleResult<()> {
        let mut state = self.state.lock();
        if state.matching(selector).is_empty() {
            return Err(not_found(selector, 0));
        }
        state
            .actions
            .push(Action::Type(selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn set_files(&self, selector: &str, paths: &[PathBuf]) -> HandleResult<()> {
        let mut state = self.state.lock();
        if state.matching(selector).is_empty() {
            return Err(not_found(selector, 0));
        }
        let existed = paths.iter().all(|p| p.exists());
        state.actions.push(Action::SetFiles {
            selector: selector.to_string(),
            paths: paths.to_vec(),
            existed,
        });
        Ok(())
    }

    async fn close(&self) -> HandleResult<()> {
        self.state.lock().actions.push(Action::Close);
        Ok(())
    }
}

/// 按模板创建页面的工厂，可以让前若干次打开失败
pub struct FakeFactory {
    template: Box<dyn Fn() -> PageState + Send + Sync>,
    failures_left: AtomicUsize,
    opened: Mutex<Vec<SharedPage>>,
}

impl FakeFactory {
    pub fn new(template: impl Fn() -> PageState + Send + Sync + 'static) -> Arc<Self> {
        Self::failing(0, template)
    }

    pub fn failing(
        failures: usize,
        template: impl Fn() -> PageState + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            template: Box::new(template),
            failures_left: AtomicUsize::new(failures),
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn set_failures(&self, failures: usize) {
        self.failures_left.store(failures, Ordering::SeqCst);
    }

    /// 成功打开的页面数
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// 第 n 个成功打开的页面
    pub fn page(&self, n: usize) -> SharedPage {
        Arc::clone(&self.opened.lock()[n])
    }
}

#[async_trait]
impl HandleFactory for FakeFactory {
    async fn open(&self, _worker_id: usize) -> HandleResult<Box<dyn AutomationHandle>> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(HandleError::Browser("模拟打开失败".to_string()));
        }
        let page = FakePage::new((self.template)());
        self.opened.lock().push(Arc::clone(&page.state));
        Ok(Box::new(page))
    }
}

pub fn settings(max_retries: usize) -> WorkerSettings {
    WorkerSettings {
        max_retries,
        retry_backoff: Duration::from_millis(100),
        refresh_interval: Duration::from_secs(600),
        refresh_settle: Duration::from_millis(500),
    }
}

pub fn pool_with(capacity: usize, factory: &Arc<FakeFactory>) -> WorkerPool {
    let factory: Arc<dyn HandleFactory> = factory.clone();
    WorkerPool::new(capacity, factory, settings(3))
}

pub fn orchestrator(upload_dir: PathBuf) -> SessionOrchestrator {
    SessionOrchestrator::with_timings(UiTimings::default(), StabilizerTimings::default(), upload_dir)
}
