//! Chromium 标签页句柄 - 基础设施层
//!
//! 持有唯一的 Page 资源。读取类操作统一走页面 JS（`document.querySelectorAll`），
//! 点击、输入、文件提交走 CDP 原生命令。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::{AutomationHandle, HandleFactory};
use crate::error::{HandleError, HandleResult};

/// 单个标签页
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 [`AutomationHandle`] 原语
/// - 不认识会话 / 模型 / 上传等业务概念
pub struct ChromiumHandle {
    page: Page,
    worker_id: usize,
}

impl ChromiumHandle {
    pub fn new(page: Page, worker_id: usize) -> Self {
        Self { page, worker_id }
    }

    /// 执行 JS 代码并反序列化为指定类型
    async fn eval_as<T: DeserializeOwned>(&self, js_code: String) -> HandleResult<T> {
        let result = self.page.evaluate(js_code).await?;
        Ok(result.into_value()?)
    }

    /// 执行 JS 代码，未返回值时视为 null
    async fn eval(&self, js_code: String) -> HandleResult<JsonValue> {
        let result = self.page.evaluate(js_code).await?;
        Ok(result.into_value::<JsonValue>().unwrap_or(JsonValue::Null))
    }

    async fn nth_element(
        &self,
        selector: &str,
        index: usize,
    ) -> HandleResult<chromiumoxide::Element> {
        self.page
            .find_elements(selector)
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| HandleError::NotFound {
                selector: selector.to_string(),
                index,
            })
    }
}

/// 把字符串编码为 JS 字面量
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl AutomationHandle for ChromiumHandle {
    async fn reload(&self) -> HandleResult<()> {
        debug!("标签页 {}: 重新加载页面", self.worker_id);
        self.page.reload().await?;
        Ok(())
    }

    async fn title(&self) -> HandleResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> HandleResult<usize> {
        self.eval_as(format!(
            "document.querySelectorAll({}).length",
            js_str(selector)
        ))
        .await
    }

    async fn texts(&self, selector: &str) -> HandleResult<Vec<String>> {
        self.eval_as(format!(
            "Array.from(document.querySelectorAll({}), el => el.innerText || el.textContent || '')",
            js_str(selector)
        ))
        .await
    }

    async fn attribute(
        &self,
        selector: &str,
        index: usize,
        name: &str,
    ) -> HandleResult<Option<String>> {
        let value = self
            .eval(format!(
                r#"(() => {{
                    const el = document.querySelectorAll({sel})[{index}];
                    return el ? el.getAttribute({name}) : null;
                }})()"#,
                sel = js_str(selector),
                index = index,
                name = js_str(name),
            ))
            .await?;
        Ok(value.as_str().map(str::to_owned))
    }

    async fn click(&self, selector: &str, index: usize) -> HandleResult<()> {
        self.nth_element(selector, index).await?.click().await?;
        Ok(())
    }

    async fn clear(&self, selector: &str) -> HandleResult<()> {
        let cleared = self
            .eval(format!(
                r#"(() => {{
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    if ('value' in el) {{ el.value = ''; }} else {{ el.innerHTML = ''; }}
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    return true;
                }})()"#,
                sel = js_str(selector),
            ))
            .await?;
        if cleared.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(HandleError::NotFound {
                selector: selector.to_string(),
                index: 0,
            })
        }
    }

    async fn type_text(&self, selector: &str, text: &str) -> HandleResult<()> {
        self.page.find_element(selector).await?.focus().await?;
        // insertText 不产生按键事件，文本中的换行不会触发发送
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn set_files(&self, selector: &str, paths: &[PathBuf]) -> HandleResult<()> {
        let input = self.page.find_element(selector).await?;
        let files: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let params = SetFileInputFilesParams::builder()
            .files(files)
            .backend_node_id(input.backend_node_id)
            .build()
            .map_err(HandleError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn close(&self) -> HandleResult<()> {
        info!("标签页 {}: 关闭页面", self.worker_id);
        self.page.clone().close().await?;
        Ok(())
    }
}

/// 在共享浏览器实例上为每个 Worker 打开独立标签页
pub struct ChromiumFactory {
    browser: Arc<Browser>,
    target_url: String,
}

impl ChromiumFactory {
    pub fn new(browser: Browser, target_url: impl Into<String>) -> Self {
        Self {
            browser: Arc::new(browser),
            target_url: target_url.into(),
        }
    }
}

#[async_trait]
impl HandleFactory for ChromiumFactory {
    async fn open(&self, worker_id: usize) -> HandleResult<Box<dyn AutomationHandle>> {
        info!("标签页 {}: 打开新标签页 {}", worker_id, self.target_url);
        let page = self.browser.new_page(self.target_url.as_str()).await?;
        Ok(Box::new(ChromiumHandle::new(page, worker_id)))
    }
}
