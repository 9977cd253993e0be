//! 自动化句柄抽象
//!
//! 一个句柄对应一个受控的浏览器标签页。上层只通过选择器读取文本、点击、输入、
//! 提交文件，不接触具体的浏览器实现。

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::HandleResult;

/// 单个标签页的查询 / 操作能力
///
/// 方法都是“立即执行一次”的原语，等待由调用方通过 [`poll_until`](super::poll_until)
/// 或 [`Locator`](super::Locator) 组合出来。
#[async_trait]
pub trait AutomationHandle: Send + Sync {
    /// 重新加载当前页面
    async fn reload(&self) -> HandleResult<()>;

    /// 页面标题（健康检查用）
    async fn title(&self) -> HandleResult<String>;

    /// 选择器当前匹配的元素数量
    async fn count(&self, selector: &str) -> HandleResult<usize>;

    /// 选择器匹配的所有元素的可见文本，按文档顺序
    async fn texts(&self, selector: &str) -> HandleResult<Vec<String>>;

    /// 第 index 个匹配元素的属性值
    async fn attribute(&self, selector: &str, index: usize, name: &str)
        -> HandleResult<Option<String>>;

    /// 点击第 index 个匹配元素
    async fn click(&self, selector: &str, index: usize) -> HandleResult<()>;

    /// 清空第一个匹配的输入控件
    async fn clear(&self, selector: &str) -> HandleResult<()>;

    /// 向第一个匹配的输入控件写入文本
    async fn type_text(&self, selector: &str, text: &str) -> HandleResult<()>;

    /// 一次性把多个本地文件交给第一个匹配的文件输入控件
    async fn set_files(&self, selector: &str, paths: &[PathBuf]) -> HandleResult<()>;

    /// 关闭标签页
    async fn close(&self) -> HandleResult<()>;

    /// 最后一个匹配元素的文本，没有匹配时返回 `None`
    async fn last_text(&self, selector: &str) -> HandleResult<Option<String>> {
        Ok(self.texts(selector).await?.pop())
    }
}

/// 句柄工厂：为指定 Worker 打开一个新的标签页并导航到目标页面
#[async_trait]
pub trait HandleFactory: Send + Sync {
    async fn open(&self, worker_id: usize) -> HandleResult<Box<dyn AutomationHandle>>;
}
