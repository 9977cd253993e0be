//! 会话服务 - 业务能力层
//!
//! 只负责"会话"能力：读取当前会话、新建会话、切换会话

use tokio::time::sleep;
use tracing::{debug, info};

use super::PageCtx;
use crate::config::UiTimings;
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::Locator;
use crate::workflow::selectors::{self, ACTIVE_SESSION, NEW_SESSION_BUTTON, SESSION_ID_ATTR, WELCOME_MARKER};
use crate::workflow::SessionTarget;

/// 会话解析的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResolution {
    /// 目标会话已是当前会话
    AlreadyCurrent,
    /// 新建了会话
    Created,
    /// 切换到了目标会话
    Switched,
}

/// 会话服务
pub struct SessionService {
    ui: UiTimings,
}

impl SessionService {
    pub fn new(ui: UiTimings) -> Self {
        Self { ui }
    }

    /// 让目标会话成为当前会话
    ///
    /// # 错误
    /// - 新建会话按钮不可用：[`GatewayError::SessionOperationFailed`]
    /// - 会话列表中找不到目标：[`GatewayError::SessionNotFound`]
    pub async fn resolve(
        &self,
        page: PageCtx<'_>,
        target: &SessionTarget,
    ) -> GatewayResult<SessionResolution> {
        let current = self.probe_active_session(page).await;

        match target {
            SessionTarget::Existing(id) if current.as_deref() == Some(id.as_str()) => {
                info!("标签页 {}: 已在目标会话 {}", page.worker_id, id);
                Ok(SessionResolution::AlreadyCurrent)
            }
            SessionTarget::New => {
                self.start_new(page).await?;
                Ok(SessionResolution::Created)
            }
            SessionTarget::Existing(id) => {
                self.switch_to(page, id).await?;
                Ok(SessionResolution::Switched)
            }
        }
    }

    /// 点击新建会话，然后在短时间内等待欢迎语；欢迎语不出现也继续
    async fn start_new(&self, page: PageCtx<'_>) -> GatewayResult<()> {
        info!("标签页 {}: 🆕 新建会话", page.worker_id);
        let button = Locator::required(
            "新建会话按钮",
            NEW_SESSION_BUTTON.iter().copied(),
            self.ui.session_probe_timeout,
        )
        .find(page.handle, self.ui.poll_interval)
        .await
        .map_err(|e| GatewayError::session_op(e.to_string()))?;

        page.handle
            .click(&button, 0)
            .await
            .map_err(|e| GatewayError::session_op(format!("点击新建会话按钮失败: {}", e)))?;
        sleep(self.ui.action_settle).await;

        let welcome = Locator::advisory(
            "新会话欢迎语",
            [selectors::any_of(WELCOME_MARKER)],
            self.ui.welcome_wait,
        )
        .resolve(page.handle, self.ui.poll_interval)
        .await
        .ok()
        .flatten();

        if welcome.is_some() {
            info!("标签页 {}: 新会话已创建", page.worker_id);
        }
        Ok(())
    }

    async fn switch_to(&self, page: PageCtx<'_>, session_id: &str) -> GatewayResult<()> {
        info!("标签页 {}: 切换到会话 {}", page.worker_id, session_id);
        let item = Locator::required(
            format!("会话 {}", session_id),
            selectors::session_item(session_id),
            self.ui.session_probe_timeout,
        )
        .find(page.handle, self.ui.poll_interval)
        .await
        .map_err(|_| GatewayError::SessionNotFound {
            session_id: session_id.to_string(),
        })?;

        page.handle
            .click(&item, 0)
            .await
            .map_err(|e| GatewayError::session_op(format!("点击会话 {} 失败: {}", session_id, e)))?;
        sleep(self.ui.action_settle).await;
        Ok(())
    }

    /// 读取当前会话 ID（只探测一次，失败视为未知）
    async fn probe_active_session(&self, page: PageCtx<'_>) -> Option<String> {
        let locator = Locator::required(
            "当前会话",
            ACTIVE_SESSION.iter().copied(),
            self.ui.session_probe_timeout,
        );
        let selector = locator.find(page.handle, self.ui.poll_interval).await.ok()?;
        match page.handle.attribute(&selector, 0, SESSION_ID_ATTR).await {
            Ok(id) => id.filter(|id| !id.is_empty()),
            Err(e) => {
                debug!("标签页 {}: 读取当前会话 ID 失败: {}", page.worker_id, e);
                None
            }
        }
    }

    /// 读取发送消息后的当前会话 ID
    ///
    /// # 错误
    /// 当前会话元素不存在或没有 ID：[`GatewayError::SessionOperationFailed`]
    pub async fn active_session_id(&self, page: PageCtx<'_>) -> GatewayResult<String> {
        let selector = Locator::required("当前会话", ACTIVE_SESSION.iter().copied(), self.ui.locator_timeout)
            .find(page.handle, self.ui.poll_interval)
            .await
            .map_err(|e| GatewayError::session_op(e.to_string()))?;

        let id = page
            .handle
            .attribute(&selector, 0, SESSION_ID_ATTR)
            .await
            .map_err(|e| GatewayError::session_op(format!("读取会话 ID 失败: {}", e)))?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::session_op("当前会话缺少会话 ID"))?;

        debug!("标签页 {}: 当前会话 ID {}", page.worker_id, id);
        Ok(id)
    }
}
