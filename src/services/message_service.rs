//! 消息服务 - 业务能力层
//!
//! 只负责"输入并发送一条消息"

use tracing::info;

use super::PageCtx;
use crate::config::UiTimings;
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::Locator;
use crate::utils::truncate_text;
use crate::workflow::selectors::{MESSAGE_INPUT, SEND_BUTTON};

/// 消息服务
pub struct MessageService {
    ui: UiTimings,
}

impl MessageService {
    pub fn new(ui: UiTimings) -> Self {
        Self { ui }
    }

    /// 定位输入框 → 清空 → 写入 → 定位发送按钮 → 点击
    ///
    /// 任何一步失败都返回 [`GatewayError::SendFailed`]
    pub async fn send(&self, page: PageCtx<'_>, text: &str) -> GatewayResult<()> {
        let input = Locator::required("输入框", MESSAGE_INPUT.iter().copied(), self.ui.locator_timeout)
            .find(page.handle, self.ui.poll_interval)
            .await
            .map_err(|e| GatewayError::send(e.to_string()))?;

        page.handle
            .clear(&input)
            .await
            .map_err(|e| GatewayError::send(format!("清空输入框失败: {}", e)))?;
        page.handle
            .type_text(&input, text)
            .await
            .map_err(|e| GatewayError::send(format!("输入文本失败: {}", e)))?;

        let button = Locator::required("发送按钮", SEND_BUTTON.iter().copied(), self.ui.locator_timeout)
            .find(page.handle, self.ui.poll_interval)
            .await
            .map_err(|e| GatewayError::send(e.to_string()))?;
        page.handle
            .click(&button, 0)
            .await
            .map_err(|e| GatewayError::send(format!("点击发送按钮失败: {}", e)))?;

        info!(
            "标签页 {}: 📤 消息已发送: {}",
            page.worker_id,
            truncate_text(text, 50)
        );
        Ok(())
    }
}
