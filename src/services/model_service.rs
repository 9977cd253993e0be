//! 模型服务 - 业务能力层
//!
//! 只负责"切换模型"能力

use tokio::time::sleep;
use tracing::{debug, info};

use super::PageCtx;
use crate::config::UiTimings;
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::Locator;
use crate::models::ChatModel;
use crate::workflow::selectors::{MODEL_OPTION, MODEL_SWITCH};

/// 模型服务
pub struct ModelService {
    ui: UiTimings,
}

impl ModelService {
    pub fn new(ui: UiTimings) -> Self {
        Self { ui }
    }

    /// 打开模型下拉框，选择第一个文字包含该模型关键字的选项
    ///
    /// 失败时返回 [`GatewayError::ModelSwitchFailed`]，由调用方决定是否继续。
    pub async fn switch(&self, page: PageCtx<'_>, model: ChatModel) -> GatewayResult<()> {
        let failed = || GatewayError::ModelSwitchFailed {
            model: model.id().to_string(),
        };

        info!("标签页 {}: 切换模型为 {}", page.worker_id, model);
        let switch = Locator::required("模型切换按钮", MODEL_SWITCH.iter().copied(), self.ui.session_probe_timeout)
            .find(page.handle, self.ui.poll_interval)
            .await
            .map_err(|e| {
                debug!("标签页 {}: {}", page.worker_id, e);
                failed()
            })?;

        page.handle.click(&switch, 0).await.map_err(|e| {
            debug!("标签页 {}: 打开模型列表失败: {}", page.worker_id, e);
            failed()
        })?;
        sleep(self.ui.action_settle).await;

        let labels = page.handle.texts(MODEL_OPTION).await.map_err(|e| {
            debug!("标签页 {}: 读取模型列表失败: {}", page.worker_id, e);
            failed()
        })?;
        let index = labels
            .iter()
            .position(|label| model.matches_label(label))
            .ok_or_else(|| {
                debug!("标签页 {}: 模型选项 {:?} 中没有 {}", page.worker_id, labels, model);
                failed()
            })?;

        page.handle.click(MODEL_OPTION, index).await.map_err(|e| {
            debug!("标签页 {}: 点击模型选项失败: {}", page.worker_id, e);
            failed()
        })?;
        sleep(self.ui.action_settle).await;

        info!("标签页 {}: ✓ 已切换到 {}", page.worker_id, labels[index].trim());
        Ok(())
    }
}
