//! 会话编排流程 - 流程层
//!
//! 核心职责：定义"一次请求"在一个标签页上的完整处理流程
//!
//! 流程顺序：
//! 1. 解析会话（新建 / 切换 / 已是当前）
//! 2. 切换模型（建议性步骤，失败继续）
//! 3. 上传图片 / 文件
//! 4. 发送消息
//! 5. 等待回复稳定
//! 6. 读取当前会话 ID

use std::path::PathBuf;

use tracing::{error, info, warn};

use super::stabilizer::ResponseStabilizer;
use super::task::{ResponseEnvelope, Task};
use crate::config::{Config, StabilizerTimings, UiTimings};
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::Necessity;
use crate::models::ChatModel;
use crate::pool::WorkerLease;
use crate::services::{MessageService, ModelService, PageCtx, SessionService, UploadService};
use crate::utils::truncate_text;

/// 流程中的一个步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveSession,
    ResolveModel,
    UploadMedia,
    SendMessage,
    AwaitReply,
    ReadSession,
}

impl Step {
    /// 严格按此顺序执行
    pub const SEQUENCE: [Step; 6] = [
        Step::ResolveSession,
        Step::ResolveModel,
        Step::UploadMedia,
        Step::SendMessage,
        Step::AwaitReply,
        Step::ReadSession,
    ];

    /// 只有模型切换是建议性的，其余步骤失败即中止请求
    pub fn necessity(self) -> Necessity {
        match self {
            Step::ResolveModel => Necessity::Advisory,
            _ => Necessity::Required,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::ResolveSession => "解析会话",
            Step::ResolveModel => "切换模型",
            Step::UploadMedia => "上传媒体",
            Step::SendMessage => "发送消息",
            Step::AwaitReply => "等待回复",
            Step::ReadSession => "读取会话ID",
        }
    }
}

/// 流程执行过程中累积的结果
#[derive(Debug, Default)]
struct Progress {
    reply: Option<String>,
    session_id: Option<String>,
}

/// 会话编排流程
///
/// - 编排完整的请求处理流程
/// - 决定步骤顺序和哪些失败可以容忍
/// - 不持有任何资源（句柄由 [`WorkerLease`] 借入）
/// - 只依赖业务能力（services）
pub struct SessionOrchestrator {
    sessions: SessionService,
    models: ModelService,
    uploads: UploadService,
    messages: MessageService,
    ui: UiTimings,
    stabilizer: StabilizerTimings,
}

impl SessionOrchestrator {
    pub fn new(config: &Config) -> Self {
        Self::with_timings(config.ui, config.stabilizer, config.upload_dir.clone())
    }

    pub fn with_timings(ui: UiTimings, stabilizer: StabilizerTimings, upload_dir: PathBuf) -> Self {
        Self {
            sessions: SessionService::new(ui),
            models: ModelService::new(ui),
            uploads: UploadService::new(ui, upload_dir),
            messages: MessageService::new(ui),
            ui,
            stabilizer,
        }
    }

    /// 在已占用的标签页上执行一次完整请求
    pub async fn run(&self, lease: &WorkerLease, task: &Task) -> GatewayResult<ResponseEnvelope> {
        let page = PageCtx::new(lease.handle()?, lease.worker_id());
        info!("标签页 {}: ▶ 开始处理请求 {}", page.worker_id, task);

        let mut progress = Progress::default();
        for step in Step::SEQUENCE {
            match self.execute(step, page, task, &mut progress).await {
                Ok(()) => {}
                Err(e) if step.necessity() == Necessity::Advisory => {
                    warn!(
                        "标签页 {}: {}失败，继续执行: {}",
                        page.worker_id,
                        step.name(),
                        e
                    );
                }
                Err(e) => {
                    error!("标签页 {}: {}失败: {}", page.worker_id, step.name(), e);
                    return Err(e);
                }
            }
        }

        let session_id = progress
            .session_id
            .ok_or_else(|| GatewayError::session_op("未读取到会话 ID"))?;
        let text = progress.reply.unwrap_or_default();
        info!(
            "标签页 {}: ✓ 请求完成，会话 {}，回复: {}",
            page.worker_id,
            session_id,
            truncate_text(&text, 100)
        );
        Ok(ResponseEnvelope { session_id, text })
    }

    async fn execute(
        &self,
        step: Step,
        page: PageCtx<'_>,
        task: &Task,
        progress: &mut Progress,
    ) -> GatewayResult<()> {
        match step {
            Step::ResolveSession => {
                let resolution = self.sessions.resolve(page, &task.target_session).await?;
                info!("标签页 {}: 会话解析结果 {:?}", page.worker_id, resolution);
            }
            Step::ResolveModel => {
                let requested = task.requested_model.as_deref();
                let model = ChatModel::resolve(requested);
                if let Some(raw) = requested.filter(|raw| ChatModel::from_id(raw).is_none()) {
                    warn!(
                        "标签页 {}: 未知模型 {}，使用默认模型 {}",
                        page.worker_id, raw, model
                    );
                }
                self.models.switch(page, model).await?;
            }
            Step::UploadMedia => {
                if let Some(image) = &task.media.image {
                    self.uploads.upload_image(page, image).await?;
                }
                if !task.media.files.is_empty() {
                    self.uploads.upload_files(page, &task.media.files).await?;
                }
            }
            Step::SendMessage => {
                self.messages.send(page, &task.query_text).await?;
            }
            Step::AwaitReply => {
                let stabilizer = ResponseStabilizer::new(
                    page.handle,
                    page.worker_id,
                    self.ui.poll_interval,
                    self.stabilizer,
                );
                progress.reply = Some(stabilizer.validate_and_wait(&task.query_text).await?);
            }
            Step::ReadSession => {
                progress.session_id = Some(self.sessions.active_session_id(page).await?);
            }
        }
        Ok(())
    }
}
