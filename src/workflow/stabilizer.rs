//! 回复稳定检测
//!
//! 页面把回复逐步写进最后一个消息气泡，没有“生成结束”事件。这里通过轮询判断
//! 文本何时不再变化，并排除两种误判：
//! - 中间状态文本（“正在生成”等）
//! - 刚发出的问题被原样回显

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::selectors::MESSAGE_BUBBLE;
use crate::config::StabilizerTimings;
use crate::error::{GatewayError, GatewayResult, HandleResult};
use crate::infrastructure::{poll_until, AutomationHandle};
use crate::utils::{is_transient, normalize, shares_keywords, truncate_text};

/// 判定“包含查询关键词”所需的共同词数
const MIN_SHARED_KEYWORDS: usize = 2;

/// 日志中文本预览长度
const PREVIEW_LEN: usize = 100;

/// 回复稳定检测器，借用占用期间的句柄
pub struct ResponseStabilizer<'a> {
    handle: &'a dyn AutomationHandle,
    worker_id: usize,
    poll_interval: Duration,
    timings: StabilizerTimings,
}

impl<'a> ResponseStabilizer<'a> {
    pub fn new(
        handle: &'a dyn AutomationHandle,
        worker_id: usize,
        poll_interval: Duration,
        timings: StabilizerTimings,
    ) -> Self {
        Self {
            handle,
            worker_id,
            poll_interval,
            timings,
        }
    }

    /// 读取最后一个消息气泡并清理，没有消息时返回 `None`
    pub async fn read_last_normalized(&self) -> HandleResult<Option<String>> {
        let text = self.handle.last_text(MESSAGE_BUBBLE).await?;
        Ok(text.map(|t| normalize(&t)))
    }

    /// 等待最后一条消息稳定
    ///
    /// 文本在 `wait` 时长内保持不变且不是中间状态才算稳定。超时后直接读取一次当前
    /// 文本作为兜底；没有消息或仍是中间状态时返回 [`GatewayError::ResponseTimeout`]。
    pub async fn stabilize(&self, wait: Duration, timeout: Duration) -> GatewayResult<String> {
        let worker_id = self.worker_id;
        let mut last_text: Option<String> = None;
        let mut since = Instant::now();

        let stable = poll_until(
            timeout,
            self.poll_interval,
            || self.read_last_normalized(),
            |sample| {
                let text = match sample {
                    Ok(Some(text)) => text,
                    Ok(None) => {
                        debug!("标签页 {}: 未找到消息元素，继续等待...", worker_id);
                        return None;
                    }
                    Err(e) => {
                        warn!("标签页 {}: 文本检查出错: {}", worker_id, e);
                        return None;
                    }
                };

                if is_transient(&text) {
                    debug!("标签页 {}: 检测到中间状态文本，继续等待...", worker_id);
                    return None;
                }

                let now = Instant::now();
                if last_text.as_deref() != Some(text.as_str()) {
                    last_text = Some(text);
                    since = now;
                    return None;
                }
                (now.duration_since(since) >= wait).then_some(text)
            },
        )
        .await;

        if let Some(text) = stable {
            debug!(
                "标签页 {}: 文本已稳定: {}",
                worker_id,
                truncate_text(&text, PREVIEW_LEN)
            );
            return Ok(text);
        }

        warn!("标签页 {}: 等待文本稳定超时，直接读取最后一条消息", worker_id);
        match self.read_last_normalized().await {
            Ok(Some(text)) if !is_transient(&text) => Ok(text),
            Ok(_) => Err(GatewayError::ResponseTimeout {
                timeout_secs: timeout.as_secs(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 等待回复稳定，并排除把刚发出的问题当成回复的情况
    ///
    /// 出错时退回到一次直接读取：读到非中间状态的文本就返回它；没有消息或仍是中间
    /// 状态时，超时错误原样返回，其他错误返回空文本；直接读取本身失败也返回空文本。
    pub async fn validate_and_wait(&self, query: &str) -> GatewayResult<String> {
        info!("标签页 {}: 开始验证响应文本", self.worker_id);
        match self.validate(query).await {
            Ok(text) => {
                info!(
                    "标签页 {}: 文本验证完成，最终文本长度: {}",
                    self.worker_id,
                    text.chars().count()
                );
                Ok(text)
            }
            Err(e) => {
                error!("标签页 {}: 文本验证过程出错: {}", self.worker_id, e);
                match self.read_last_normalized().await {
                    Ok(Some(text)) if !is_transient(&text) => Ok(text),
                    Ok(_) => match e {
                        GatewayError::ResponseTimeout { .. } => Err(e),
                        _ => Ok(String::new()),
                    },
                    Err(read_err) => {
                        warn!("标签页 {}: 直接读取最后一条消息失败: {}", self.worker_id, read_err);
                        Ok(String::new())
                    }
                }
            }
        }
    }

    async fn validate(&self, query: &str) -> GatewayResult<String> {
        let timings = self.timings;
        let query = normalize(query);
        info!(
            "标签页 {}: 原始查询文本: {}",
            self.worker_id,
            truncate_text(&query, PREVIEW_LEN)
        );

        let mut current = self.stabilize(timings.initial_wait, timings.timeout).await?;
        info!(
            "标签页 {}: 初始稳定文本: {}",
            self.worker_id,
            truncate_text(&current, PREVIEW_LEN)
        );

        for round in 1..=timings.max_rounds {
            let identical = current.trim() == query.trim();
            let keywords = shares_keywords(&current, &query, MIN_SHARED_KEYWORDS);
            debug!(
                "标签页 {}: 第 {} 次文本验证 - 相同: {}, 包含关键词: {}",
                self.worker_id, round, identical, keywords
            );

            if !identical || current.trim().is_empty() {
                if keywords {
                    info!("标签页 {}: 响应文本包含查询关键词，判断为正常响应", self.worker_id);
                } else {
                    info!("标签页 {}: 响应文本与查询文本不同，判断为正常响应", self.worker_id);
                }
                break;
            }

            warn!(
                "标签页 {}: 响应文本与查询文本完全相同 (第{}次)，{:?} 后重新检查",
                self.worker_id, round, timings.echo_backoff
            );
            sleep(timings.echo_backoff).await;

            match self.stabilize(timings.confirm_wait, timings.timeout).await {
                Ok(text) => current = text,
                Err(e) => {
                    error!("标签页 {}: 重新获取文本失败: {}", self.worker_id, e);
                    break;
                }
            }
            if current.trim() != query.trim() {
                info!("标签页 {}: 文本已更新，退出验证循环", self.worker_id);
                break;
            }
            if round == timings.max_rounds {
                warn!("标签页 {}: 达到最大验证次数，使用当前文本", self.worker_id);
            }
        }

        // 最后再确认一次，吸收仍在渲染的内容
        self.stabilize(timings.confirm_wait, timings.timeout).await
    }
}
