//! 标签页 Worker
//!
//! 一个 Worker 独占一个自动化句柄和一把互斥锁。初始化、健康刷新、请求处理都必须
//! 持有这把锁，因此三者对同一句柄永远不会交错。健康检查不拿锁，只读取初始化和
//! 刷新时记录下来的页面状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as StateMutex;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{GatewayError, GatewayResult, HandleResult};
use crate::infrastructure::{AutomationHandle, HandleFactory};

/// 锁内的句柄槽位；`None` 表示尚未初始化或已被丢弃
pub type HandleSlot = Option<Box<dyn AutomationHandle>>;

/// 记录页面状态时读取标题的等待上限
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Worker 生命周期参数
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// 初始化最大尝试次数
    pub max_retries: usize,
    /// 两次尝试之间的等待
    pub retry_backoff: Duration,
    /// 健康刷新周期
    pub refresh_interval: Duration,
    /// 刷新后的停顿
    pub refresh_settle: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.init_max_retries.max(1),
            retry_backoff: config.init_retry_backoff,
            refresh_interval: config.refresh_interval,
            refresh_settle: config.ui.refresh_settle,
        }
    }
}

/// 一次健康刷新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Worker 正在处理任务，本轮跳过
    Skipped,
    /// 页面重新加载成功
    Refreshed,
    /// 刷新失败（或原本已降级），重新初始化成功
    Reinitialized,
    /// 重新初始化耗尽重试，Worker 处于降级状态
    Degraded,
}

/// 健康检查中单个 Worker 的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Ok,
    Degraded,
    Error,
}

/// 健康检查条目
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub id: usize,
    pub status: WorkerState,
    /// 正被某个请求占用
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 最近一次初始化或刷新时观察到的页面状态
#[derive(Debug, Clone, Default)]
struct Observation {
    title: Option<String>,
    error: Option<String>,
}

/// 标签页池中的一个槽位
pub struct Worker {
    id: usize,
    slot: Arc<Mutex<HandleSlot>>,
    degraded: AtomicBool,
    leased: AtomicBool,
    observed: StateMutex<Observation>,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            slot: Arc::new(Mutex::new(None)),
            degraded: AtomicBool::new(false),
            leased: AtomicBool::new(false),
            observed: StateMutex::new(Observation::default()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// 初始化耗尽重试后置位，重新初始化成功后清除
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// 是否正被某个请求占用（不触碰锁）
    pub fn is_busy(&self) -> bool {
        self.leased.load(Ordering::Acquire)
    }

    /// 非阻塞地取得独占锁
    pub(crate) fn try_claim(&self) -> Option<OwnedMutexGuard<HandleSlot>> {
        Arc::clone(&self.slot).try_lock_owned().ok()
    }

    /// 初始化协议：最多尝试 `max_retries` 次打开目标页并强制刷新
    ///
    /// 调用方必须已持有本 Worker 的锁（`slot` 即锁内数据），任何任务都看不到半初始化的句柄。
    /// 全部失败后 Worker 被标记为降级，`acquire()` 不会再选中它。
    pub(crate) async fn initialize(
        &self,
        slot: &mut HandleSlot,
        factory: &dyn HandleFactory,
        settings: &WorkerSettings,
    ) -> GatewayResult<()> {
        let max = settings.max_retries.max(1);
        for attempt in 1..=max {
            info!("标签页 {}: 尝试初始化浏览器 ({}/{})", self.id, attempt, max);

            if let Some(old) = slot.take() {
                if let Err(e) = old.close().await {
                    debug!("标签页 {}: 关闭旧页面失败: {}", self.id, e);
                }
            }

            match self.open_ready(factory).await {
                Ok(handle) => {
                    self.observe(&*handle).await;
                    *slot = Some(handle);
                    self.degraded.store(false, Ordering::Release);
                    info!("标签页 {}: 浏览器初始化完成", self.id);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "标签页 {}: 第 {} 次初始化失败: {}",
                        self.id, attempt, e
                    );
                    if attempt < max {
                        sleep(settings.retry_backoff).await;
                    }
                }
            }
        }

        self.degraded.store(true, Ordering::Release);
        error!("标签页 {}: 初始化失败 {} 次，标记为降级", self.id, max);
        Err(GatewayError::WorkerInitFailed {
            worker_id: self.id,
            attempts: max,
        })
    }

    /// 打开新标签页并刷新一次，刷新失败时关闭该页
    async fn open_ready(&self, factory: &dyn HandleFactory) -> HandleResult<Box<dyn AutomationHandle>> {
        let handle = factory.open(self.id).await?;
        if let Err(e) = handle.reload().await {
            let _ = handle.close().await;
            return Err(e);
        }
        Ok(handle)
    }

    /// 健康刷新：锁被占用则跳过本轮；刷新失败则在持锁状态下丢弃句柄并重新初始化
    pub async fn refresh(&self, factory: &dyn HandleFactory, settings: &WorkerSettings) -> RefreshOutcome {
        let Some(mut guard) = self.try_claim() else {
            info!("标签页 {}: 已有任务运行，跳过刷新", self.id);
            return RefreshOutcome::Skipped;
        };

        let reloaded = match guard.as_deref() {
            Some(handle) => {
                info!("标签页 {}: 执行页面刷新", self.id);
                Some(handle.reload().await)
            }
            None => None,
        };

        match reloaded {
            Some(Ok(())) => {
                sleep(settings.refresh_settle).await;
                if let Some(handle) = guard.as_deref() {
                    self.observe(handle).await;
                }
                RefreshOutcome::Refreshed
            }
            Some(Err(e)) => {
                error!("标签页 {}: 页面刷新失败: {}", self.id, e);
                self.reinitialize(&mut guard, factory, settings).await
            }
            None => {
                info!("标签页 {}: 句柄不可用，尝试重新初始化", self.id);
                self.reinitialize(&mut guard, factory, settings).await
            }
        }
    }

    async fn reinitialize(
        &self,
        slot: &mut HandleSlot,
        factory: &dyn HandleFactory,
        settings: &WorkerSettings,
    ) -> RefreshOutcome {
        match self.initialize(slot, factory, settings).await {
            Ok(()) => RefreshOutcome::Reinitialized,
            Err(_) => RefreshOutcome::Degraded,
        }
    }

    /// 读取页面标题并记录，调用方持有本 Worker 的锁
    async fn observe(&self, handle: &dyn AutomationHandle) {
        let observation = match timeout(PROBE_TIMEOUT, handle.title()).await {
            Ok(Ok(title)) => Observation {
                title: Some(title),
                error: None,
            },
            Ok(Err(e)) => Observation {
                title: None,
                error: Some(format!("浏览器状态未知: {}", e)),
            },
            Err(_) => Observation {
                title: None,
                error: Some("浏览器状态未知: 读取标题超时".to_string()),
            },
        };
        *self.observed.lock() = observation;
    }

    /// 健康状态：只读标记和记录，不拿 Worker 锁，不调用句柄
    pub fn status(&self) -> WorkerStatus {
        let observed = self.observed.lock().clone();
        let mut status = WorkerStatus {
            id: self.id,
            status: WorkerState::Ok,
            busy: self.is_busy(),
            title: None,
            message: None,
        };

        if self.is_degraded() {
            status.status = WorkerState::Degraded;
            status.message = Some("浏览器未初始化".to_string());
        } else if let Some(error) = observed.error {
            status.status = WorkerState::Error;
            status.message = Some(error);
        } else {
            status.title = observed.title;
        }
        status
    }
}

/// 对某个 Worker 的独占占用，drop 时释放锁
pub struct WorkerLease {
    worker: Arc<Worker>,
    guard: OwnedMutexGuard<HandleSlot>,
}

impl WorkerLease {
    pub(crate) fn new(worker: Arc<Worker>, guard: OwnedMutexGuard<HandleSlot>) -> Self {
        debug!("标签页 {}: 获取锁", worker.id());
        worker.leased.store(true, Ordering::Release);
        Self { worker, guard }
    }

    pub fn worker_id(&self) -> usize {
        self.worker.id()
    }

    /// 占用期间独享的句柄
    pub fn handle(&self) -> GatewayResult<&dyn AutomationHandle> {
        self.guard
            .as_deref()
            .ok_or(GatewayError::WorkerInitFailed {
                worker_id: self.worker.id(),
                attempts: 0,
            })
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        self.worker.leased.store(false, Ordering::Release);
        info!("标签页 {}: 释放锁", self.worker.id());
    }
}
