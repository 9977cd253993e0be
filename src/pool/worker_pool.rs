//! 标签页池
//!
//! 有界、按需增长：优先复用空闲 Worker，没有空闲且未满时新建，满了直接返回
//! [`GatewayError::Busy`]，不排队。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::worker::{HandleSlot, RefreshOutcome, Worker, WorkerLease, WorkerSettings, WorkerStatus};
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::HandleFactory;

/// 刷新周期下限
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// 健康检查汇总
#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub max_workers: usize,
    pub total_workers: usize,
    pub workers: Vec<WorkerStatus>,
}

/// 标签页池
///
/// 职责：
/// - 维护 Worker 序列，保证 `len <= capacity`
/// - 选择空闲 Worker（先到先得，无公平性保证）
/// - 为每个 Worker 启动后台健康刷新
///
/// 成员锁只在扫描或追加 Worker 时短暂持有，从不跨越任何对句柄的调用。
pub struct WorkerPool {
    workers: Mutex<Vec<Arc<Worker>>>,
    capacity: usize,
    factory: Arc<dyn HandleFactory>,
    settings: WorkerSettings,
    refresh_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// 创建空池（不启动任何 Worker）
    pub fn new(capacity: usize, factory: Arc<dyn HandleFactory>, settings: WorkerSettings) -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            factory,
            settings,
            refresh_tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前 Worker 数量
    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }

    /// Worker 序列快照
    pub fn workers(&self) -> Vec<Arc<Worker>> {
        self.workers.lock().clone()
    }

    /// 启动时创建第一个 Worker；初始化失败只记录日志，Worker 保持降级等待刷新重试
    pub async fn bootstrap(&self) {
        let Some((worker, mut guard)) = self.reserve_slot() else {
            return;
        };
        info!("初始化主标签页 {}", worker.id());
        self.spawn_refresh(Arc::clone(&worker));
        if let Err(e) = worker.initialize(&mut guard, &*self.factory, &self.settings).await {
            error!("主标签页初始化失败: {}", e);
        }
    }

    /// 取得一个空闲 Worker 的独占占用
    ///
    /// # 返回
    /// - 空闲 Worker：立即返回
    /// - 无空闲但未满：新建 Worker（冷启动，可能耗时数秒）并返回
    /// - 已满且全忙：[`GatewayError::Busy`]
    /// - 新建的 Worker 初始化失败：[`GatewayError::WorkerInitFailed`]
    pub async fn acquire(&self) -> GatewayResult<WorkerLease> {
        if let Some(lease) = self.claim_idle() {
            return Ok(lease);
        }

        let Some((worker, mut guard)) = self.reserve_slot() else {
            warn!("所有标签页都忙且达到最大数量 {}", self.capacity);
            return Err(GatewayError::Busy);
        };

        info!("创建新标签页 {}", worker.id());
        self.spawn_refresh(Arc::clone(&worker));
        worker
            .initialize(&mut guard, &*self.factory, &self.settings)
            .await?;
        Ok(WorkerLease::new(worker, guard))
    }

    /// 立即对指定 Worker 执行一轮健康刷新
    pub async fn refresh_now(&self, worker_id: usize) -> Option<RefreshOutcome> {
        let worker = self.workers.lock().get(worker_id).cloned()?;
        Some(worker.refresh(&*self.factory, &self.settings).await)
    }

    /// 汇总各 Worker 记录的状态；不拿任何 Worker 的锁，不影响 `acquire()`
    pub fn health(&self) -> PoolHealth {
        let snapshot = self.workers();
        PoolHealth {
            max_workers: self.capacity,
            total_workers: snapshot.len(),
            workers: snapshot.iter().map(|worker| worker.status()).collect(),
        }
    }

    /// 在成员锁内扫描第一个未降级、未占用且句柄可用的 Worker
    fn claim_idle(&self) -> Option<WorkerLease> {
        let workers = self.workers.lock();
        for worker in workers.iter() {
            if worker.is_degraded() {
                continue;
            }
            if let Some(guard) = worker.try_claim() {
                if guard.is_some() {
                    return Some(WorkerLease::new(Arc::clone(worker), guard));
                }
            }
        }
        None
    }

    /// 在成员锁内追加一个新 Worker，并在释放成员锁之前拿到它的独占锁，
    /// 这样冷启动期间其他请求只会把它视为忙碌
    fn reserve_slot(&self) -> Option<(Arc<Worker>, OwnedMutexGuard<HandleSlot>)> {
        let mut workers = self.workers.lock();
        if workers.len() >= self.capacity {
            return None;
        }
        let worker = Arc::new(Worker::new(workers.len()));
        let guard = worker.try_claim()?;
        workers.push(Arc::clone(&worker));
        Some((worker, guard))
    }

    fn spawn_refresh(&self, worker: Arc<Worker>) {
        let factory = Arc::clone(&self.factory);
        let settings = self.settings.clone();
        let period = settings.refresh_interval.max(MIN_REFRESH_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                ticker.tick().await;
                worker.refresh(&*factory, &settings).await;
            }
        });
        self.refresh_tasks.lock().push(task);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for task in self.refresh_tasks.lock().drain(..) {
            task.abort();
        }
    }
}
