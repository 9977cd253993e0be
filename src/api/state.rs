//! 共享状态

use std::sync::Arc;
use std::time::Duration;

use crate::pool::WorkerPool;
use crate::workflow::SessionOrchestrator;

/// 各个 handler 共享的状态，克隆开销只是几个 Arc
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub orchestrator: Arc<SessionOrchestrator>,
    /// 单个请求的外层截止时间
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        pool: Arc<WorkerPool>,
        orchestrator: Arc<SessionOrchestrator>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            orchestrator,
            request_timeout,
        }
    }
}
