//! 资源池层
//!
//! - [`Worker`]：一个标签页槽位（句柄 + 独占锁 + 降级标记）
//! - [`WorkerLease`]：请求对 Worker 的独占占用，drop 即释放
//! - [`WorkerPool`]：有界、按需增长的 Worker 集合

pub mod worker;
pub mod worker_pool;

pub use worker::{
    HandleSlot, RefreshOutcome, Worker, WorkerLease, WorkerSettings, WorkerState, WorkerStatus,
};
pub use worker_pool::{PoolHealth, WorkerPool};
