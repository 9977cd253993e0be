//! # Yuanbao Gateway
//!
//! 把网页版对话助手包装成 OpenAI 兼容的 HTTP 接口：每个请求占用一个浏览器标签页，
//! 在页面上完成会话切换、模型切换、上传、发送，并等待回复稳定后返回。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（标签页），只暴露能力
//! - `AutomationHandle` - 标签页原语（计数、读文本、点击、输入、提交文件）
//! - `Locator` / `poll_until` - 多选择器定位与有界轮询
//!
//! ### ② 资源池（Pool）
//! - `pool/` - 有界、按需增长的标签页池，每个标签页一把独占锁和一个健康刷新任务
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 会话、模型、上传、消息，各管一种页面能力
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 一次请求的完整流程（`SessionOrchestrator`）与回复稳定检测
//!   （`ResponseStabilizer`）
//!
//! ### ⑤ 接口层（API）
//! - `api/` - axum 路由，线上格式与任务之间的转换
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod pool;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{create_router, AppState};
pub use app::App;
pub use config::Config;
pub use error::{GatewayError, GatewayResult, HandleError, HandleResult};
pub use infrastructure::{AutomationHandle, HandleFactory};
pub use models::ChatModel;
pub use pool::{WorkerLease, WorkerPool};
pub use workflow::{ResponseEnvelope, SessionOrchestrator, Task};
