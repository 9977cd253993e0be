use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use crate::api::{self, AppState};
use crate::browser;
use crate::config::Config;
use crate::infrastructure::{ChromiumFactory, HandleFactory};
use crate::pool::{WorkerPool, WorkerSettings};
use crate::utils::logging::log_startup;
use crate::workflow::SessionOrchestrator;

/// 应用主结构
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// 初始化应用：连接浏览器，创建标签页池并启动第一个标签页
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let browser = browser::open_browser(&config)
            .await
            .context("无法获取浏览器实例")?;
        let factory: Arc<dyn HandleFactory> =
            Arc::new(ChromiumFactory::new(browser, config.target_url.clone()));

        Self::with_factory(config, factory).await
    }

    /// 使用给定的句柄工厂初始化（不依赖真实浏览器）
    pub async fn with_factory(config: Config, factory: Arc<dyn HandleFactory>) -> Result<Self> {
        std::fs::create_dir_all(&config.upload_dir)
            .with_context(|| format!("无法创建上传目录 {}", config.upload_dir.display()))?;

        let pool = Arc::new(WorkerPool::new(
            config.max_workers,
            factory,
            WorkerSettings::from_config(&config),
        ));
        pool.bootstrap().await;

        let orchestrator = Arc::new(SessionOrchestrator::new(&config));
        let state = AppState::new(pool, orchestrator, config.request_timeout);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// 启动 HTTP 服务，直到收到 Ctrl+C / SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听 {}", addr))?;
        info!("🌐 服务监听 http://{}", addr);

        let router = api::create_router(self.state.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP 服务异常退出")?;

        info!("服务已停止");
        Ok(())
    }
}

/// 等待终止信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("接收到终止信号，关闭服务...");
}
