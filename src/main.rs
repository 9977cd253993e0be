use anyhow::Result;
use yuanbao_gateway::utils::logging;
use yuanbao_gateway::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（此时文件日志还未初始化，告警先输出到终端）
    let config = logging::before_init(Config::load);

    // 初始化日志（guard 存活期间文件日志持续写入）
    let _log_guard = logging::init(&config)?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await
}
