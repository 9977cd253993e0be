//! 需要真实浏览器的冒烟测试
//!
//! 先用 `--remote-debugging-port=9222` 启动已登录元宝的 Chrome，然后：
//! `cargo test --test integration_test -- --ignored`

use std::sync::Arc;

use yuanbao_gateway::browser::connect_to_browser;
use yuanbao_gateway::infrastructure::ChromiumFactory;
use yuanbao_gateway::pool::WorkerSettings;
use yuanbao_gateway::workflow::{SessionTarget, Task};
use yuanbao_gateway::{Config, HandleFactory, SessionOrchestrator, WorkerPool};

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    let config = Config::from_env();

    let browser = connect_to_browser(config.browser_debug_port)
        .await
        .expect("连接浏览器失败");
    let factory = ChromiumFactory::new(browser, config.target_url.clone());

    let handle = factory.open(0).await.expect("打开标签页失败");
    let title = handle.title().await.expect("读取标题失败");
    println!("页面标题: {}", title);
    handle.close().await.expect("关闭标签页失败");
}

#[tokio::test]
#[ignore]
async fn test_single_round_trip() {
    let config = Config::from_env();
    let browser = connect_to_browser(config.browser_debug_port)
        .await
        .expect("连接浏览器失败");
    let factory: Arc<dyn HandleFactory> =
        Arc::new(ChromiumFactory::new(browser, config.target_url.clone()));

    let pool = WorkerPool::new(1, factory, WorkerSettings::from_config(&config));
    pool.bootstrap().await;
    let orchestrator = SessionOrchestrator::new(&config);

    let lease = pool.acquire().await.expect("占用标签页失败");
    let task = Task::new("用户: 用一句话介绍你自己", SessionTarget::New);
    let envelope = orchestrator.run(&lease, &task).await.expect("请求失败");

    println!("会话 {}: {}", envelope.session_id, envelope.text);
    assert!(!envelope.session_id.is_empty());
    assert!(!envelope.text.is_empty());
}
