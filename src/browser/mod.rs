//! 浏览器接入
//!
//! 默认连接调试端口上已登录的浏览器；`headless = true` 时自行启动无头实例。

pub mod connection;
pub mod headless;

use anyhow::Result;
use chromiumoxide::Browser;

use crate::config::Config;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

/// 按配置获取浏览器实例
pub async fn open_browser(config: &Config) -> Result<Browser> {
    if config.headless {
        launch_headless_browser(config.chrome_executable.as_deref()).await
    } else {
        connect_to_browser(config.browser_debug_port).await
    }
}
