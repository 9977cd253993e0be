//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（浏览器标签页），只暴露能力：
//! - [`AutomationHandle`] / [`HandleFactory`]：标签页原语与创建
//! - [`ChromiumHandle`] / [`ChromiumFactory`]：基于 chromiumoxide 的实现
//! - [`Locator`]：多候选选择器定位
//! - [`poll_until`]：有界轮询

pub mod chromium;
pub mod handle;
pub mod locator;
pub mod wait;

pub use chromium::{ChromiumFactory, ChromiumHandle};
pub use handle::{AutomationHandle, HandleFactory};
pub use locator::{Locator, LocatorExhausted, Necessity};
pub use wait::poll_until;
