//! 有界轮询
//!
//! 页面没有推送通知，所有“等到某个条件成立”都归结为：采样 → 判定 → 间隔休眠，
//! 直到判定成功或到达截止时间。

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 反复执行 `sample` 并把结果交给 `accept`，直到 `accept` 返回 `Some` 或超时
///
/// - 至少采样一次（`timeout` 为 0 时只探测一次）
/// - 采样是异步的；判定是同步的，可以持有可变状态
///
/// # 返回
/// 判定成功的值；超时返回 `None`
pub async fn poll_until<S, T, F, Fut, P>(
    timeout: Duration,
    interval: Duration,
    mut sample: F,
    mut accept: P,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = S>,
    P: FnMut(S) -> Option<T>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = accept(sample().await) {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(interval.min(deadline - now)).await;
    }
}
