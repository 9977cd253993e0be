//! 多选择器定位
//!
//! 页面改版频繁，同一个控件准备了多个候选选择器：按顺序逐个尝试，每个候选有自己的
//! 等待上限，第一个匹配到的胜出，全部落空才算失败。

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::{poll_until, AutomationHandle};

/// 定位结果不满足时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Necessity {
    /// 全部落空时返回错误，由调用方中止流程
    Required,
    /// 全部落空时记录告警并继续
    Advisory,
}

/// 所有候选选择器都没有匹配
#[derive(Debug, Error)]
#[error("无法定位{name}（已尝试 {tried} 个选择器）")]
pub struct LocatorExhausted {
    pub name: String,
    pub tried: usize,
}

/// 一组有序的候选选择器
#[derive(Debug, Clone)]
pub struct Locator {
    name: String,
    selectors: Vec<String>,
    timeout: Duration,
    necessity: Necessity,
}

impl Locator {
    /// 必需定位：全部落空即失败
    pub fn required<I, S>(name: impl Into<String>, selectors: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            selectors: selectors.into_iter().map(Into::into).collect(),
            timeout,
            necessity: Necessity::Required,
        }
    }

    /// 建议性定位：全部落空只记录告警
    pub fn advisory<I, S>(name: impl Into<String>, selectors: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            necessity: Necessity::Advisory,
            ..Self::required(name, selectors, timeout)
        }
    }

    /// 按顺序尝试每个候选选择器
    ///
    /// # 返回
    /// - `Ok(Some(selector))`：胜出的选择器
    /// - `Ok(None)`：建议性定位全部落空
    /// - `Err(LocatorExhausted)`：必需定位全部落空
    pub async fn resolve(
        &self,
        handle: &dyn AutomationHandle,
        poll_interval: Duration,
    ) -> Result<Option<String>, LocatorExhausted> {
        for selector in &self.selectors {
            debug!("定位{}: 尝试选择器 {}", self.name, selector);
            let found = poll_until(
                self.timeout,
                poll_interval,
                move || handle.count(selector),
                |count| match count {
                    Ok(n) if n > 0 => Some(()),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("定位{}: 选择器 {} 探测出错: {}", self.name, selector, e);
                        None
                    }
                },
            )
            .await;

            if found.is_some() {
                debug!("定位{}: 选择器 {} 命中", self.name, selector);
                return Ok(Some(selector.clone()));
            }
        }

        match self.necessity {
            Necessity::Required => Err(self.exhausted()),
            Necessity::Advisory => {
                warn!("未能定位{}，跳过等待继续执行", self.name);
                Ok(None)
            }
        }
    }

    /// 同 [`resolve`](Self::resolve)，但未命中一律视为错误
    pub async fn find(
        &self,
        handle: &dyn AutomationHandle,
        poll_interval: Duration,
    ) -> Result<String, LocatorExhausted> {
        self.resolve(handle, poll_interval)
            .await?
            .ok_or_else(|| self.exhausted())
    }

    fn exhausted(&self) -> LocatorExhausted {
        LocatorExhausted {
            name: self.name.clone(),
            tried: self.selectors.len(),
        }
    }
}
