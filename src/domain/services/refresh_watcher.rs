// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::settings::CaptureSettings;
use crate::engines::traits::{BrowserDriver, DriverError};

/// 页面刷新检测配置
#[derive(Debug, Clone, Copy)]
pub struct RefreshWatch {
    /// 最长等待时间
    pub timeout: Duration,
    /// 检查间隔
    pub interval: Duration,
}

impl Default for RefreshWatch {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(50),
        }
    }
}

impl From<&CaptureSettings> for RefreshWatch {
    fn from(capture: &CaptureSettings) -> Self {
        Self {
            timeout: Duration::from_millis(capture.refresh_timeout_ms),
            interval: Duration::from_millis(capture.refresh_interval_ms),
        }
    }
}

/// 等待页面刷新或跳转
///
/// 当前URL或标题与初始值不同即视为已刷新
///
/// # 返回值
///
/// * `Ok(true)` - 超时前检测到变化
/// * `Ok(false)` - 超时仍未变化
/// * `Err(DriverError)` - 读取页面状态失败
pub async fn wait_for_refresh(
    driver: &dyn BrowserDriver,
    initial_url: &str,
    initial_title: &str,
    watch: RefreshWatch,
) -> Result<bool, DriverError> {
    let deadline = Instant::now() + watch.timeout;
    while Instant::now() < deadline {
        if driver.current_url().await? != initial_url
            || driver.current_title().await? != initial_title
        {
            return Ok(true);
        }
        tokio::time::sleep(watch.interval).await;
    }
    Ok(false)
}
