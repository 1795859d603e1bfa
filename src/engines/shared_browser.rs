// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::engines::traits::DriverError;

/// 可以打开新页面的浏览器实例
#[async_trait]
pub trait PageSource: Send + Sync {
    type Page: Send;

    /// 与浏览器进程的连接是否仍然存活
    fn is_alive(&self) -> bool;

    /// 打开一个新页面
    async fn new_page(&self) -> Result<Self::Page, DriverError>;
}

/// 浏览器启动器
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Browser: PageSource;

    /// 启动或连接一个浏览器实例
    async fn launch(&self) -> Result<Self::Browser, DriverError>;
}

/// 跨任务共享的浏览器
///
/// 第一次打开页面时启动浏览器。浏览器断开或无法再打开页面时丢弃旧实例并重新启动，
/// 一次崩溃不会让后续所有任务失败。
pub struct SharedBrowser<L: BrowserLauncher> {
    launcher: L,
    current: Mutex<Option<L::Browser>>,
}

impl<L: BrowserLauncher> SharedBrowser<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            current: Mutex::new(None),
        }
    }

    /// 在共享浏览器上打开新页面，必要时重新启动浏览器
    ///
    /// # 返回值
    ///
    /// * `Ok(Page)` - 新页面
    /// * `Err(DriverError)` - 浏览器无法启动，或新启动的浏览器也无法打开页面
    pub async fn open_page(&self) -> Result<<L::Browser as PageSource>::Page, DriverError> {
        let mut current = self.current.lock().await;

        if let Some(browser) = current.as_ref() {
            if browser.is_alive() {
                match browser.new_page().await {
                    Ok(page) => return Ok(page),
                    Err(e) => warn!("Shared browser cannot open a page, relaunching: {}", e),
                }
            } else {
                warn!("Shared browser connection is gone, relaunching");
            }
            *current = None;
        }

        let browser = self.launcher.launch().await?;
        info!("Browser ready");
        let page = browser.new_page().await?;
        *current = Some(browser);
        Ok(page)
    }
}
