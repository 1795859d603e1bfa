// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::models::capture::{CapturedResponse, TargetSpec};
use crate::engines::traits::{BrowserDriver, DriverError, ResponseEvent, ResponseListener};

/// 等待结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationOutcome {
    /// 已命中的目标，键为目标名称
    pub captured: BTreeMap<String, CapturedResponse>,
    /// 是否所有目标都已命中
    pub complete: bool,
}

/// 响应关联器
///
/// 为一组目标各记录第一个命中的响应。槽位在驱动的事件任务中被填充，
/// 同时被等待循环读取，因此所有槽位状态都在锁内访问。
pub struct ResponseCorrelator {
    targets: Arc<Vec<TargetSpec>>,
    slots: Arc<Mutex<BTreeMap<String, Option<CapturedResponse>>>>,
    notify: Arc<Notify>,
}

impl ResponseCorrelator {
    /// 创建关联器，所有槽位初始为空
    pub fn new(targets: Vec<TargetSpec>) -> Self {
        let slots = targets
            .iter()
            .map(|t| (t.name.clone(), None))
            .collect::<BTreeMap<_, _>>();
        Self {
            targets: Arc::new(targets),
            slots: Arc::new(Mutex::new(slots)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// 生成响应回调
    ///
    /// 对每个事件，所有片段命中且槽位为空的目标都会被填充；已填充的槽位忽略后续事件
    pub fn listener(&self) -> ResponseListener {
        let targets = Arc::clone(&self.targets);
        let slots = Arc::clone(&self.slots);
        let notify = Arc::clone(&self.notify);

        Arc::new(move |event: &ResponseEvent| {
            let mut filled = false;
            {
                let mut slots = slots.lock();
                for target in targets.iter().filter(|t| t.matches(&event.url)) {
                    if let Some(slot) = slots.get_mut(&target.name) {
                        if slot.is_none() {
                            debug!(
                                "Captured {} ({}, status {}) for target {}",
                                event.url, event.mime_type, event.status, target.name
                            );
                            *slot = Some(CapturedResponse::from(event));
                            filled = true;
                        }
                    }
                }
            }
            if filled {
                notify.notify_one();
            }
        })
    }

    /// 在驱动上安装监听器
    pub async fn register_listener(&self, driver: &dyn BrowserDriver) -> Result<(), DriverError> {
        let id = driver.on_response_received(self.listener()).await?;
        debug!("Response listener {:?} installed", id);
        Ok(())
    }

    /// 是否所有槽位都已填充
    pub fn is_complete(&self) -> bool {
        self.slots.lock().values().all(Option::is_some)
    }

    /// 当前已填充的槽位快照
    pub fn captured(&self) -> BTreeMap<String, CapturedResponse> {
        self.slots
            .lock()
            .iter()
            .filter_map(|(name, slot)| slot.clone().map(|c| (name.clone(), c)))
            .collect()
    }

    /// 等待所有槽位填充或超时
    ///
    /// 槽位填充时立即唤醒，否则最多每个 `poll_interval` 复查一次。超时不是错误，
    /// 返回已命中的子集。
    pub async fn wait_until_complete(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> CorrelationOutcome {
        let deadline = Instant::now() + timeout;

        loop {
            if self.is_complete() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let nap = poll_interval.min(deadline - now);
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(nap) => {}
            }
        }

        CorrelationOutcome {
            captured: self.captured(),
            complete: self.is_complete(),
        }
    }

    /// 移除监听器，避免后续阶段收到过期回调
    pub async fn teardown(&self, driver: &dyn BrowserDriver) -> Result<(), DriverError> {
        driver.clear_response_listeners().await
    }
}
