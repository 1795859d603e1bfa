// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use metrics::gauge;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::utils::errors::CheckError;

/// 单飞门
///
/// 浏览器会话同一时间只能服务一个任务。内部是一个许可数为 1 的公平信号量，
/// 等待者按到达顺序获得许可。
#[derive(Clone, Debug)]
pub struct SingleFlightGate {
    semaphore: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
}

/// 门许可
///
/// 被丢弃时归还许可，因此任务的任何退出路径都会释放门
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// 排队计数守卫
///
/// 调用者在等待期间被取消时，计数同样会在析构时回退
struct WaitingGuard<'a> {
    waiting: &'a AtomicUsize,
}

impl<'a> WaitingGuard<'a> {
    fn enter(waiting: &'a AtomicUsize) -> Self {
        let now = waiting.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("domaincheck_gate_waiting").set(now as f64);
        Self { waiting }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        let now = self.waiting.fetch_sub(1, Ordering::SeqCst) - 1;
        gauge!("domaincheck_gate_waiting").set(now as f64);
    }
}

impl Default for SingleFlightGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlightGate {
    /// 创建一个新的单飞门
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 等待并获取独占许可
    ///
    /// # 返回值
    ///
    /// * `Ok(GatePermit)` - 独占许可
    /// * `Err(CheckError)` - 门已关闭
    pub async fn acquire(&self) -> Result<GatePermit, CheckError> {
        let queued = WaitingGuard::enter(&self.waiting);
        let permit = Arc::clone(&self.semaphore).acquire_owned().await;
        drop(queued);

        permit
            .map(|p| GatePermit { _permit: p })
            .map_err(|_| CheckError::GateClosed)
    }

    /// 当前排队等待的调用者数量（包括正在获取许可的调用者）
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// 门当前是否被占用
    pub fn is_held(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    /// 关闭门，之后所有获取都会失败
    pub fn close(&self) {
        self.semaphore.close();
    }
}
