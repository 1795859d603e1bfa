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

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::settings::Settings;
use crate::domain::models::capture::{CheckReport, PhaseResult, TargetSpec};
use crate::domain::models::check_job::CheckJob;
use crate::domain::services::payload_decoder;
use crate::domain::services::response_correlator::ResponseCorrelator;
use crate::engines::traits::{BrowserDriver, SessionFactory};
use crate::utils::errors::CheckError;

/// 流量结果键
pub const TRAFFIC_KEY: &str = "traffic";
/// 外链概览结果键
pub const DOMAIN_OVERVIEW_KEY: &str = "domainOverview";
/// 热门外链列表结果键
pub const TOP_BACKLINKS_KEY: &str = "topBacklinksList";

/// 编排配置
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 目标站点根地址
    pub base_url: String,
    /// 每个阶段的最长等待时间
    pub phase_timeout: Duration,
    /// 等待循环的复查间隔
    pub poll_interval: Duration,
    /// 导航前指针移动到的位置
    pub priming_point: (f64, f64),
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ahrefs.com".to_string(),
            phase_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            priming_point: (100.0, 100.0),
        }
    }
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            base_url: settings.upstream.base_url.clone(),
            phase_timeout: Duration::from_secs(settings.capture.phase_timeout_secs),
            poll_interval: Duration::from_millis(settings.capture.poll_interval_ms),
            priming_point: (settings.capture.priming_x, settings.capture.priming_y),
        }
    }
}

/// 抓取阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Traffic,
    Backlinks,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Traffic => "traffic",
            Phase::Backlinks => "backlinks",
        }
    }

    fn checker_path(&self) -> &'static str {
        match self {
            Phase::Traffic => "traffic-checker/",
            Phase::Backlinks => "backlink-checker/",
        }
    }
}

/// 阶段状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseState {
    Listening,
    Navigating,
    Waiting,
    Complete,
    TimedOut,
    TornDown,
}

/// 结束会话：关闭拟人模式并关闭页面
async fn shutdown_session(driver: &dyn BrowserDriver, clear_listeners: bool) {
    if clear_listeners {
        if let Err(e) = driver.clear_response_listeners().await {
            warn!("Failed to clear response listeners: {}", e);
        }
    }
    if let Err(e) = driver.disable_human_mode().await {
        warn!("Failed to disable human mode: {}", e);
    }
    if let Err(e) = driver.close().await {
        warn!("Failed to close browser session: {}", e);
    }
}

/// 会话守卫
///
/// 正常结束时由 `release` 关闭会话；任务在中途被取消（例如客户端断开）时，
/// 析构会在后台完成监听器清理和会话关闭。
struct SessionGuard {
    driver: Option<Arc<dyn BrowserDriver>>,
}

impl SessionGuard {
    fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver: Some(driver),
        }
    }

    async fn release(mut self) {
        if let Some(driver) = self.driver.clone() {
            shutdown_session(driver.as_ref(), false).await;
        }
        self.driver = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        warn!("Check abandoned mid-run, closing browser session in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    shutdown_session(driver.as_ref(), true).await;
                });
            }
            Err(e) => warn!("No runtime to close abandoned session: {}", e),
        }
    }
}

/// 抓取会话编排器
///
/// 为一个检查任务打开浏览器会话，依次执行所需阶段，每个阶段使用新的关联器，
/// 最后合并所有阶段的结果。调用方负责通过单飞门保证同一时间只有一次执行。
pub struct ScrapeOrchestrator {
    sessions: Arc<dyn SessionFactory>,
    config: OrchestratorConfig,
}

impl ScrapeOrchestrator {
    pub fn new(sessions: Arc<dyn SessionFactory>, config: OrchestratorConfig) -> Self {
        Self { sessions, config }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// 构建阶段的页面URL
    pub fn phase_url(&self, phase: Phase, target: &str) -> Result<Url, CheckError> {
        let raw = format!("{}/{}", self.base(), phase.checker_path());
        let mut url = Url::parse(&raw).map_err(|e| CheckError::InvalidUrl(format!("{}: {}", raw, e)))?;
        url.query_pairs_mut()
            .append_pair("input", target)
            .append_pair("mode", "subdomains");
        Ok(url)
    }

    /// 阶段需要等待的目标响应
    pub fn phase_targets(&self, phase: Phase) -> Vec<TargetSpec> {
        let base = self.base();
        match phase {
            Phase::Traffic => vec![TargetSpec::new(
                TRAFFIC_KEY,
                format!("{}/v4/stGetFreeTrafficOverview", base),
            )],
            Phase::Backlinks => vec![
                TargetSpec::new(
                    DOMAIN_OVERVIEW_KEY,
                    format!("{}/v4/stGetFreeBacklinksOverview", base),
                ),
                TargetSpec::new(
                    TOP_BACKLINKS_KEY,
                    format!("{}/v4/stGetFreeBacklinksList", base),
                ),
            ],
        }
    }

    /// 执行一个检查任务
    ///
    /// # 返回值
    ///
    /// * `Ok(CheckReport)` - 各阶段合并后的结果，未命中的键被省略
    /// * `Err(CheckError)` - 会话无法打开，或出错且没有任何阶段产生数据
    pub async fn run(&self, job: &CheckJob) -> Result<CheckReport, CheckError> {
        let driver = self.sessions.open_session().await?;
        let guard = SessionGuard::new(Arc::clone(&driver));

        if let Err(e) = driver.enable_human_mode().await {
            warn!("Failed to enable human mode: {}", e);
        }

        let outcome = self.run_phases(driver.as_ref(), job).await;

        guard.release().await;
        outcome
    }

    async fn run_phases(
        &self,
        driver: &dyn BrowserDriver,
        job: &CheckJob,
    ) -> Result<CheckReport, CheckError> {
        let mut phases = Vec::with_capacity(2);
        if job.mode.includes_traffic() {
            phases.push(Phase::Traffic);
        }
        if job.mode.includes_backlinks() {
            phases.push(Phase::Backlinks);
        }

        let mut report = CheckReport::new();
        let mut first_error = None;

        for phase in phases {
            match self.run_phase(driver, job, phase).await {
                Ok(result) => report.extend(result),
                Err(e) => {
                    warn!("Phase {} failed for {}: {}", phase.name(), job.target, e);
                    counter!("domaincheck_phase_failures_total", "phase" => phase.name())
                        .increment(1);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if report.is_empty() => Err(e),
            _ => Ok(report),
        }
    }

    /// 执行单个阶段
    ///
    /// 监听器注册后无论成功与否都会被拆除
    pub async fn run_phase(
        &self,
        driver: &dyn BrowserDriver,
        job: &CheckJob,
        phase: Phase,
    ) -> Result<PhaseResult, CheckError> {
        let url = self.phase_url(phase, &job.target)?;
        let correlator = ResponseCorrelator::new(self.phase_targets(phase));

        correlator.register_listener(driver).await?;
        debug!(phase = phase.name(), state = ?PhaseState::Listening);

        let result = self.drive_phase(driver, &correlator, phase, &url).await;

        if let Err(e) = correlator.teardown(driver).await {
            warn!("Failed to clear response listeners: {}", e);
        }
        debug!(phase = phase.name(), state = ?PhaseState::TornDown);

        result
    }

    async fn drive_phase(
        &self,
        driver: &dyn BrowserDriver,
        correlator: &ResponseCorrelator,
        phase: Phase,
        url: &Url,
    ) -> Result<PhaseResult, CheckError> {
        let (x, y) = self.config.priming_point;
        if let Err(e) = driver.move_pointer(x, y, true).await {
            warn!("Priming pointer move failed: {}", e);
        }

        debug!(phase = phase.name(), state = ?PhaseState::Navigating, url = %url);
        driver.navigate(url.as_str(), true).await?;

        if phase == Phase::Traffic {
            // forces the page to finish loading, the text itself is unused
            if let Err(e) = driver.get_text("body").await {
                warn!("Failed to read page body: {}", e);
            }
        }

        debug!(phase = phase.name(), state = ?PhaseState::Waiting);
        let outcome = correlator
            .wait_until_complete(self.config.phase_timeout, self.config.poll_interval)
            .await;

        if outcome.complete {
            debug!(phase = phase.name(), state = ?PhaseState::Complete);
        } else {
            info!(
                "Phase {} timed out after {:?} with {} capture(s)",
                phase.name(),
                self.config.phase_timeout,
                outcome.captured.len()
            );
            debug!(phase = phase.name(), state = ?PhaseState::TimedOut);
            counter!("domaincheck_phase_timeouts_total", "phase" => phase.name()).increment(1);
        }

        let mut result = PhaseResult::new();
        for (name, captured) in outcome.captured {
            counter!("domaincheck_captures_total", "target" => name.clone()).increment(1);
            let payload = payload_decoder::decode_captured(driver, &captured).await;
            result.insert(name, payload);
        }
        Ok(result)
    }
}
