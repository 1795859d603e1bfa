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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、浏览器、上游站点、捕获策略和指标等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 上游站点配置
    pub upstream: UpstreamSettings,
    /// 响应捕获配置
    pub capture: CaptureSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程调试地址，设置后连接已有的 Chrome 而不是启动新实例
    pub remote_debugging_url: Option<String>,
    /// 是否无头模式
    pub headless: bool,
    /// CDP 请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 等待防护挑战页面通过的最长时间（秒）
    pub challenge_timeout_secs: u64,
    /// 窗口宽度
    pub window_width: u32,
    /// 窗口高度
    pub window_height: u32,
}

/// 上游站点配置设置
#[derive(Debug, Deserialize)]
pub struct UpstreamSettings {
    /// 站点根地址
    pub base_url: String,
}

/// 响应捕获配置设置
#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    /// 每个阶段的等待超时（秒）
    pub phase_timeout_secs: u64,
    /// 等待循环复查间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 导航前指针位置 X
    pub priming_x: f64,
    /// 导航前指针位置 Y
    pub priming_y: f64,
    /// 页面刷新检测超时（毫秒）
    pub refresh_timeout_ms: u64,
    /// 页面刷新检测间隔（毫秒）
    pub refresh_interval_ms: u64,
}

/// 指标配置设置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、配置文件和环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("DOMAINCHECK").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅使用内置默认值的配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Server
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            // Browser
            .set_default("browser.headless", true)?
            .set_default("browser.request_timeout_secs", 30)?
            .set_default("browser.challenge_timeout_secs", 20)?
            .set_default("browser.window_width", 1366)?
            .set_default("browser.window_height", 768)?
            // Upstream
            .set_default("upstream.base_url", "https://ahrefs.com")?
            // Capture policy
            .set_default("capture.phase_timeout_secs", 30)?
            .set_default("capture.poll_interval_ms", 500)?
            .set_default("capture.priming_x", 100.0)?
            .set_default("capture.priming_y", 100.0)?
            .set_default("capture.refresh_timeout_ms", 10_000)?
            .set_default("capture.refresh_interval_ms", 50)?
            // Metrics
            .set_default("metrics.enabled", true)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
