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

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 浏览器驱动错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// 浏览器启动或连接失败
    #[error("Browser unavailable: {0}")]
    Unavailable(String),
    /// 页面导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 防护页面（如 Cloudflare）未能在限定时间内通过
    #[error("Protection challenge not cleared within {0} seconds")]
    ChallengeTimeout(u64),
    /// 响应体获取失败（会话已关闭或标识已失效）
    #[error("Failed to fetch response body: {0}")]
    BodyFetch(String),
    /// 元素未找到
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    /// 其他 CDP 错误
    #[error("CDP error: {0}")]
    Protocol(String),
}

/// 监听器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// 网络响应到达事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    /// 请求标识，可用于之后获取响应体
    pub request_id: String,
    /// 响应URL
    pub url: String,
    /// HTTP状态码
    pub status: u16,
    /// MIME 类型
    pub mime_type: String,
}

/// 原始响应体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    /// 响应内容
    pub content: String,
    /// 内容是否经过 Base64 编码
    pub base64_encoded: bool,
}

/// 响应到达回调
///
/// 在驱动自己的事件任务中被调用，实现必须是线程安全且不阻塞的
pub type ResponseListener = Arc<dyn Fn(&ResponseEvent) + Send + Sync>;

/// 浏览器驱动特质
///
/// 核心流程只依赖这一组能力，不关心底层如何渲染页面或投递网络事件
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// 导航到指定URL
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `bypass_protection` - 是否等待反爬挑战页面通过
    async fn navigate(&self, url: &str, bypass_protection: bool) -> Result<(), DriverError>;

    /// 注册响应到达监听器
    async fn on_response_received(
        &self,
        listener: ResponseListener,
    ) -> Result<ListenerId, DriverError>;

    /// 清空所有已注册的响应监听器
    async fn clear_response_listeners(&self) -> Result<(), DriverError>;

    /// 根据请求标识获取原始响应体
    async fn fetch_response_body(&self, request_id: &str) -> Result<ResponseBody, DriverError>;

    /// 当前页面URL
    async fn current_url(&self) -> Result<String, DriverError>;

    /// 当前页面标题
    async fn current_title(&self) -> Result<String, DriverError>;

    /// 读取选择器匹配元素的文本
    async fn get_text(&self, selector: &str) -> Result<String, DriverError>;

    /// 移动模拟指针
    async fn move_pointer(&self, x: f64, y: f64, human_like: bool) -> Result<(), DriverError>;

    /// 开启拟人行为模式
    async fn enable_human_mode(&self) -> Result<(), DriverError>;

    /// 关闭拟人行为模式
    async fn disable_human_mode(&self) -> Result<(), DriverError>;

    /// 关闭会话，释放页面资源
    async fn close(&self) -> Result<(), DriverError>;
}

/// 浏览器会话工厂
///
/// 每个任务在持有单飞门期间打开一个会话，结束时关闭
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// 打开新的浏览器会话
    async fn open_session(&self) -> Result<Arc<dyn BrowserDriver>, DriverError>;
}
