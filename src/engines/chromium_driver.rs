// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::settings::BrowserSettings;
use crate::engines::human_cursor;
use crate::engines::shared_browser::{BrowserLauncher, PageSource, SharedBrowser};
use crate::engines::traits::{
    BrowserDriver, DriverError, ListenerId, ResponseBody, ResponseEvent, ResponseListener,
    SessionFactory,
};

/// 导航时携带的来源页
const SEARCH_REFERRER: &str = "https://www.google.com/";

/// 防护挑战页面的标题特征
const CHALLENGE_TITLES: [&str; 3] = ["Just a moment", "Attention Required", "Checking your browser"];

/// 挑战检测间隔
const CHALLENGE_POLL: Duration = Duration::from_millis(500);

type ListenerRegistry = Arc<Mutex<Vec<(ListenerId, ResponseListener)>>>;

/// CDP 状态码是 i64，超出范围的值记为 0
fn http_status(raw: i64) -> u16 {
    u16::try_from(raw).unwrap_or_default()
}

fn protocol_error(e: impl std::fmt::Display) -> DriverError {
    DriverError::Protocol(e.to_string())
}

/// chromiumoxide 浏览器启动器
///
/// 配置了远程调试地址时连接已有实例，否则启动本地 Chrome
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

/// 一个浏览器实例及其事件处理任务
pub struct ChromiumBrowser {
    browser: Browser,
    alive: Arc<AtomicBool>,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Browser = ChromiumBrowser;

    async fn launch(&self) -> Result<ChromiumBrowser, DriverError> {
        let (browser, mut handler) = if let Some(ref url) = self.settings.remote_debugging_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url).await.map_err(|e| {
                DriverError::Unavailable(format!("Failed to connect to remote Chrome: {}", e))
            })?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(self.settings.request_timeout_secs))
                .window_size(self.settings.window_width, self.settings.window_height)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-blink-features=AutomationControlled");
            if !self.settings.headless {
                builder = builder.with_head();
            }
            let config = builder.build().map_err(DriverError::Unavailable)?;
            info!("Launching Chrome");
            Browser::launch(config)
                .await
                .map_err(|e| DriverError::Unavailable(e.to_string()))?
        };

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
            warn!("Browser connection closed");
            flag.store(false, Ordering::SeqCst);
        });

        Ok(ChromiumBrowser {
            browser,
            alive,
            handler,
        })
    }
}

#[async_trait]
impl PageSource for ChromiumBrowser {
    type Page = Page;

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.handler.is_finished()
    }

    async fn new_page(&self) -> Result<Page, DriverError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Unavailable(e.to_string()))
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// 基于 chromiumoxide 的会话工厂
///
/// 所有任务共享一个浏览器进程，每个会话是一个独立的页面。
pub struct ChromiumSessionFactory {
    browser: SharedBrowser<ChromiumLauncher>,
    challenge_timeout: Duration,
}

impl ChromiumSessionFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        let challenge_timeout = Duration::from_secs(settings.challenge_timeout_secs);
        Self {
            browser: SharedBrowser::new(ChromiumLauncher { settings }),
            challenge_timeout,
        }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn open_session(&self) -> Result<Arc<dyn BrowserDriver>, DriverError> {
        let page = self.browser.open_page().await?;

        page.execute(EnableParams::default())
            .await
            .map_err(protocol_error)?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(protocol_error)?;

        let listeners: ListenerRegistry = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::clone(&listeners);
        let pump = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let response = ResponseEvent {
                    request_id: event.request_id.inner().clone(),
                    url: event.response.url.clone(),
                    status: http_status(event.response.status),
                    mime_type: event.response.mime_type.clone(),
                };
                // snapshot so callbacks never run under the registry lock
                let current: Vec<ResponseListener> =
                    registry.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
                for listener in current {
                    listener(&response);
                }
            }
            debug!("Response event stream ended");
        });

        Ok(Arc::new(ChromiumSession {
            page,
            listeners,
            next_listener: AtomicU64::new(1),
            pump: Mutex::new(Some(pump)),
            human_mode: AtomicBool::new(false),
            pointer: Mutex::new((0.0, 0.0)),
            challenge_timeout: self.challenge_timeout,
        }))
    }
}

/// 单个浏览器会话（一个页面）
pub struct ChromiumSession {
    page: Page,
    listeners: ListenerRegistry,
    next_listener: AtomicU64,
    pump: Mutex<Option<JoinHandle<()>>>,
    human_mode: AtomicBool,
    pointer: Mutex<(f64, f64)>,
    challenge_timeout: Duration,
}

impl ChromiumSession {
    async fn wait_for_challenge(&self) -> Result<(), DriverError> {
        let deadline = Instant::now() + self.challenge_timeout;
        loop {
            let title = self.current_title().await?;
            if !CHALLENGE_TITLES.iter().any(|marker| title.contains(marker)) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::ChallengeTimeout(self.challenge_timeout.as_secs()));
            }
            debug!("Waiting for protection challenge to clear: {}", title);
            tokio::time::sleep(CHALLENGE_POLL).await;
        }
    }

    fn stop_pump(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumSession {
    async fn navigate(&self, url: &str, bypass_protection: bool) -> Result<(), DriverError> {
        let params = NavigateParams::builder()
            .url(url)
            .referrer(SEARCH_REFERRER)
            .build()
            .map_err(DriverError::Navigation)?;
        self.page
            .goto(params)
            .await
            .map_err(|e| DriverError::Navigation(format!("{}: {}", url, e)))?;

        if bypass_protection {
            self.wait_for_challenge().await?;
        }
        Ok(())
    }

    async fn on_response_received(
        &self,
        listener: ResponseListener,
    ) -> Result<ListenerId, DriverError> {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, listener));
        Ok(id)
    }

    async fn clear_response_listeners(&self) -> Result<(), DriverError> {
        self.listeners.lock().clear();
        Ok(())
    }

    async fn fetch_response_body(&self, request_id: &str) -> Result<ResponseBody, DriverError> {
        let response = self
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(request_id)))
            .await
            .map_err(|e| DriverError::BodyFetch(e.to_string()))?;
        Ok(ResponseBody {
            content: response.result.body.clone(),
            base64_encoded: response.result.base64_encoded,
        })
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await.map_err(protocol_error)?.unwrap_or_default())
    }

    async fn current_title(&self) -> Result<String, DriverError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(protocol_error)?
            .unwrap_or_default())
    }

    async fn get_text(&self, selector: &str) -> Result<String, DriverError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::ElementNotFound(format!("{}: {}", selector, e)))?;
        Ok(element
            .inner_text()
            .await
            .map_err(protocol_error)?
            .unwrap_or_default())
    }

    async fn move_pointer(&self, x: f64, y: f64, human_like: bool) -> Result<(), DriverError> {
        let from = *self.pointer.lock();
        let human_mode = self.human_mode.load(Ordering::SeqCst);

        // the rng is not Send, so the whole plan is built before the first await
        let steps: Vec<((f64, f64), Duration)> = {
            let mut rng = rand::rng();
            let points = if human_like {
                human_cursor::path(from, (x, y), &mut rng)
            } else {
                vec![(x, y)]
            };
            points
                .into_iter()
                .map(|p| {
                    let pause = if human_mode {
                        Duration::from_millis(rng.random_range(4..18))
                    } else {
                        Duration::ZERO
                    };
                    (p, pause)
                })
                .collect()
        };

        for ((px, py), pause) in steps {
            self.page
                .execute(DispatchMouseEventParams::new(
                    DispatchMouseEventType::MouseMoved,
                    px,
                    py,
                ))
                .await
                .map_err(protocol_error)?;
            *self.pointer.lock() = (px, py);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        Ok(())
    }

    async fn enable_human_mode(&self) -> Result<(), DriverError> {
        self.human_mode.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disable_human_mode(&self) -> Result<(), DriverError> {
        self.human_mode.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.stop_pump();
        self.listeners.lock().clear();
        if let Err(e) = self.page.clone().close().await {
            warn!("Failed to close page: {}", e);
            return Err(protocol_error(e));
        }
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.stop_pump();
    }
}
