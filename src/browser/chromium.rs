//! Chromium implementation of [`Browser`] over the DevTools Protocol.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, DisableParams, EnableParams, EventRequestPaused, FailRequestParams,
    RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, CookieParam, CookieSameSite, ErrorReason, ResourceType,
    SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser as CdpBrowser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::{BrowserEngineConfig, BrowserEngineType};
use super::error::BrowserError;
use super::stealth::STEALTH_SCRIPTS;
use super::types::{BrowserCookie, PostSelectors};
use super::user_agent::resolve_user_agent;
use super::Browser;
use crate::models::RawPost;
use crate::pacing::RandomSource;

/// Interval between selector polls.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Resolves once no new resource entries appeared for two consecutive
/// 250ms ticks and the document finished loading.
const NETWORK_IDLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        let last = performance.getEntriesByType('resource').length;
        let quiet = 0;
        const timer = setInterval(() => {
            const now = performance.getEntriesByType('resource').length;
            if (now === last) {
                quiet += 1;
            } else {
                quiet = 0;
                last = now;
            }
            if (quiet >= 2 && document.readyState === 'complete') {
                clearInterval(timer);
                resolve(true);
            }
        }, 250);
    })
"#;

/// Single-page Chromium session with stealth patches.
pub struct ChromiumBrowser {
    browser: Mutex<CdpBrowser>,
    page: Page,
    handler_task: JoinHandle<()>,
    interceptor: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumBrowser {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    /// Launch (or connect to) Chromium and prepare one page.
    pub async fn launch(
        config: &BrowserEngineConfig,
        rng: &dyn RandomSource,
    ) -> Result<Self, BrowserError> {
        let (browser, handler) = match config.remote_url.as_deref() {
            Some(url) => Self::connect_remote(url, config).await?,
            None => Self::launch_local(config).await?,
        };

        let handler_task = spawn_handler(handler);

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(format!("failed to open page: {}", e)))?;

        let user_agent = resolve_user_agent(config.user_agent.as_deref(), rng);
        debug!("Using user agent: {}", user_agent);
        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| BrowserError::Launch(format!("failed to set user agent: {}", e)))?;

        if config.engine == BrowserEngineType::Stealth {
            for script in STEALTH_SCRIPTS {
                if let Err(e) = page
                    .execute(AddScriptToEvaluateOnNewDocumentParams::new(script.to_string()))
                    .await
                {
                    warn!("Failed to register stealth script: {}", e);
                }
            }
        }

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler_task,
            interceptor: Mutex::new(None),
        })
    }

    /// Find Chrome executable.
    fn find_chrome() -> Result<PathBuf, BrowserError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(BrowserError::Launch(
            "Chrome/Chromium not found. Install chromium or set browser.remote_url".to_string(),
        ))
    }

    async fn launch_local(
        config: &BrowserEngineConfig,
    ) -> Result<(CdpBrowser, Handler), BrowserError> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_secs(config.timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid browser config: {}", e)))?;

        CdpBrowser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(
        url: &str,
        config: &BrowserEngineConfig,
    ) -> Result<(CdpBrowser, Handler), BrowserError> {
        info!("Connecting to remote browser at {}", url);

        // WebSocket URL comes from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| BrowserError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| BrowserError::Launch(format!("bad version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrowserError::Launch("no webSocketDebuggerUrl in response".into()))?;

        let handler_config = HandlerConfig {
            request_timeout: Duration::from_secs(config.timeout),
            ..Default::default()
        };

        CdpBrowser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))
    }

    async fn evaluate_value<T: serde::de::DeserializeOwned>(
        &self,
        script: String,
    ) -> Result<T, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(BrowserError::script)?
            .into_value()
            .map_err(BrowserError::script)
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// Resource types dropped while request blocking is on.
fn is_blocked_resource(resource_type: &ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Image | ResourceType::Stylesheet | ResourceType::Font
    )
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| BrowserError::navigation(url, e))?;

        let load = async {
            self.page
                .goto(params)
                .await
                .map_err(|e| BrowserError::navigation(url, e))?;
            self.page
                .evaluate(NETWORK_IDLE_SCRIPT.to_string())
                .await
                .map_err(|e| BrowserError::navigation(url, e))?;
            Ok(())
        };

        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout(timeout)),
        }
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let url = self.page.url().await.map_err(BrowserError::script)?;
        Ok(url.unwrap_or_default())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>, BrowserError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::Cookie(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: Some(c.expires),
                http_only: c.http_only,
                secure: c.secure,
                same_site: c.same_site.map(|s| format!("{:?}", s)),
            })
            .collect())
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<(), BrowserError> {
        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies.iter().filter(|c| c.is_injectable()) {
            let mut builder = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .secure(cookie.secure)
                .http_only(cookie.http_only);
            // Non-positive expiry marks a session cookie in DevTools dumps
            if let Some(expires) = cookie.expires.filter(|e| *e > 0.0) {
                builder = builder.expires(TimeSinceEpoch::new(expires));
            }
            if let Some(same_site) = cookie.same_site.as_deref().and_then(parse_same_site) {
                builder = builder.same_site(same_site);
            }
            match builder.build() {
                Ok(param) => params.push(param),
                Err(e) => warn!("Failed to build cookie {}: {}", cookie.name, e),
            }
        }

        debug!("Injecting {} cookies", params.len());
        self.page
            .set_cookies(params)
            .await
            .map_err(|e| BrowserError::Cookie(e.to_string()))?;
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(|e| BrowserError::Cookie(e.to_string()))?;
        Ok(())
    }

    async fn set_request_blocking(&self, enabled: bool) -> Result<(), BrowserError> {
        let mut interceptor = self.interceptor.lock().await;

        if !enabled {
            if let Some(task) = interceptor.take() {
                task.abort();
                self.page
                    .execute(DisableParams::default())
                    .await
                    .map_err(|e| BrowserError::Interception(e.to_string()))?;
                debug!("Request blocking disabled");
            }
            return Ok(());
        }

        if interceptor.is_some() {
            return Ok(());
        }

        let mut events = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| BrowserError::Interception(e.to_string()))?;

        let pattern = RequestPattern::builder().url_pattern("*").build();
        self.page
            .execute(EnableParams::builder().patterns(vec![pattern]).build())
            .await
            .map_err(|e| BrowserError::Interception(e.to_string()))?;

        let page = self.page.clone();
        *interceptor = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let request_id = event.request_id.clone();
                let result = if is_blocked_resource(&event.resource_type) {
                    page.execute(FailRequestParams::new(
                        request_id,
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = result {
                    debug!("Intercepted request not resolved: {}", e);
                }
            }
        }));

        debug!("Request blocking enabled");
        Ok(())
    }

    async fn scroll_by(&self, distance: u32) -> Result<(), BrowserError> {
        self.page
            .evaluate(format!(
                "window.scrollBy({{top: {}, behavior: 'smooth'}})",
                distance
            ))
            .await
            .map_err(BrowserError::script)?;
        Ok(())
    }

    async fn page_height(&self) -> Result<u64, BrowserError> {
        let height: f64 = self
            .evaluate_value("document.body.scrollHeight".to_string())
            .await?;
        Ok(height.max(0.0) as u64)
    }

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        self.evaluate_value(format!(
            "document.querySelector({}) !== null",
            js_string(selector)
        ))
        .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let poll = async {
            loop {
                if self.has_element(selector).await? {
                    return Ok(());
                }
                tokio::time::sleep(SELECTOR_POLL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout(timeout)),
        }
    }

    async fn extract_posts(&self, selectors: &PostSelectors) -> Result<Vec<RawPost>, BrowserError> {
        let script = format!(
            r#"
            (() => {{
                const posts = [];
                document.querySelectorAll({container}).forEach((el) => {{
                    const body = el.querySelector({text});
                    const time = el.querySelector({timestamp});
                    posts.push({{
                        text: body ? body.innerText : null,
                        datetime: time ? time.getAttribute('datetime') : null,
                    }});
                }});
                return posts;
            }})()
            "#,
            container = js_string(&selectors.container),
            text = js_string(&selectors.text),
            timestamp = js_string(&selectors.timestamp),
        );
        self.evaluate_value(script).await
    }

    async fn close(&self) {
        if let Some(task) = self.interceptor.lock().await.take() {
            task.abort();
        }

        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        let _ = browser.wait().await;
        self.handler_task.abort();
        info!("Browser closed");
    }
}

/// Map a saved `sameSite` value to CDP. Accepts the DevTools spelling and
/// the lowercase one used by cookie-export extensions.
fn parse_same_site(value: &str) -> Option<CookieSameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" | "no_restriction" => Some(CookieSameSite::None),
        _ => None,
    }
}
