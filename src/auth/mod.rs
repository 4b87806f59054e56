//! Establishing an authenticated browsing context.
//!
//! The flow is a small state machine:
//!
//! 1. **Expired check**: a persisted session older than the maximum age is
//!    deleted along with any live browser cookies.
//! 2. **Cookie attempt**: live cookies are cleared, the remaining session
//!    is injected and the home page probed.
//! 3. **Manual fallback**: every login endpoint is tried in order. The
//!    operator logs in by hand in the visible browser window; the first
//!    endpoint that ends in a logged-in page wins and its cookies are saved.
//!
//! Exhausting every endpoint is terminal for the run.

mod probe;

pub use probe::{default_indicators, default_login_markers, AuthProbe, Indicator, ProbeOutcome};

use std::time::{Duration, SystemTime};

use futures::future::select_ok;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::{BrowserCookie, BrowserError};
use crate::navigator::{secs, sleep_or_cancel, NavigationError, Navigator};
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication failed on all {attempted} login endpoints")]
    Failed { attempted: usize },
    #[error("authentication cancelled")]
    Cancelled,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Site-specific login settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Page loaded to verify a replayed session.
    pub home_url: String,
    /// Manual-login endpoints, tried in order.
    pub login_urls: Vec<String>,
    /// Selectors raced while the operator logs in; the first to appear ends the wait.
    pub ready_selectors: Vec<String>,
    pub indicators: Vec<Indicator>,
    pub login_markers: Vec<String>,
    #[serde(with = "secs")]
    pub home_settle: Duration,
    #[serde(with = "secs")]
    pub login_settle: Duration,
    /// How long the operator has per endpoint.
    #[serde(with = "secs")]
    pub login_wait: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            home_url: "https://x.com/home".to_string(),
            login_urls: vec![
                "https://x.com/i/flow/login".to_string(),
                "https://twitter.com/i/flow/login".to_string(),
                "https://x.com/login".to_string(),
                "https://twitter.com/login".to_string(),
            ],
            ready_selectors: vec![
                r#"a[href="/compose/tweet"]"#.to_string(),
                r#"div[data-testid="AppTabBar_Home_Link"]"#.to_string(),
                "article".to_string(),
                r#"[data-testid="primaryColumn"]"#.to_string(),
            ],
            indicators: default_indicators(),
            login_markers: default_login_markers(),
            home_settle: Duration::from_secs(5),
            login_settle: Duration::from_secs(8),
            login_wait: Duration::from_secs(120),
        }
    }
}

impl AuthConfig {
    pub fn probe(&self) -> AuthProbe {
        AuthProbe::new(self.indicators.clone(), self.login_markers.clone())
    }
}

/// How the browsing context became authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Session,
    Manual { endpoint: String },
}

pub struct Authenticator<'a> {
    navigator: &'a Navigator,
    store: &'a SessionStore,
    config: &'a AuthConfig,
    max_age: Duration,
    probe: AuthProbe,
}

impl<'a> Authenticator<'a> {
    pub fn new(
        navigator: &'a Navigator,
        store: &'a SessionStore,
        config: &'a AuthConfig,
        max_age: Duration,
    ) -> Self {
        Self {
            navigator,
            store,
            config,
            max_age,
            probe: config.probe(),
        }
    }

    pub async fn authenticate(&self) -> Result<AuthMethod, AuthError> {
        self.authenticate_at(SystemTime::now()).await
    }

    /// Run the state machine, judging session age against `now`.
    pub async fn authenticate_at(&self, now: SystemTime) -> Result<AuthMethod, AuthError> {
        self.purge_expired(now).await?;

        if self.try_session().await? {
            info!("Logged in with saved session");
            return Ok(AuthMethod::Session);
        }

        self.manual_fallback().await
    }

    async fn purge_expired(&self, now: SystemTime) -> Result<(), AuthError> {
        if !self.store.exists() {
            return Ok(());
        }
        match self.store.is_expired_at(self.max_age, now) {
            Ok(true) => {
                info!(
                    "Saved session is older than {:?}, removing it",
                    self.max_age
                );
                self.store.invalidate(self.navigator.browser()).await?;
            }
            Ok(false) => {}
            Err(e) => warn!("Could not read session age: {}", e),
        }
        Ok(())
    }

    /// Replay the saved session. `Ok(false)` means move on to manual login.
    async fn try_session(&self) -> Result<bool, AuthError> {
        let artifact = match self.store.load() {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("Ignoring unusable session: {}", e);
                return Ok(false);
            }
        };

        let cookies: Vec<BrowserCookie> = artifact
            .cookies
            .into_iter()
            .filter(BrowserCookie::is_injectable)
            .collect();
        if cookies.is_empty() {
            warn!("Saved session has no usable cookies");
            return Ok(false);
        }

        info!("Trying saved session ({} cookies)", cookies.len());
        let browser = self.navigator.browser();
        // Only the saved jar should be present when the probe runs
        if let Err(e) = browser.clear_cookies().await {
            warn!("Failed to clear cookies before injecting session: {}", e);
            return Ok(false);
        }
        if let Err(e) = browser.set_cookies(&cookies).await {
            warn!("Failed to inject saved cookies: {}", e);
            return Ok(false);
        }

        match self.navigator.goto(&self.config.home_url).await {
            Ok(()) => {}
            Err(NavigationError::Cancelled) => return Err(AuthError::Cancelled),
            Err(e) => {
                warn!("Could not verify saved session: {}", e);
                return Ok(false);
            }
        }
        self.settle(self.config.home_settle).await?;

        match self.probe.run(browser).await {
            Ok(outcome) if outcome.is_authenticated() => Ok(true),
            Ok(outcome) => {
                info!("Saved session rejected ({:?}), manual login needed", outcome);
                Ok(false)
            }
            Err(e) => {
                warn!("Login probe failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn manual_fallback(&self) -> Result<AuthMethod, AuthError> {
        info!("Clearing previous session state");
        self.store.invalidate(self.navigator.browser()).await?;

        for endpoint in &self.config.login_urls {
            match self.try_endpoint(endpoint).await {
                Ok(true) => {
                    return Ok(AuthMethod::Manual {
                        endpoint: endpoint.clone(),
                    })
                }
                Ok(false) => info!("Login not confirmed at {}, trying next endpoint", endpoint),
                Err(AuthError::Cancelled) => return Err(AuthError::Cancelled),
                // Logged in but the session could not be written; another
                // endpoint would only ask the operator to log in again
                Err(e @ AuthError::Session(_)) => return Err(e),
                Err(e) => warn!("Login attempt at {} failed: {}", endpoint, e),
            }
        }

        Err(AuthError::Failed {
            attempted: self.config.login_urls.len(),
        })
    }

    async fn try_endpoint(&self, endpoint: &str) -> Result<bool, AuthError> {
        info!("Manual login at {}", endpoint);
        match self.navigator.goto(endpoint).await {
            Ok(()) => {}
            Err(NavigationError::Cancelled) => return Err(AuthError::Cancelled),
            Err(e) => {
                warn!("{}", e);
                return Ok(false);
            }
        }

        info!(
            "You have {}s to log in manually in the browser window (use username/email, not SSO)",
            self.config.login_wait.as_secs()
        );
        self.await_ready().await?;
        self.settle(self.config.login_settle).await?;

        let browser = self.navigator.browser();
        if !self.probe.run(browser).await?.is_authenticated() {
            return Ok(false);
        }

        let cookies = browser.cookies().await?;
        if cookies.is_empty() {
            warn!("Logged in but the cookie jar is empty, not saving");
            return Ok(false);
        }
        self.store.save(&cookies)?;
        info!("Manual login succeeded, session saved");
        Ok(true)
    }

    /// Race the readiness selectors; the first to appear wins.
    async fn await_ready(&self) -> Result<(), AuthError> {
        let browser = self.navigator.browser();
        let waits = self
            .config
            .ready_selectors
            .iter()
            .map(|selector| browser.wait_for_selector(selector, self.config.login_wait));

        if self.config.ready_selectors.is_empty() {
            return Ok(());
        }

        tokio::select! {
            _ = self.navigator.cancel_token().cancelled() => Err(AuthError::Cancelled),
            result = select_ok(waits) => match result {
                Ok(_) => Ok(()),
                Err(e) => {
                    // Still probe: the operator may have landed somewhere unexpected
                    debug!("No readiness selector appeared: {}", e);
                    Ok(())
                }
            },
        }
    }

    async fn settle(&self, duration: Duration) -> Result<(), AuthError> {
        if sleep_or_cancel(self.navigator.cancel_token(), duration).await {
            Ok(())
        } else {
            Err(AuthError::Cancelled)
        }
    }
}
