//! Browser capability used by the collector.
//!
//! The core never talks to a rendering engine directly. It drives a
//! [`Browser`]: navigation with an idle signal, cookie access, request
//! blocking, scrolling and DOM queries. [`ChromiumBrowser`] implements it
//! over the Chrome DevTools Protocol with stealth evasion patches.

#[cfg(feature = "browser")]
mod chromium;
mod config;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod stealth;
mod types;
mod user_agent;

#[cfg(feature = "browser")]
pub use chromium::ChromiumBrowser;
pub use config::{BrowserEngineConfig, BrowserEngineType};
pub use error::BrowserError;
pub use stealth::STEALTH_SCRIPTS;
pub use types::{BrowserCookie, PostSelectors};
pub use user_agent::{random_user_agent, resolve_user_agent, DESKTOP_USER_AGENTS};

use std::time::Duration;

use async_trait::async_trait;

use crate::models::RawPost;

/// The page-level operations the collector needs from a browsing context.
///
/// Implementations own a single page; every method acts on it.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate and wait until the load finished and the network went
    /// mostly quiet, or `timeout` elapsed.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// URL of the current document.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// All cookies visible to the browsing context.
    async fn cookies(&self) -> Result<Vec<BrowserCookie>, BrowserError>;

    /// Inject cookies into the browsing context.
    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<(), BrowserError>;

    /// Remove every cookie from the browsing context.
    async fn clear_cookies(&self) -> Result<(), BrowserError>;

    /// Abort image, stylesheet and font requests while enabled.
    async fn set_request_blocking(&self, enabled: bool) -> Result<(), BrowserError>;

    /// Scroll the window down by `distance` pixels.
    async fn scroll_by(&self, distance: u32) -> Result<(), BrowserError>;

    /// Total scrollable height of the document body.
    async fn page_height(&self) -> Result<u64, BrowserError>;

    /// Whether `selector` currently matches any element.
    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Wait until `selector` matches, failing with [`BrowserError::Timeout`].
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    /// Snapshot of every rendered post.
    async fn extract_posts(&self, selectors: &PostSelectors) -> Result<Vec<RawPost>, BrowserError>;

    /// Shut the browsing context down.
    async fn close(&self);
}
