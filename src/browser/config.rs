//! Browser launch configuration.

use serde::{Deserialize, Serialize};

/// How the Chromium instance is launched or reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserEngineConfig {
    /// Browser engine type.
    pub engine: BrowserEngineType,

    /// Run headless. Defaults to false: the login fallback needs a visible
    /// window for the operator.
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    pub proxy: Option<String>,

    /// CDP request timeout in seconds.
    pub timeout: u64,

    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    pub remote_url: Option<String>,

    /// User agent: unset picks a random entry from the built-in pool,
    /// anything else is used verbatim.
    pub user_agent: Option<String>,

    /// Window size in pixels.
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngineType::default(),
            headless: false,
            proxy: None,
            timeout: 90,
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// Browser engine types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngineType {
    /// Chromium with stealth patches injected into every document (default).
    #[default]
    Stealth,

    /// No stealth patches (for debugging).
    Standard,
}
