//! Errors reported by browser implementations.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("cookie operation failed: {0}")]
    Cookie(String),

    #[error("request interception failed: {0}")]
    Interception(String),

    #[error("browser is closed")]
    Closed,
}

impl BrowserError {
    pub fn navigation(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn script(reason: impl std::fmt::Display) -> Self {
        Self::Script(reason.to_string())
    }
}
