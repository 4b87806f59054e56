//! Cookie and selector types shared by every browser implementation.

use serde::{Deserialize, Serialize};

/// Cookie as stored in the session file.
///
/// Field names follow the cookie objects DevTools-based tools dump
/// (`httpOnly`, `sameSite`), so existing session files load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    #[serde(alias = "key")]
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Expiry as seconds since the epoch; `None` or negative for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

impl BrowserCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    /// Cookies without a name or domain cannot be injected.
    pub fn is_injectable(&self) -> bool {
        !self.name.is_empty() && !self.domain.is_empty()
    }
}

/// Selectors describing where posts live in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSelectors {
    /// One element per post.
    pub container: String,
    /// Post body, relative to the container.
    pub text: String,
    /// Element carrying the `datetime` attribute, relative to the container.
    pub timestamp: String,
}

impl Default for PostSelectors {
    fn default() -> Self {
        Self {
            container: "article".to_string(),
            text: "div[lang]".to_string(),
            timestamp: "time".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_reads_devtools_dump() {
        let json = r#"{
            "name": "auth_token",
            "value": "abc",
            "domain": ".x.com",
            "path": "/",
            "expires": 1767225600.5,
            "size": 40,
            "httpOnly": true,
            "secure": true,
            "session": false,
            "sameSite": "None"
        }"#;
        let cookie: BrowserCookie = serde_json::from_str(json).unwrap();
        assert_eq!(cookie.name, "auth_token");
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("None"));
    }

    #[test]
    fn test_cookie_accepts_key_alias_and_defaults_path() {
        let cookie: BrowserCookie =
            serde_json::from_str(r#"{"key": "ct0", "value": "v", "domain": ".x.com"}"#).unwrap();
        assert_eq!(cookie.name, "ct0");
        assert_eq!(cookie.path, "/");
        assert!(cookie.is_injectable());
    }

    #[test]
    fn test_cookie_without_domain_not_injectable() {
        assert!(!BrowserCookie::new("a", "b", "").is_injectable());
    }
}
