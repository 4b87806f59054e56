//! Authenticated-state detection.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::browser::{Browser, BrowserError};

/// A named element whose presence means the page was rendered for a
/// logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub selector: String,
}

impl Indicator {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }
}

pub fn default_indicators() -> Vec<Indicator> {
    vec![
        Indicator::new("compose link", r#"a[href="/compose/tweet"]"#),
        Indicator::new("home tab", r#"div[data-testid="AppTabBar_Home_Link"]"#),
        Indicator::new("article", "article"),
        Indicator::new("primary column", r#"[data-testid="primaryColumn"]"#),
        Indicator::new(
            "account switcher",
            r#"[data-testid="SideNav_AccountSwitcher_Button"]"#,
        ),
    ]
}

pub fn default_login_markers() -> Vec<String> {
    vec!["/login".to_string(), "/i/flow".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The first indicator that matched.
    Authenticated { indicator: String },
    /// The browser is still on a login flow page.
    OnLoginPage { url: String },
    /// Nothing on the page looks like a logged-in layout.
    NoIndicator,
}

impl ProbeOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Ordered indicator list plus login-page URL markers. First match wins.
#[derive(Debug, Clone)]
pub struct AuthProbe {
    indicators: Vec<Indicator>,
    login_markers: Vec<String>,
}

impl Default for AuthProbe {
    fn default() -> Self {
        Self::new(default_indicators(), default_login_markers())
    }
}

impl AuthProbe {
    pub fn new(indicators: Vec<Indicator>, login_markers: Vec<String>) -> Self {
        Self {
            indicators,
            login_markers,
        }
    }

    pub async fn run(&self, browser: &dyn Browser) -> Result<ProbeOutcome, BrowserError> {
        let url = browser.current_url().await?;
        if self.is_login_url(&url) {
            return Ok(ProbeOutcome::OnLoginPage { url });
        }

        for indicator in &self.indicators {
            if browser.has_element(&indicator.selector).await? {
                debug!("Authenticated indicator matched: {}", indicator.name);
                return Ok(ProbeOutcome::Authenticated {
                    indicator: indicator.name.clone(),
                });
            }
        }
        Ok(ProbeOutcome::NoIndicator)
    }

    /// Whether `url` is part of a login flow. Markers are matched against
    /// the path when the URL parses, and the raw string otherwise. Query
    /// strings are ignored so that a search for `/login` is not mistaken
    /// for the login page.
    pub fn is_login_url(&self, url: &str) -> bool {
        let haystack = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.to_string(),
        };
        self.login_markers
            .iter()
            .any(|marker| haystack.contains(marker.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;

    const HOME: &str = "https://x.com/home";

    #[test]
    fn test_login_markers() {
        let probe = AuthProbe::default();
        assert!(probe.is_login_url("https://x.com/i/flow/login"));
        assert!(probe.is_login_url("https://twitter.com/login?redirect=1"));
        assert!(!probe.is_login_url(HOME));
        // Query strings and fragments are not part of the path
        assert!(!probe.is_login_url("https://x.com/search?q=/login"));
        assert!(!probe.is_login_url("https://x.com/search?q=%2Fi%2Fflow#/login"));
        // Unparsable input falls back to the raw string
        assert!(probe.is_login_url("/i/flow/login"));
    }

    #[tokio::test]
    async fn test_first_indicator_wins() {
        let browser = FakeBrowser::new().with(|s| {
            s.url = HOME.to_string();
            s.show(HOME, &["article", r#"[data-testid="primaryColumn"]"#]);
        });

        let outcome = AuthProbe::default().run(&browser).await.unwrap();
        assert_eq!(
            outcome,
            ProbeOutcome::Authenticated {
                indicator: "article".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_login_page_fails_even_with_indicators() {
        let url = "https://x.com/i/flow/login";
        let browser = FakeBrowser::new().with(|s| {
            s.url = url.to_string();
            s.show(url, &["article"]);
        });

        let outcome = AuthProbe::default().run(&browser).await.unwrap();
        assert!(!outcome.is_authenticated());
        assert!(matches!(outcome, ProbeOutcome::OnLoginPage { .. }));
    }

    #[tokio::test]
    async fn test_no_indicator() {
        let browser = FakeBrowser::new().with(|s| s.url = HOME.to_string());
        let outcome = AuthProbe::default().run(&browser).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::NoIndicator);
    }
}
