//! Scripted in-memory browser for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Browser, BrowserCookie, BrowserError, PostSelectors};
use crate::models::RawPost;

#[derive(Default)]
pub(crate) struct FakeState {
    pub url: String,
    pub navigations: Vec<String>,
    /// Remaining failures per URL before navigation succeeds.
    pub failures: HashMap<String, usize>,
    pub always_fail: HashSet<String>,
    /// Where a URL ends up after navigation (login redirects).
    pub redirects: HashMap<String, String>,
    /// Selectors present while the current URL is the key.
    pub elements: HashMap<String, HashSet<String>>,
    pub cookies: Vec<BrowserCookie>,
    /// Cookies the site hands out once a URL has been loaded.
    pub cookies_after: HashMap<String, Vec<BrowserCookie>>,
    pub injected: Vec<BrowserCookie>,
    pub clears: usize,
    pub blocking_calls: Vec<bool>,
    pub heights: VecDeque<u64>,
    pub last_height: u64,
    pub posts: VecDeque<Vec<RawPost>>,
    pub last_posts: Vec<RawPost>,
    pub extract_fails: bool,
    pub scrolls: Vec<u32>,
    pub closed: bool,
}

#[derive(Default)]
pub(crate) struct FakeBrowser {
    pub state: Mutex<FakeState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F: FnOnce(&mut FakeState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

impl FakeState {
    pub fn show(&mut self, url: &str, selectors: &[&str]) {
        self.elements
            .entry(url.to_string())
            .or_default()
            .extend(selectors.iter().map(|s| s.to_string()));
    }

    fn present(&self, selector: &str) -> bool {
        self.elements
            .get(&self.url)
            .is_some_and(|set| set.contains(selector))
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.navigations.push(url.to_string());

        if state.always_fail.contains(url) {
            return Err(BrowserError::navigation(url, "net::ERR_CONNECTION_RESET"));
        }
        if let Some(remaining) = state.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::navigation(url, "net::ERR_TIMED_OUT"));
            }
        }

        let landed = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.url = landed;

        if let Some(cookies) = state.cookies_after.get(url).cloned() {
            state.cookies = cookies;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.state().url.clone())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>, BrowserError> {
        Ok(self.state().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.injected.extend(cookies.iter().cloned());
        state.cookies.extend(cookies.iter().cloned());
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.cookies.clear();
        state.clears += 1;
        Ok(())
    }

    async fn set_request_blocking(&self, enabled: bool) -> Result<(), BrowserError> {
        self.state().blocking_calls.push(enabled);
        Ok(())
    }

    async fn scroll_by(&self, distance: u32) -> Result<(), BrowserError> {
        self.state().scrolls.push(distance);
        Ok(())
    }

    async fn page_height(&self) -> Result<u64, BrowserError> {
        let mut state = self.state();
        if let Some(h) = state.heights.pop_front() {
            state.last_height = h;
        }
        Ok(state.last_height)
    }

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.state().present(selector))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        if self.state().present(selector) {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(BrowserError::Timeout(timeout))
    }

    async fn extract_posts(&self, _selectors: &PostSelectors) -> Result<Vec<RawPost>, BrowserError> {
        let mut state = self.state();
        if state.extract_fails {
            return Err(BrowserError::script("Execution context was destroyed"));
        }
        if let Some(posts) = state.posts.pop_front() {
            state.last_posts = posts;
        }
        Ok(state.last_posts.clone())
    }

    async fn close(&self) {
        self.state().closed = true;
    }
}
