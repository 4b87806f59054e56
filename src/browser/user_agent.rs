//! User agent selection for the browsing context.

use crate::pacing::RandomSource;

/// Desktop user agents the browser rotates through.
pub const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Pick a user agent from the pool.
pub fn random_user_agent(rng: &dyn RandomSource) -> &'static str {
    let idx = rng.next_in_range(0, DESKTOP_USER_AGENTS.len() as u64) as usize;
    DESKTOP_USER_AGENTS[idx.min(DESKTOP_USER_AGENTS.len() - 1)]
}

/// Resolve the configured user agent.
/// - None => random entry from the pool
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>, rng: &dyn RandomSource) -> String {
    match config {
        None => random_user_agent(rng).to_string(),
        Some(custom) => custom.to_string(),
    }
}
