//! Shared helper functions for CLI commands.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::models::{load_targets, QueryTarget};

/// Format a duration as `1h 05m`, `4m 12s` or `9s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Targets from `--url` flags, or else from the targets file.
pub fn resolve_targets(urls: &[String], file: Option<&Path>) -> anyhow::Result<Vec<QueryTarget>> {
    if !urls.is_empty() {
        return Ok(urls.iter().map(|u| QueryTarget::new(u.as_str(), "")).collect());
    }
    let Some(path) = file else {
        anyhow::bail!("No query targets: pass --url or set paths.targets in the config");
    };
    load_targets(path).with_context(|| format!("Loading targets from {}", path.display()))
}
