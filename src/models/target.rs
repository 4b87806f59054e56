//! Query targets: the search scopes a run paginates through.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One search scope (keyword or hashtag, language, date range, sort mode)
/// expressed as the search page URL plus a human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTarget {
    pub url: String,
    #[serde(default)]
    pub label: String,
}

impl QueryTarget {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }

    /// Label for log lines, falling back to the URL.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.url
        } else {
            &self.label
        }
    }
}

/// On-disk layout of a targets file:
///
/// ```toml
/// [[target]]
/// url = "https://x.com/search?q=BBRI%20lang%3Aid&f=live"
/// label = "BBRI latest"
/// ```
#[derive(Debug, Default, Deserialize)]
struct TargetsFile {
    #[serde(default, rename = "target")]
    targets: Vec<QueryTarget>,
}

/// Errors loading a targets file.
#[derive(Debug, thiserror::Error)]
pub enum TargetsError {
    #[error("failed to read targets file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse targets file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("target #{index} in {path} has an empty url")]
    EmptyUrl { path: String, index: usize },
}

/// Parse targets from TOML text, preserving declaration order.
pub fn parse_targets(contents: &str, origin: &str) -> Result<Vec<QueryTarget>, TargetsError> {
    let file: TargetsFile = toml::from_str(contents).map_err(|source| TargetsError::Parse {
        path: origin.to_string(),
        source,
    })?;

    for (index, target) in file.targets.iter().enumerate() {
        if target.url.trim().is_empty() {
            return Err(TargetsError::EmptyUrl {
                path: origin.to_string(),
                index: index + 1,
            });
        }
    }

    Ok(file.targets)
}

/// Load the ordered target list from a file.
pub fn load_targets(path: &Path) -> Result<Vec<QueryTarget>, TargetsError> {
    let origin = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| TargetsError::Read {
        path: origin.clone(),
        source,
    })?;
    parse_targets(&contents, &origin)
}
