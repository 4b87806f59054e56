//! Data models for postharvest.

mod record;
mod target;

pub use record::{RawPost, Record, PLACEHOLDER_TEXT};
pub use target::{load_targets, parse_targets, QueryTarget, TargetsError};
