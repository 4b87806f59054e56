//! postharvest - incremental post harvesting from JavaScript-rendered
//! search pages.
//!
//! A run replays (or interactively re-creates) a login session, then
//! scrolls each configured search page until it stops growing, merging
//! everything it sees into a text-deduplicated archive. Archives from
//! separate runs are consolidated later with [`merge::merge_archives`].

pub mod archive;
pub mod auth;
pub mod browser;
pub mod cli;
pub mod collector;
pub mod config;
pub mod merge;
pub mod models;
pub mod navigator;
pub mod pacing;
pub mod session;
