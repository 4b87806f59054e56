//! Scroll-driven collection over query targets.
//!
//! Each target is loaded once and then scrolled until the page stops
//! growing, the shared time budget runs out, or the run is cancelled.
//! Every pass snapshots all rendered posts and admits them into the
//! [`DedupStore`], so repeated extraction of the same posts is harmless.

mod budget;
mod dedup;
mod stall;

pub use budget::TimeBudget;
pub use dedup::DedupStore;
pub use stall::StallDetector;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, PostSelectors};
use crate::models::{QueryTarget, Record};
use crate::navigator::{secs, sleep_or_cancel, NavigationError, Navigator};
use crate::pacing::{Pacer, PacingConfig, RandomSource};

/// Settings for the pagination loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Total time for the whole run, shared by all targets.
    #[serde(with = "secs")]
    pub time_budget: Duration,
    /// Wait after each target page load.
    #[serde(with = "secs")]
    pub settle: Duration,
    /// How long to wait for the first post container.
    #[serde(with = "secs")]
    pub content_wait: Duration,
    /// Consecutive non-growing scrolls tolerated before a target ends.
    pub stall_limit: u32,
    pub selectors: PostSelectors,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(2 * 60 * 60),
            settle: Duration::from_secs(5),
            content_wait: Duration::from_secs(15),
            stall_limit: 3,
            selectors: PostSelectors::default(),
        }
    }
}

#[derive(Debug, Error)]
enum TargetError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The page stopped growing.
    Exhausted,
    /// The run's time budget ran out while on this target.
    BudgetSpent,
    /// Never started because the budget was already spent.
    Skipped,
    Interrupted,
    Failed(String),
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "end of results"),
            Self::BudgetSpent => write!(f, "time budget spent"),
            Self::Skipped => write!(f, "skipped"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetReport {
    pub label: String,
    pub url: String,
    pub outcome: TargetOutcome,
    /// Scroll passes completed.
    pub iterations: u32,
    /// Records new to the store.
    pub admitted: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub targets: Vec<TargetReport>,
    pub admitted: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, TargetOutcome::Failed(_)))
            .count()
    }
}

/// Per-target progress, kept so partial work survives an error.
#[derive(Default)]
struct Progress {
    iterations: u32,
    admitted: usize,
}

pub struct Collector<'a> {
    navigator: &'a Navigator,
    config: &'a CollectionConfig,
    pacer: Pacer<'a>,
}

impl<'a> Collector<'a> {
    pub fn new(
        navigator: &'a Navigator,
        config: &'a CollectionConfig,
        pacing: PacingConfig,
        rng: &'a dyn RandomSource,
    ) -> Self {
        Self {
            navigator,
            config,
            pacer: Pacer::new(pacing, rng),
        }
    }

    /// Collect every target in order into `store`.
    pub async fn run(&self, targets: &[QueryTarget], store: &mut DedupStore) -> RunSummary {
        let budget = TimeBudget::start(self.config.time_budget);
        let mut summary = RunSummary::default();

        for target in targets {
            if self.navigator.cancel_token().is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let name = target.display_name().to_string();
            if budget.is_exhausted() {
                info!("Time budget spent, skipping {}", name);
                summary.targets.push(TargetReport {
                    label: name,
                    url: target.url.clone(),
                    outcome: TargetOutcome::Skipped,
                    iterations: 0,
                    admitted: 0,
                });
                continue;
            }

            info!("Collecting {} ({:?} of budget left)", name, budget.remaining());
            let mut progress = Progress::default();
            let outcome = match self.collect_target(target, &budget, store, &mut progress).await {
                Ok(outcome) => outcome,
                Err(TargetError::Cancelled)
                | Err(TargetError::Navigation(NavigationError::Cancelled)) => {
                    TargetOutcome::Interrupted
                }
                Err(e) => {
                    warn!("Target {} failed: {}", name, e);
                    TargetOutcome::Failed(e.to_string())
                }
            };

            info!(
                "{}: {} new records in {} passes ({})",
                name, progress.admitted, progress.iterations, outcome
            );
            summary.admitted += progress.admitted;
            let interrupted = outcome == TargetOutcome::Interrupted;
            summary.targets.push(TargetReport {
                label: name,
                url: target.url.clone(),
                outcome,
                iterations: progress.iterations,
                admitted: progress.admitted,
            });
            if interrupted {
                summary.interrupted = true;
                break;
            }
        }

        summary.elapsed = budget.elapsed();
        summary
    }

    async fn collect_target(
        &self,
        target: &QueryTarget,
        budget: &TimeBudget,
        store: &mut DedupStore,
        progress: &mut Progress,
    ) -> Result<TargetOutcome, TargetError> {
        let browser = self.navigator.browser();
        let cancel = self.navigator.cancel_token();
        let selectors = &self.config.selectors;

        self.navigator.goto(&target.url).await?;
        if !sleep_or_cancel(cancel, self.config.settle).await {
            return Err(TargetError::Cancelled);
        }

        let appeared = tokio::select! {
            _ = cancel.cancelled() => return Err(TargetError::Cancelled),
            r = browser.wait_for_selector(&selectors.container, self.config.content_wait) => r,
        };
        if let Err(e) = appeared {
            warn!(
                "No post content on {} ({}); continuing with an empty page",
                target.url, e
            );
        }

        let mut stall = StallDetector::new(browser.page_height().await?, self.config.stall_limit);

        loop {
            if cancel.is_cancelled() {
                return Err(TargetError::Cancelled);
            }
            if budget.is_exhausted() {
                return Ok(TargetOutcome::BudgetSpent);
            }

            let raw = browser.extract_posts(selectors).await?;
            let mut fresh = 0;
            for record in raw.iter().filter_map(Record::from_raw) {
                if store.admit(record) {
                    fresh += 1;
                }
            }
            progress.admitted += fresh;
            progress.iterations += 1;
            debug!(
                "Pass {}: {} rendered, {} new, {} total",
                progress.iterations,
                raw.len(),
                fresh,
                store.len()
            );

            browser.scroll_by(self.pacer.scroll_offset()).await?;
            if !sleep_or_cancel(cancel, self.pacer.settle_delay()).await {
                return Err(TargetError::Cancelled);
            }

            let height = browser.page_height().await?;
            if stall.observe(height) {
                debug!("Page height stuck at {}, ending target", height);
                return Ok(TargetOutcome::Exhausted);
            }
            if stall.stalls() > 0 {
                debug!("Page did not grow ({} in a row)", stall.stalls());
            }
        }
    }
}
