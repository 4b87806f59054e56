//! The `collect` command: log in, paginate every target, save the archive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::archive::{load_archive, save_archive};
use crate::auth::{AuthError, AuthMethod, Authenticator};
use crate::browser::{Browser, BrowserEngineConfig};
use crate::cli::helpers::{format_duration, resolve_targets};
use crate::collector::{Collector, DedupStore, RunSummary, TargetOutcome};
use crate::config::Config;
use crate::navigator::Navigator;
use crate::pacing::ThreadRandom;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Targets file (overrides config)
    #[arg(short, long)]
    targets: Option<PathBuf>,

    /// Collect a single search URL instead of the targets file (repeatable)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Archive to seed from and write to (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Time budget for the whole run in minutes (overrides config)
    #[arg(long)]
    budget_minutes: Option<u64>,

    /// Run the browser headless (manual login will not be possible)
    #[arg(long)]
    headless: bool,

    /// Do not block images, stylesheets and fonts during login
    #[arg(long)]
    no_block: bool,
}

pub async fn cmd_collect(config: &Config, args: CollectArgs) -> anyhow::Result<()> {
    let targets_file = args.targets.clone().or_else(|| config.targets_path());
    let targets = resolve_targets(&args.urls, targets_file.as_deref())?;
    let archive_path = args.output.clone().unwrap_or_else(|| config.archive_path());

    let mut collection = config.collection.clone();
    if let Some(minutes) = args.budget_minutes {
        collection.time_budget = std::time::Duration::from_secs(minutes * 60);
    }

    // A corrupt archive would be overwritten on save, so refuse to start
    let prior = load_archive(&archive_path)
        .with_context(|| format!("Refusing to collect into {}", archive_path.display()))?;
    let mut store = DedupStore::new();
    let seeded = store.seed(prior);
    println!(
        "{} {} targets, {} records already in {}",
        style("→").cyan(),
        targets.len(),
        seeded,
        archive_path.display()
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_watcher(cancel.clone());

    let mut browser_config = config.browser.clone();
    browser_config.headless |= args.headless;
    let browser = launch_browser(&browser_config).await?;
    let mut navigator = Navigator::new(browser.clone(), config.navigation, cancel.clone());

    let block = config.block_resources && !args.no_block;
    if block {
        navigator
            .set_resource_blocking(true)
            .await
            .context("Enabling resource blocking")?;
    }

    let sessions = SessionStore::new(config.session_path());
    let auth = Authenticator::new(&navigator, &sessions, &config.auth, config.session.max_age())
        .authenticate()
        .await;

    match auth {
        Ok(AuthMethod::Session) => {
            println!("{} Logged in with saved session", style("✓").green());
        }
        Ok(AuthMethod::Manual { endpoint }) => {
            println!("{} Logged in manually at {}", style("✓").green(), endpoint);
        }
        Err(AuthError::Cancelled) => {
            println!("{} Interrupted before collection started", style("!").yellow());
            browser.close().await;
            return Ok(());
        }
        Err(e) => {
            println!("{} Login failed, stopping", style("✗").red());
            browser.close().await;
            return Err(e.into());
        }
    }

    if block {
        if let Err(e) = navigator.set_resource_blocking(false).await {
            warn!("Failed to disable resource blocking: {}", e);
        }
    }

    let rng = ThreadRandom;
    let summary = Collector::new(&navigator, &collection, config.pacing, &rng)
        .run(&targets, &mut store)
        .await;

    // Save even when interrupted; the write is atomic
    let saved = save_archive(&archive_path, store.all());
    browser.close().await;
    saved.with_context(|| format!("Saving archive {}", archive_path.display()))?;

    print_summary(&summary, store.len(), &archive_path);
    Ok(())
}

fn spawn_interrupt_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, saving collected records and shutting down");
            cancel.cancel();
        }
    });
}

#[cfg(feature = "browser")]
async fn launch_browser(config: &BrowserEngineConfig) -> anyhow::Result<Arc<dyn Browser>> {
    let browser = crate::browser::ChromiumBrowser::launch(config, &ThreadRandom)
        .await
        .context("Launching browser")?;
    Ok(Arc::new(browser))
}

#[cfg(not(feature = "browser"))]
async fn launch_browser(_config: &BrowserEngineConfig) -> anyhow::Result<Arc<dyn Browser>> {
    anyhow::bail!("harvest was built without the `browser` feature")
}

fn print_summary(summary: &RunSummary, total: usize, archive: &std::path::Path) {
    println!();
    for target in &summary.targets {
        let marker = match target.outcome {
            TargetOutcome::Exhausted | TargetOutcome::BudgetSpent => style("✓").green(),
            TargetOutcome::Skipped | TargetOutcome::Interrupted => style("!").yellow(),
            TargetOutcome::Failed(_) => style("✗").red(),
        };
        println!(
            "{} {:<30} {:>6} new  {:>4} passes  {}",
            marker,
            target.label,
            target.admitted,
            target.iterations,
            style(&target.outcome).dim()
        );
    }
    println!();
    println!(
        "{} {} new records, {} total in {} ({})",
        style("✓").green(),
        summary.admitted,
        total,
        archive.display(),
        format_duration(summary.elapsed)
    );
    if summary.interrupted {
        println!("{} Run was interrupted", style("!").yellow());
    }
    if summary.failed() > 0 {
        println!("{} {} targets failed", style("!").yellow(), summary.failed());
    }
}
