//! Saved session management commands.

use console::style;

use crate::cli::helpers::format_duration;
use crate::config::Config;
use crate::session::SessionStore;

/// Show where the session lives, how old it is and whether it will be reused.
pub fn cmd_session_status(config: &Config) -> anyhow::Result<()> {
    let store = SessionStore::new(config.session_path());
    let max_age = config.session.max_age();

    println!("{}", style("Session").bold());
    println!("{}", "-".repeat(40));
    println!("{:<12} {}", "File:", store.path().display());

    let Some(age) = store.age()? else {
        println!(
            "{:<12} {}",
            "Status:",
            style("none (manual login on next run)").dim()
        );
        return Ok(());
    };

    let cookies = match store.load() {
        Ok(Some(artifact)) => artifact.cookies.len().to_string(),
        Ok(None) => "0".to_string(),
        Err(e) => style(format!("unreadable: {}", e)).red().to_string(),
    };
    println!("{:<12} {}", "Cookies:", cookies);
    println!("{:<12} {}", "Age:", format_duration(age));

    let status = if age > max_age {
        style(format!("expired (max {})", format_duration(max_age)))
            .yellow()
            .to_string()
    } else {
        style(format!(
            "valid for {}",
            format_duration(max_age.saturating_sub(age))
        ))
        .green()
        .to_string()
    };
    println!("{:<12} {}", "Status:", status);
    Ok(())
}

/// Delete the saved session file.
pub fn cmd_session_clear(config: &Config, confirm: bool) -> anyhow::Result<()> {
    let store = SessionStore::new(config.session_path());

    if !confirm {
        println!(
            "{} This will delete the saved session at {}.",
            style("!").yellow(),
            store.path().display()
        );
        println!("  The next run will require a manual login.");
        println!("  Use --confirm to proceed.");
        return Ok(());
    }

    if store.remove()? {
        println!(
            "{} Removed {}",
            style("✓").green(),
            store.path().display()
        );
    } else {
        println!("{} No saved session", style("!").yellow());
    }
    Ok(())
}
