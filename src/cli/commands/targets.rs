//! The `targets` command.

use std::path::Path;

use console::style;

use crate::cli::helpers::resolve_targets;
use crate::config::Config;

pub fn cmd_targets(config: &Config, file: Option<&Path>) -> anyhow::Result<()> {
    let path = file.map(Path::to_path_buf).or_else(|| config.targets_path());
    let targets = resolve_targets(&[], path.as_deref())?;

    if targets.is_empty() {
        println!("{} No targets defined", style("!").yellow());
        return Ok(());
    }

    for (i, target) in targets.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            i + 1,
            style(target.display_name()).bold(),
            style(&target.url).dim()
        );
    }
    Ok(())
}
