//! The `merge` command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;

use crate::merge::{merge_archives, write_merged, FileStatus};

pub fn cmd_merge(inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    println!(
        "{} Checking {} archives before merging",
        style("→").cyan(),
        inputs.len()
    );

    let report = merge_archives(inputs);

    for file in &report.files {
        let marker = match file.status {
            FileStatus::Ok => style("✓").green(),
            FileStatus::Skipped => style("!").yellow(),
            FileStatus::Failed(_) => style("✗").red(),
        };
        println!(
            "  {} {} [{}]: {} ({})",
            marker,
            file.path.display(),
            file.year,
            file.count,
            file.status
        );
    }
    println!();
    println!("{:<28} {}", "Total from per-file counts:", report.counted());
    println!("{:<28} {}", "Total merged records:", report.total());

    write_merged(output, &report.records)
        .with_context(|| format!("Writing merged archive {}", output.display()))?;

    println!(
        "{} Wrote {} records sorted by date to {}",
        style("✓").green(),
        report.total(),
        output.display()
    );
    Ok(())
}
