//! Snapshot export/import and storage usage command handlers

use crate::error::Result;
use crate::history::{export_all, import_all, ConversationRepository};
use crate::store::BlobStore;
use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Handle the export command
///
/// Serializes the full store as a pretty-printed snapshot document,
/// written to `output` or to stdout.
pub fn handle_export<S: BlobStore>(
    repository: &ConversationRepository<S>,
    output: Option<PathBuf>,
) -> Result<()> {
    let snapshot = export_all(repository);
    let json = serde_json::to_string_pretty(&snapshot)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
            println!(
                "{}",
                format!(
                    "Exported {} conversation(s) to {}",
                    snapshot.conversations.len(),
                    path.display()
                )
                .green()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Handle the import command
///
/// Reads a snapshot file and merges it into the store, reporting
/// per-record failures without aborting the rest of the import.
pub fn handle_import<S: BlobStore>(
    repository: &mut ConversationRepository<S>,
    file: &Path,
) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read snapshot from {}", file.display()))?;

    let report = import_all(repository, &raw)?;

    println!(
        "{}",
        format!("Imported {} conversation(s).", report.imported).green()
    );
    if !report.errors.is_empty() {
        println!(
            "{}",
            format!("{} record(s) were skipped:", report.errors.len()).yellow()
        );
        for error in &report.errors {
            println!("  {}", error.yellow());
        }
    }

    Ok(())
}

/// Handle the usage command
///
/// Prints byte usage against the configured quota with a simple bar.
pub fn handle_usage<S: BlobStore>(repository: &ConversationRepository<S>) -> Result<()> {
    let usage = repository.usage();

    let filled = ((usage.percentage_used / 100.0) * 30.0).round() as usize;
    let bar: String = "#".repeat(filled.min(30)) + &"-".repeat(30usize.saturating_sub(filled));

    println!();
    println!("Storage usage:");
    println!(
        "  [{}] {:.1}%",
        if usage.percentage_used >= 90.0 {
            bar.red()
        } else {
            bar.green()
        },
        usage.percentage_used
    );
    println!(
        "  {} of {} bytes, {} conversation(s) stored",
        usage.used_bytes,
        usage.capacity_bytes,
        repository.len()
    );
    println!();

    Ok(())
}
