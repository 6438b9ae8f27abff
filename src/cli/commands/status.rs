//! Status command: recent scrape runs and a 24h summary.

use chrono::{Local, Utc};
use console::style;

use crate::config::Settings;
use crate::repository::PlanStore;

/// Show recent scrape runs plus aggregate counts for the last 24 hours.
pub fn cmd_status(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} System not initialized. Run 'planscout init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let store = PlanStore::new(&settings.database_path())?;
    let summary = store.run_summary_since(Utc::now() - chrono::Duration::hours(24))?;
    let runs = store.recent_runs(limit)?;

    let separator = "─".repeat(78);

    println!();
    println!(
        "{:<50} Last updated: {}",
        style("planscout status").bold(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}", separator);
    println!("Database: {}", settings.database_path().display());
    println!();

    println!("{}", style("LAST 24 HOURS").cyan().bold());
    println!("  {:<12} {:>6}", "Runs:", summary.total_runs);
    println!("  {:<12} {:>6}", "Completed:", summary.successful);
    println!("  {:<12} {:>6}", "Failed:", summary.failed);
    println!("  {:<12} {:>6}", "Running:", summary.running);
    println!();

    if runs.is_empty() {
        println!("No scrape runs recorded yet.");
        return Ok(());
    }

    println!("{}", style("RECENT RUNS").cyan().bold());
    println!(
        "  {:<17} {:<10} {:<10} {:>6} {:>6}  Duration",
        "Started", "Provider", "Status", "Found", "Added"
    );
    for (run, provider_name) in &runs {
        let duration = run
            .duration()
            .map(|d| format!("{}s", d.num_seconds()))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<17} {:<10} {:<10} {:>6} {:>6}  {}",
            run.started_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            provider_name,
            run.status.as_str(),
            run.plans_found,
            run.plans_added,
            duration
        );
        if let Some(error) = &run.error_message {
            println!("      {} {}", style("!").yellow(), truncate(error, 68));
        }
    }
    println!("{}", separator);

    Ok(())
}

/// Truncate a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
