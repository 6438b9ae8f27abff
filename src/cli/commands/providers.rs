//! Provider listing command.

use console::style;

use crate::config::Settings;
use crate::repository::PlanStore;
use crate::scrapers::supported_providers;

/// List known providers, their plan counts, and whether a scraper is wired.
pub fn cmd_providers(settings: &Settings) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} System not initialized. Run 'planscout init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let store = PlanStore::new(&settings.database_path())?;
    let providers = store.providers()?;

    if providers.is_empty() {
        println!(
            "{} No providers seeded. Run 'planscout init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Providers").bold());
    println!("{}", "-".repeat(72));
    println!("{:<10} {:<36} {:>8}  Scraper", "Name", "Website", "Plans");
    println!("{}", "-".repeat(72));

    for provider in &providers {
        let plan_count = store.count_plans(provider.id, None)?;
        let wired = supported_providers()
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&provider.name));

        println!(
            "{:<10} {:<36} {:>8}  {}",
            provider.name,
            provider.website_url.as_deref().unwrap_or("-"),
            plan_count,
            if wired { "yes" } else { "-" }
        );
    }
    println!("{}", "-".repeat(72));

    Ok(())
}
