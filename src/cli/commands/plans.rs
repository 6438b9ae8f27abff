//! Stored-plan listing command.

use console::style;

use crate::config::Settings;
use crate::repository::PlanStore;

/// List stored plans for a country, cheapest first.
pub fn cmd_plans(
    settings: &Settings,
    country_code: &str,
    provider: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} System not initialized. Run 'planscout init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let store = PlanStore::new(&settings.database_path())?;
    let code = country_code.to_uppercase();
    let plans = store.plans_for_country(&code, provider, limit)?;

    if plans.is_empty() {
        println!(
            "{} No plans stored for {}. Run 'planscout scrape' first.",
            style("!").yellow(),
            code
        );
        return Ok(());
    }

    println!("\n{}", style(format!("Plans for {}", code)).bold());
    println!("{}", "-".repeat(78));
    println!(
        "{:<10} {:<32} {:>10} {:>6} {:>9}",
        "Provider", "Plan", "Data", "Days", "Price"
    );
    println!("{}", "-".repeat(78));

    for plan in &plans {
        println!(
            "{:<10} {:<32} {:>10} {:>6} {:>9}",
            plan.provider_name,
            truncate(&plan.name, 31),
            plan.data.label(),
            plan.validity_days,
            format!("${:.2}", plan.price_usd)
        );
    }
    println!("{}", "-".repeat(78));
    println!("{} plans, cheapest first", plans.len());

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
