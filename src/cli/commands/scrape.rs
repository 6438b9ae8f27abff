//! Scrape command: run the pipeline for one or more providers.

use console::style;

use crate::config::Settings;
use crate::currency::CurrencyTable;
use crate::ingest::IngestionWriter;
use crate::models::IngestReport;
use crate::repository::PlanStore;
use crate::scrapers::{create_scraper, supported_providers, PlanScraper};

/// Fixed country groups mirroring the staggered scrape schedule. An
/// out-of-range group number falls back to group 1.
const COUNTRY_GROUPS: &[&[&str]] = &[
    &["US", "CA", "GB", "DE", "FR", "ES"],
    &["IT", "JP", "AU", "NL", "CH", "SG"],
];

/// Scrape plans from one or more providers and save them to the store.
pub async fn cmd_scrape(
    settings: &Settings,
    providers: &[String],
    all: bool,
    country: Option<&str>,
    group: Option<u8>,
    http_only: bool,
) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} System not initialized. Run 'planscout init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let targets: Vec<String> = if all || providers.is_empty() {
        supported_providers()
            .iter()
            .map(|name| name.to_string())
            .collect()
    } else {
        providers.to_vec()
    };

    let country = country.map(|code| code.to_uppercase());

    let mut currency = CurrencyTable::default();
    if settings.live_rates {
        let client = reqwest::Client::new();
        currency.refresh_live(&client).await;
    }

    let store = PlanStore::new(&settings.database_path())?;

    for (i, name) in targets.iter().enumerate() {
        let Some(provider) = store.provider_by_name(name)? else {
            println!("{} Provider not found: {}", style("✗").red(), name);
            continue;
        };

        let mut scraper = match create_scraper(&store, name, settings, &currency, http_only) {
            Ok(Some(scraper)) => scraper,
            Ok(None) => {
                println!(
                    "{} Scraper not available for provider: {}",
                    style("!").yellow(),
                    name
                );
                continue;
            }
            Err(e) => {
                println!("{} {}", style("✗").red(), e);
                continue;
            }
        };

        println!("\n{} Scraping {}", style("→").cyan(), style(&provider.name).bold());

        if let Some(code) = country.as_deref() {
            match scraper.scrape_country(code).await {
                Ok(plans) => {
                    let report = IngestionWriter::new(&store, provider.id).save_plans(&plans);
                    print_report(&provider.name, &report);
                }
                Err(e) => {
                    println!("  {} {}: {}", style("✗").red(), code, e);
                }
            }
        } else if let Some(group) = group {
            scrape_group(&store, scraper.as_mut(), provider.id, group, settings).await;
        } else {
            match scraper.scrape_all_countries().await {
                Ok(plans) => {
                    let report = IngestionWriter::new(&store, provider.id).save_plans(&plans);
                    print_report(&provider.name, &report);
                }
                Err(e) => {
                    println!("  {} {}: {}", style("✗").red(), provider.name, e);
                }
            }
        }

        scraper.close().await;

        if i + 1 < targets.len() {
            tokio::time::sleep(settings.provider_delay()).await;
        }
    }

    Ok(())
}

/// Scrape a fixed country group, saving after each country so a crash
/// part-way through keeps the countries already written.
async fn scrape_group(
    store: &PlanStore,
    scraper: &mut dyn PlanScraper,
    provider_id: i64,
    group: u8,
    settings: &Settings,
) {
    let index = group_index(group);
    let countries = COUNTRY_GROUPS[index];

    let mut total_added = 0usize;
    for code in countries {
        match scraper.scrape_country(code).await {
            Ok(plans) if !plans.is_empty() => {
                let report = IngestionWriter::new(store, provider_id).save_plans(&plans);
                println!(
                    "  {} {}: {} plans saved",
                    style("✓").green(),
                    code,
                    report.plans_added
                );
                total_added += report.plans_added;
            }
            Ok(_) => {
                println!("  {} {}: no plans found", style("!").yellow(), code);
            }
            Err(e) => {
                println!("  {} {}: {}", style("✗").red(), code, e);
            }
        }
        tokio::time::sleep(settings.country_delay()).await;
    }

    println!(
        "  {} Group {}: {} plans saved across {} countries",
        style("✓").green(),
        index + 1,
        total_added,
        countries.len()
    );
}

/// Resolve a 1-based group number, falling back to group 1 when it is
/// outside the table.
fn group_index(group: u8) -> usize {
    (group as usize)
        .checked_sub(1)
        .filter(|index| *index < COUNTRY_GROUPS.len())
        .unwrap_or(0)
}

fn print_report(provider: &str, report: &IngestReport) {
    if report.success {
        println!(
            "  {} {}: {} plans found, {} saved",
            style("✓").green(),
            provider,
            report.plans_found,
            report.plans_added
        );
    } else {
        println!("  {} {}: save failed", style("✗").red(), provider);
    }
    for error in &report.errors {
        println!("    {} {}", style("!").yellow(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_groups_cover_the_core_twelve() {
        let all: Vec<&str> = COUNTRY_GROUPS.iter().flat_map(|g| g.iter().copied()).collect();
        assert_eq!(all.len(), 12);

        // No country appears in both groups
        for (i, code) in all.iter().enumerate() {
            assert!(!all[i + 1..].contains(code), "{} duplicated", code);
        }
        assert!(COUNTRY_GROUPS[0].contains(&"US"));
        assert!(COUNTRY_GROUPS[1].contains(&"JP"));
    }

    #[test]
    fn unknown_group_numbers_fall_back_to_group_one() {
        assert_eq!(group_index(1), 0);
        assert_eq!(group_index(2), 1);
        assert_eq!(group_index(0), 0);
        assert_eq!(group_index(3), 0);
        assert_eq!(group_index(255), 0);
    }
}
