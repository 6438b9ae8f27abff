//! Provider lookup and scraper construction.

use anyhow::{bail, Result};

use super::{AiraloHttpScraper, AiraloScraper, HolaflyScraper, PlanScraper, SailyScraper};
use crate::config::Settings;
use crate::currency::CurrencyTable;
use crate::repository::PlanStore;

/// Providers with a scraper implementation, in display order.
pub fn supported_providers() -> &'static [&'static str] {
    &["Airalo", "Saily", "Holafly"]
}

/// Build the scraper for a provider, verifying its row exists first.
///
/// Returns `Ok(None)` when the provider is seeded but has no scraper,
/// or when `http_only` is set and the provider only has a browser
/// scraper. An unknown provider name is an error.
pub fn create_scraper(
    store: &PlanStore,
    provider_name: &str,
    settings: &Settings,
    currency: &CurrencyTable,
    http_only: bool,
) -> Result<Option<Box<dyn PlanScraper>>> {
    let Some(provider) = store.provider_by_name(provider_name)? else {
        bail!("Provider not found: {}", provider_name);
    };

    let scraper: Option<Box<dyn PlanScraper>> = if http_only {
        match provider.name.to_lowercase().as_str() {
            "airalo" => Some(Box::new(AiraloHttpScraper::new(settings)?)),
            _ => None,
        }
    } else {
        match provider.name.to_lowercase().as_str() {
            "airalo" => Some(Box::new(AiraloScraper::new(settings, currency.clone()))),
            "saily" => Some(Box::new(SailyScraper::new(settings, currency.clone()))),
            "holafly" => Some(Box::new(HolaflyScraper::new(settings))),
            _ => None,
        }
    };

    Ok(scraper)
}
