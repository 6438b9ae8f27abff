//! Scraper implementations for eSIM plan providers.

pub mod airalo;
pub mod airalo_http;
pub mod browser;
pub mod factory;
pub mod holafly;
mod http_client;
pub mod saily;

pub use airalo::AiraloScraper;
pub use airalo_http::AiraloHttpScraper;
pub use browser::{BrowserLocator, BrowserSession, FixedLocator, SystemLocator, WaitStrategy};
pub use factory::{create_scraper, supported_providers};
pub use holafly::HolaflyScraper;
pub use http_client::{FetchError, HttpClient};
pub use saily::SailyScraper;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::currency::CurrencyTable;
use crate::extract::PlanCandidate;
use crate::models::ScrapedPlan;

/// Pause after navigation before reading page content, so client-side
/// rendering can settle.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Pause after switching a pricing tab before re-reading the page.
pub const TAB_REFRESH_DELAY: Duration = Duration::from_secs(2);

/// Errors from the scraping layer.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No usable browser executable, or the process failed to start.
    #[error("{0}")]
    BrowserLaunch(String),

    /// Navigation failed under every wait strategy.
    #[error("{0}")]
    Navigation(String),

    /// A browser protocol call failed after navigation.
    #[error("Browser error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// An HTTP fetch gave up after its retry budget.
    #[error(transparent)]
    RetriesExhausted(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// A provider plan scraper.
///
/// One instance owns one provider's fetch resources, either a browser
/// session or an HTTP client, and lazily initializes them on first use.
/// Extraction failures for a single country are logged and yield an
/// empty list so a sweep keeps going; stored rows for that country are
/// left untouched by the ingest layer. An `Err` means the scraper itself
/// could not run at all.
#[async_trait]
pub trait PlanScraper: Send + Sync {
    /// Provider name as seeded in the providers table.
    fn provider_name(&self) -> &'static str;

    /// Scrape plans for one ISO 3166-1 alpha-2 country code.
    async fn scrape_country(&mut self, country_code: &str) -> Result<Vec<ScrapedPlan>>;

    /// Scrape every country this provider is configured for, pausing
    /// between countries.
    async fn scrape_all_countries(&mut self) -> Result<Vec<ScrapedPlan>>;

    /// Release held resources. Safe to call repeatedly.
    async fn close(&mut self);
}

/// Convert page-scan candidates into normalized plans for one country.
///
/// Prices already in USD pass through untouched; other currencies are
/// converted with the table's rates and rounded to cents. The original
/// price and currency are kept alongside the USD figure.
pub fn plans_from_candidates(
    candidates: Vec<PlanCandidate>,
    country_code: &str,
    currency: &CurrencyTable,
) -> Vec<ScrapedPlan> {
    candidates
        .into_iter()
        .map(|candidate| {
            let price_usd = if candidate.currency == "USD" {
                candidate.price
            } else {
                currency.normalize(candidate.price, candidate.currency)
            };
            ScrapedPlan {
                name: candidate.name,
                data: candidate.data,
                validity_days: candidate.validity_days,
                price_usd,
                currency: candidate.currency.to_string(),
                original_price: candidate.price,
                network_type: "4G/5G".to_string(),
                coverage_type: "National".to_string(),
                hotspot_allowed: true,
                voice_calls: false,
                sms_included: false,
                plan_url: candidate.url,
                country_code: country_code.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataAllowance;

    fn candidate(price: f64, currency: &'static str) -> PlanCandidate {
        PlanCandidate {
            name: "5GB - 30 Days".to_string(),
            data: DataAllowance::Metered(5.0),
            validity_days: 30,
            price,
            currency,
            url: "https://example.com/us-esim".to_string(),
        }
    }

    #[test]
    fn usd_prices_pass_through_unrounded() {
        let table = CurrencyTable::default();
        let plans = plans_from_candidates(vec![candidate(4.999, "USD")], "US", &table);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].price_usd, 4.999);
        assert_eq!(plans[0].original_price, 4.999);
        assert_eq!(plans[0].currency, "USD");
        assert_eq!(plans[0].country_code, "US");
    }

    #[test]
    fn foreign_prices_convert_and_round() {
        let table = CurrencyTable::default();
        let plans = plans_from_candidates(vec![candidate(10.0, "EUR")], "DE", &table);

        assert_eq!(plans[0].price_usd, 11.0);
        assert_eq!(plans[0].original_price, 10.0);
        assert_eq!(plans[0].currency, "EUR");
    }

    #[test]
    fn defaults_fill_the_catalog_fields() {
        let table = CurrencyTable::default();
        let plans = plans_from_candidates(vec![candidate(3.99, "USD")], "US", &table);

        assert_eq!(plans[0].network_type, "4G/5G");
        assert_eq!(plans[0].coverage_type, "National");
        assert!(plans[0].hotspot_allowed);
        assert!(!plans[0].voice_calls);
        assert!(!plans[0].sms_included);
    }
}
