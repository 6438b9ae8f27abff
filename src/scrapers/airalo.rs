//! Airalo catalog scraper.
//!
//! Airalo country pages render plan tiles as anchors whose URLs carry
//! the data amount and validity, so plans are scanned out of the
//! rendered DOM. Unlimited plans live behind a separate pricing tab;
//! the scraper clicks it with injected JS and scans the page a second
//! time, merging both passes.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::browser::BrowserSession;
use super::{plans_from_candidates, PlanScraper, Result, SETTLE_DELAY, TAB_REFRESH_DELAY};
use crate::config::Settings;
use crate::currency::CurrencyTable;
use crate::extract::scan_plan_links;
use crate::models::ScrapedPlan;

const BASE_URL: &str = "https://www.airalo.com";

/// Countries swept by `scrape_all_countries`.
pub const COUNTRIES: &[&str] = &[
    "US", "CA", "GB", "DE", "FR", "JP", "AU", "ES", "IT", "NL", "TR", "TH", "CN", "ID", "SG",
    "IE", "OM", "SA",
];

/// Country code to Airalo URL slug. Codes not listed fall back to
/// `{code}-esim` lowercased.
const COUNTRY_SLUGS: &[(&str, &str)] = &[
    ("CN", "china-esim"),
    ("US", "united-states-esim"),
    ("CA", "canada-esim"),
    ("GB", "united-kingdom-esim"),
    ("DE", "germany-esim"),
    ("FR", "france-esim"),
    ("JP", "japan-esim"),
    ("AU", "australia-esim"),
    ("ES", "spain-esim"),
    ("IT", "italy-esim"),
    ("NL", "netherlands-esim"),
    ("TR", "turkey-esim"),
    ("TH", "thailand-esim"),
    ("ID", "indonesia-esim"),
    ("SG", "singapore-esim"),
    ("IE", "ireland-esim"),
    ("OM", "oman-esim"),
    ("SA", "saudi-arabia-esim"),
    ("MX", "mexico-esim"),
    ("BR", "brazil-esim"),
    ("AR", "argentina-esim"),
    ("CL", "chile-esim"),
    ("CO", "colombia-esim"),
    ("PE", "peru-esim"),
    ("IN", "india-esim"),
    ("AE", "united-arab-emirates-esim"),
    ("ZA", "south-africa-esim"),
    ("EG", "egypt-esim"),
    ("KE", "kenya-esim"),
    ("MA", "morocco-esim"),
    ("PH", "philippines-esim"),
    ("VN", "vietnam-esim"),
    ("MY", "malaysia-esim"),
    ("KR", "south-korea-esim"),
    ("TW", "taiwan-esim"),
    ("HK", "hong-kong-esim"),
    ("NZ", "new-zealand-esim"),
    ("PT", "portugal-esim"),
    ("GR", "greece-esim"),
    ("PL", "poland-esim"),
    ("SE", "sweden-esim"),
    ("NO", "norway-esim"),
    ("DK", "denmark-esim"),
    ("FI", "finland-esim"),
    ("CH", "switzerland-esim"),
    ("AT", "austria-esim"),
    ("BE", "belgium-esim"),
    ("CZ", "czech-republic-esim"),
    ("IL", "israel-esim"),
    ("QA", "qatar-esim"),
    ("KW", "kuwait-esim"),
    ("BH", "bahrain-esim"),
    ("JO", "jordan-esim"),
];

/// Clicks the Unlimited pricing tab when one exists. Resolves to true
/// when a tab was found and clicked.
const UNLIMITED_TAB_SCRIPT: &str = r#"
(() => {
    const tabs = Array.from(document.querySelectorAll('button, [role="tab"]'));
    const unlimitedTab = tabs.find(tab =>
        tab.textContent && tab.textContent.toLowerCase().includes('unlimited')
    );
    if (unlimitedTab) {
        unlimitedTab.click();
        return true;
    }
    return false;
})()
"#;

fn country_slug(country_code: &str) -> String {
    COUNTRY_SLUGS
        .iter()
        .find(|(code, _)| *code == country_code)
        .map(|(_, slug)| (*slug).to_string())
        .unwrap_or_else(|| format!("{}-esim", country_code.to_lowercase()))
}

fn country_url(country_code: &str) -> String {
    format!("{}/{}", BASE_URL, country_slug(country_code))
}

pub struct AiraloScraper {
    session: BrowserSession,
    currency: CurrencyTable,
    country_delay: Duration,
}

impl AiraloScraper {
    pub fn new(settings: &Settings, currency: CurrencyTable) -> Self {
        Self {
            session: BrowserSession::from_settings(settings),
            currency,
            country_delay: settings.country_delay(),
        }
    }

    async fn extract_plans(
        &self,
        page: &Page,
        country_code: &str,
        url: &str,
    ) -> Result<Vec<ScrapedPlan>> {
        self.session.navigate(page, url).await?;
        tokio::time::sleep(SETTLE_DELAY).await;

        let page_url = page.url().await?.unwrap_or_else(|| url.to_string());

        debug!("Extracting standard plans for {}", country_code);
        let html = page.content().await?;
        let scan = scan_plan_links(&html, &page_url, false);
        let mut candidates = scan.plans;

        match self.click_unlimited_tab(page).await {
            Ok(true) => {
                info!("Found unlimited tab, extracting unlimited plans");
                tokio::time::sleep(TAB_REFRESH_DELAY).await;

                let html = page.content().await?;
                let unlimited = scan_plan_links(&html, &page_url, true);
                info!("Found {} unlimited plans", unlimited.plans.len());
                candidates.extend(unlimited.plans);
            }
            Ok(false) => {}
            Err(e) => debug!("No unlimited tab found or error clicking it: {}", e),
        }

        Ok(plans_from_candidates(candidates, country_code, &self.currency))
    }

    async fn click_unlimited_tab(&self, page: &Page) -> Result<bool> {
        let clicked = page
            .evaluate(UNLIMITED_TAB_SCRIPT)
            .await?
            .into_value::<bool>()
            .unwrap_or(false);
        Ok(clicked)
    }

    async fn sweep_countries(&mut self) -> Result<Vec<ScrapedPlan>> {
        self.session.initialize().await?;

        let mut all_plans = Vec::new();
        for country_code in COUNTRIES {
            info!("Processing country: {}", country_code);
            all_plans.extend(self.scrape_country(country_code).await?);
            tokio::time::sleep(self.country_delay).await;
        }
        Ok(all_plans)
    }
}

#[async_trait]
impl PlanScraper for AiraloScraper {
    fn provider_name(&self) -> &'static str {
        "Airalo"
    }

    async fn scrape_country(&mut self, country_code: &str) -> Result<Vec<ScrapedPlan>> {
        self.session.initialize().await?;

        let url = country_url(country_code);
        info!("Scraping {}: {}", country_code, url);

        let page = self.session.new_page().await?;
        let result = self.extract_plans(&page, country_code, &url).await;
        let _ = page.close().await;

        match result {
            Ok(plans) => {
                info!("Found {} plans for {}", plans.len(), country_code);
                Ok(plans)
            }
            Err(e) => {
                // Stale rows for this country stay in the store untouched.
                warn!("Error scraping {}: {}", country_code, e);
                Ok(Vec::new())
            }
        }
    }

    async fn scrape_all_countries(&mut self) -> Result<Vec<ScrapedPlan>> {
        let result = self.sweep_countries().await;
        self.close().await;
        result
    }

    async fn close(&mut self) {
        self.session.close().await;
    }
}
