//! Saily plan-card scraper.
//!
//! Saily renders a card list under `#plansSection` once its client code
//! runs, so after navigation the scraper polls for that section before
//! reading the page. Every labeled country gets an explicit URL slug;
//! unlisted codes fall back to `esim-{code}`.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::browser::BrowserSession;
use super::{plans_from_candidates, PlanScraper, Result, SETTLE_DELAY};
use crate::config::Settings;
use crate::currency::CurrencyTable;
use crate::extract::scan_plan_cards;
use crate::models::ScrapedPlan;

const BASE_URL: &str = "https://saily.com";

/// Countries swept by `scrape_all_countries`.
pub const COUNTRIES: &[&str] = &[
    "US", "CA", "GB", "DE", "FR", "ES", "IT", "JP", "AU", "NL", "TR", "TH", "SG",
];

/// Country code to Saily URL slug. Codes not listed fall back to
/// `esim-{code}` lowercased.
const COUNTRY_SLUGS: &[(&str, &str)] = &[
    ("US", "esim-united-states"),
    ("CA", "esim-canada"),
    ("GB", "esim-united-kingdom"),
    ("DE", "esim-germany"),
    ("FR", "esim-france"),
    ("ES", "esim-spain"),
    ("IT", "esim-italy"),
    ("NL", "esim-netherlands"),
    ("JP", "esim-japan"),
    ("AU", "esim-australia"),
    ("TR", "esim-turkey"),
    ("TH", "esim-thailand"),
    ("SG", "esim-singapore"),
    ("MX", "esim-mexico"),
    ("BR", "esim-brazil"),
    ("AR", "esim-argentina"),
    ("CL", "esim-chile"),
    ("CO", "esim-colombia"),
    ("PE", "esim-peru"),
    ("IN", "esim-india"),
    ("AE", "esim-united-arab-emirates"),
    ("ZA", "esim-south-africa"),
    ("EG", "esim-egypt"),
    ("KE", "esim-kenya"),
    ("MA", "esim-morocco"),
    ("PH", "esim-philippines"),
    ("VN", "esim-vietnam"),
    ("MY", "esim-malaysia"),
    ("KR", "esim-south-korea"),
    ("TW", "esim-taiwan"),
    ("HK", "esim-hong-kong"),
    ("NZ", "esim-new-zealand"),
    ("PT", "esim-portugal"),
    ("GR", "esim-greece"),
    ("PL", "esim-poland"),
    ("SE", "esim-sweden"),
    ("NO", "esim-norway"),
    ("DK", "esim-denmark"),
    ("FI", "esim-finland"),
    ("CH", "esim-switzerland"),
    ("AT", "esim-austria"),
    ("BE", "esim-belgium"),
    ("CZ", "esim-czech-republic"),
    ("IL", "esim-israel"),
    ("QA", "esim-qatar"),
    ("KW", "esim-kuwait"),
    ("BH", "esim-bahrain"),
    ("JO", "esim-jordan"),
];

/// Upper bound for the plan list to appear after navigation.
const PLANS_SECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra settle time when the plan list never showed up.
const SLOW_SETTLE_DELAY: Duration = Duration::from_secs(5);

fn country_slug(country_code: &str) -> String {
    COUNTRY_SLUGS
        .iter()
        .find(|(code, _)| *code == country_code)
        .map(|(_, slug)| (*slug).to_string())
        .unwrap_or_else(|| format!("esim-{}", country_code.to_lowercase()))
}

fn country_url(country_code: &str) -> String {
    // The trailing slash matters; without it Saily redirects.
    format!("{}/{}/", BASE_URL, country_slug(country_code))
}

/// Poll for the plans section until it appears or the deadline passes.
async fn wait_for_plans_section(page: &Page) -> bool {
    let deadline = tokio::time::Instant::now() + PLANS_SECTION_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if page.find_element("#plansSection").await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    false
}

pub struct SailyScraper {
    session: BrowserSession,
    currency: CurrencyTable,
    country_delay: Duration,
}

impl SailyScraper {
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

        debug!("Waiting for plan cards to load");
        if wait_for_plans_section(page).await {
            debug!("Plans section found");
            tokio::time::sleep(SETTLE_DELAY).await;
        } else {
            warn!("Plans section not found, continuing anyway");
            tokio::time::sleep(SLOW_SETTLE_DELAY).await;
        }

        let page_url = page.url().await?.unwrap_or_else(|| url.to_string());
        let html = page.content().await?;

        let candidates = scan_plan_cards(&html, &page_url, country_code);
        Ok(plans_from_candidates(candidates, country_code, &self.currency))
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
impl PlanScraper for SailyScraper {
    fn provider_name(&self) -> &'static str {
        "Saily"
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
