//! Holafly unlimited-plan scraper.
//!
//! Holafly country pages ship their variant catalog inside serialized
//! island props rather than rendered markup, so plans are read from the
//! embedded payload after navigation instead of from the DOM. Only the
//! countries in the slug table are supported; anything else is skipped
//! with a warning.

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::{info, warn};

use super::browser::BrowserSession;
use super::{PlanScraper, Result, SETTLE_DELAY};
use crate::config::Settings;
use crate::extract::extract_unlimited_plans;
use crate::models::ScrapedPlan;

/// Country code to Holafly URL slug. Only these countries are scraped.
const COUNTRY_SLUGS: &[(&str, &str)] = &[
    ("US", "usa"),
    ("CA", "canada"),
    ("GB", "united-kingdom"),
    ("DE", "germany"),
    ("FR", "france"),
    ("ES", "spain"),
    ("IT", "italy"),
    ("JP", "japan"),
    ("AU", "australia"),
    ("NL", "netherlands"),
    ("CH", "switzerland"),
    ("SG", "singapore"),
];

fn country_slug(country_code: &str) -> Option<&'static str> {
    COUNTRY_SLUGS
        .iter()
        .find(|(code, _)| *code == country_code)
        .map(|(_, slug)| *slug)
}

fn country_url(slug: &str) -> String {
    format!("https://esim.holafly.com/esim-{}/", slug)
}

fn supported_list() -> String {
    COUNTRY_SLUGS
        .iter()
        .map(|(code, _)| *code)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct HolaflyScraper {
    session: BrowserSession,
    country_delay: std::time::Duration,
}

impl HolaflyScraper {
    pub fn new(settings: &Settings) -> Self {
        Self {
            session: BrowserSession::from_settings(settings),
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

        let page_url = page
            .url()
            .await?
            .unwrap_or_else(|| url.to_string());
        let html = page.content().await?;

        Ok(extract_unlimited_plans(&html, country_code, &page_url))
    }
}

#[async_trait]
impl PlanScraper for HolaflyScraper {
    fn provider_name(&self) -> &'static str {
        "Holafly"
    }

    async fn scrape_country(&mut self, country_code: &str) -> Result<Vec<ScrapedPlan>> {
        let Some(slug) = country_slug(country_code) else {
            warn!(
                "Country {} is not in the supported list ({}), skipping",
                country_code,
                supported_list()
            );
            return Ok(Vec::new());
        };

        self.session.initialize().await?;

        let url = country_url(slug);
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
        info!(
            "Scraping all {} supported countries",
            COUNTRY_SLUGS.len()
        );

        let mut all_plans = Vec::new();
        for (country_code, _) in COUNTRY_SLUGS {
            all_plans.extend(self.scrape_country(country_code).await?);
            tokio::time::sleep(self.country_delay).await;
        }
        Ok(all_plans)
    }

    async fn close(&mut self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_cover_the_tracked_countries() {
        assert_eq!(COUNTRY_SLUGS.len(), 12);
        assert_eq!(country_slug("US"), Some("usa"));
        assert_eq!(country_slug("GB"), Some("united-kingdom"));
        assert_eq!(country_slug("CH"), Some("switzerland"));
        assert_eq!(country_slug("BR"), None);
    }

    #[test]
    fn urls_carry_the_esim_prefix_and_trailing_slash() {
        assert_eq!(country_url("usa"), "https://esim.holafly.com/esim-usa/");
        assert_eq!(
            country_url("united-kingdom"),
            "https://esim.holafly.com/esim-united-kingdom/"
        );
    }

    #[test]
    fn supported_list_reads_as_a_comma_separated_line() {
        let list = supported_list();
        assert!(list.starts_with("US, CA, GB"));
        assert!(list.ends_with("CH, SG"));
    }
}
