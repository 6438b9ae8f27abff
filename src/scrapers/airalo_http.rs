//! Plain-HTTP Airalo scraper.
//!
//! A browserless fallback for environments without Chrome. It fetches
//! the country page over HTTP and pairs up price, data and validity
//! tokens positionally, which only works when the server returns enough
//! pre-rendered markup. Pages with fewer than five price tokens are
//! treated as JS-rendered and yield nothing rather than guesses.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use super::http_client::DEFAULT_MAX_RETRIES;
use super::{HttpClient, PlanScraper, Result};
use crate::config::Settings;
use crate::models::{DataAllowance, ScrapedPlan};

const BASE_URL: &str = "https://www.airalo.com";

/// Countries swept by `scrape_all_countries`.
const COUNTRIES: &[&str] = &[
    "US", "GB", "DE", "FR", "JP", "AU", "CA", "ES", "IT", "NL", "TR", "TH", "CN", "ID", "SG",
    "IE", "OM", "SA",
];

/// Country code to Airalo URL slug for fetching. Codes not listed fall
/// back to `{code}-esim` lowercased.
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
];

/// Fewer price tokens than this means the page came back JS-rendered.
const MIN_PRICE_MATCHES: usize = 5;

/// An "unlimited" marker this close to a price marks the plan unlimited.
const UNLIMITED_WINDOW: usize = 100;

/// Pause after each country fetch.
const REQUEST_DELAY: Duration = Duration::from_secs(2);

static PRICE_USD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$(\d+(?:\.\d+)?)\s*USD").unwrap());
static DATA_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)DATA\s+(\d+(?:\.\d+)?)\s*GB|(\d+(?:\.\d+)?)\s*GB").unwrap());
static VALIDITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)VALIDITY\s+(\d+)\s*Days?|(\d+)\s*Days?").unwrap());
static UNLIMITED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)unlimited").unwrap());
/// Inline plan sequence, for pages that render plans as running text.
static PLAN_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*GB.*?(\d+)\s*Days.*?\$(\d+(?:\.\d+)?)\s*USD").unwrap()
});

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

/// Public plan link carried on stored rows. Always the generic pattern,
/// independent of the slug used for fetching.
fn plan_url(country_code: &str) -> String {
    format!("{}/{}-esim", BASE_URL, country_code.to_lowercase())
}

/// Extract plans from pre-rendered markup by pairing the i-th price with
/// the i-th data and validity tokens. Missing tokens fall back to 1 GB
/// and 30 days.
pub fn parse_plans(html: &str, country_code: &str) -> Vec<ScrapedPlan> {
    let price_matches: Vec<(usize, f64)> = PRICE_USD
        .captures_iter(html)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let value = caps.get(1)?.as_str().parse().ok()?;
            Some((start, value))
        })
        .collect();

    let data_values: Vec<f64> = DATA_AMOUNT
        .captures_iter(html)
        .map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(1.0)
        })
        .collect();

    let validity_values: Vec<u32> = VALIDITY
        .captures_iter(html)
        .map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(30)
        })
        .collect();

    let unlimited_offsets: Vec<usize> = UNLIMITED.find_iter(html).map(|m| m.start()).collect();

    info!(
        "Found {} prices, {} data amounts, {} validity periods",
        price_matches.len(),
        data_values.len(),
        validity_values.len()
    );

    if price_matches.len() < MIN_PRICE_MATCHES {
        warn!(
            "Insufficient data extracted from HTML ({} prices) for {}",
            price_matches.len(),
            country_code
        );
        return Vec::new();
    }

    let mut plans = Vec::new();

    for (i, (price_start, price_usd)) in price_matches.iter().enumerate() {
        let mut data = DataAllowance::Metered(data_values.get(i).copied().unwrap_or(1.0));
        let validity_days = validity_values.get(i).copied().unwrap_or(30);

        if unlimited_offsets
            .iter()
            .any(|offset| offset.abs_diff(*price_start) < UNLIMITED_WINDOW)
        {
            data = DataAllowance::Unlimited;
        }

        if *price_usd <= 0.0 {
            continue;
        }

        plans.push(ScrapedPlan::new(
            format!("{} {} - {} Days", country_code, data.label(), validity_days),
            country_code,
            data,
            validity_days,
            *price_usd,
            plan_url(country_code),
        ));
    }

    if plans.is_empty() {
        for caps in PLAN_SEQUENCE.captures_iter(html) {
            let gb = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
            let days = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            let price = caps.get(3).and_then(|m| m.as_str().parse::<f64>().ok());
            let (Some(gb), Some(days), Some(price)) = (gb, days, price) else {
                continue;
            };

            let data = DataAllowance::Metered(gb);
            plans.push(ScrapedPlan::new(
                format!("{} {} - {} Days", country_code, data.label(), days),
                country_code,
                data,
                days,
                price,
                plan_url(country_code),
            ));
        }
    }

    plans
}

pub struct AiraloHttpScraper {
    client: HttpClient,
    country_delay: Duration,
}

impl AiraloHttpScraper {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(DEFAULT_MAX_RETRIES)?,
            country_delay: settings.country_delay(),
        })
    }

    async fn fetch_and_parse(&self, country_code: &str, url: &str) -> Result<Vec<ScrapedPlan>> {
        let html = self.client.get_text(url).await?;
        let plans = parse_plans(&html, country_code);
        tokio::time::sleep(REQUEST_DELAY).await;
        Ok(plans)
    }
}

#[async_trait]
impl PlanScraper for AiraloHttpScraper {
    fn provider_name(&self) -> &'static str {
        "Airalo"
    }

    async fn scrape_country(&mut self, country_code: &str) -> Result<Vec<ScrapedPlan>> {
        let url = country_url(country_code);
        info!("Attempting to scrape {}: {}", country_code, url);

        match self.fetch_and_parse(country_code, &url).await {
            Ok(plans) => {
                if plans.is_empty() {
                    info!("No plans extracted from HTML for {}", country_code);
                } else {
                    info!(
                        "Successfully scraped {} plans for {}",
                        plans.len(),
                        country_code
                    );
                }
                Ok(plans)
            }
            Err(e) => {
                warn!("Web scraping failed for {}: {}", country_code, e);
                Ok(Vec::new())
            }
        }
    }

    async fn scrape_all_countries(&mut self) -> Result<Vec<ScrapedPlan>> {
        let mut all_plans = Vec::new();
        for country_code in COUNTRIES {
            info!("Processing country: {}", country_code);
            all_plans.extend(self.scrape_country(country_code).await?);
            tokio::time::sleep(self.country_delay).await;
        }
        Ok(all_plans)
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spaced(lines: &[&str]) -> String {
        // Keep price tokens far enough apart that an "unlimited" marker
        // near one line cannot bleed into its neighbors.
        lines.join(&format!("\n<!-- {} -->\n", "x".repeat(150)))
    }

    #[test]
    fn pairs_prices_with_data_and_validity_in_order() {
        let html = spaced(&[
            "DATA 1 GB VALIDITY 7 Days $4.50 USD",
            "DATA 2 GB VALIDITY 15 Days $7.00 USD",
            "DATA 3 GB VALIDITY 30 Days $9.00 USD",
            "DATA 5 GB VALIDITY 30 Days $14.00 USD",
            "DATA 10 GB VALIDITY 30 Days $22.00 USD",
        ]);

        let plans = parse_plans(&html, "US");

        assert_eq!(plans.len(), 5);
        assert_eq!(plans[0].name, "US 1GB - 7 Days");
        assert_eq!(plans[0].validity_days, 7);
        assert_eq!(plans[0].price_usd, 4.5);
        assert_eq!(plans[4].name, "US 10GB - 30 Days");
        assert_eq!(plans[4].price_usd, 22.0);
        assert!(plans.iter().all(|p| p.currency == "USD"));
    }

    #[test]
    fn plan_url_ignores_the_fetch_slug() {
        let html = spaced(&[
            "DATA 1 GB VALIDITY 7 Days $4.50 USD",
            "DATA 2 GB VALIDITY 15 Days $7.00 USD",
            "DATA 3 GB VALIDITY 30 Days $9.00 USD",
            "DATA 5 GB VALIDITY 30 Days $14.00 USD",
            "DATA 10 GB VALIDITY 30 Days $22.00 USD",
        ]);

        let plans = parse_plans(&html, "CN");

        // Fetches go through the china-esim slug, but the stored link is
        // always the generic country pattern.
        assert_eq!(country_url("CN"), "https://www.airalo.com/china-esim");
        assert_eq!(plans[0].plan_url, "https://www.airalo.com/cn-esim");
    }

    #[test]
    fn unlimited_marker_near_a_price_flips_the_plan() {
        let html = spaced(&[
            "DATA 1 GB VALIDITY 7 Days $4.50 USD",
            "DATA 2 GB VALIDITY 15 Days $7.00 USD",
            "Unlimited DATA 3 GB VALIDITY 30 Days $9.00 USD",
            "DATA 5 GB VALIDITY 30 Days $14.00 USD",
            "DATA 10 GB VALIDITY 30 Days $22.00 USD",
        ]);

        let plans = parse_plans(&html, "US");

        assert_eq!(plans.len(), 5);
        assert_eq!(plans[2].name, "US Unlimited - 30 Days");
        assert!(plans[2].data.is_unlimited());
        assert_eq!(plans[1].name, "US 2GB - 15 Days");
        assert_eq!(plans[3].name, "US 5GB - 30 Days");
    }

    #[test]
    fn sparse_pages_yield_nothing() {
        let html = "DATA 1 GB VALIDITY 7 Days $4.50 USD and $7.00 USD";
        assert!(parse_plans(html, "US").is_empty());
    }

    #[test]
    fn inline_sequences_rescue_a_page_with_only_zero_prices() {
        let html = spaced(&[
            "$0 USD",
            "$0 USD",
            "$0 USD",
            "$0 USD",
            "Deal: 2 GB for 15 Days at $0 USD",
        ]);

        let plans = parse_plans(&html, "US");

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "US 2GB - 15 Days");
        assert_eq!(plans[0].price_usd, 0.0);
        assert!(!plans[0].data.is_unlimited());
    }

    #[test]
    fn missing_tokens_fall_back_to_one_gb_and_thirty_days() {
        let html = spaced(&[
            "$4.50 USD",
            "$7.00 USD",
            "$9.00 USD",
            "$14.00 USD",
            "$22.00 USD",
        ]);

        let plans = parse_plans(&html, "US");

        assert_eq!(plans.len(), 5);
        assert!(plans.iter().all(|p| p.name.ends_with("1GB - 30 Days")));
        assert!(plans.iter().all(|p| p.validity_days == 30));
    }

    #[test]
    fn fetch_slugs_fall_back_to_the_generic_pattern() {
        assert_eq!(country_slug("SA"), "saudi-arabia-esim");
        assert_eq!(country_slug("XX"), "xx-esim");
        assert_eq!(COUNTRIES.len(), 18);
    }
}
