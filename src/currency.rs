//! Currency normalization for scraped prices.
//!
//! All cross-provider comparison happens in USD. Conversion uses a small
//! static rate table by default; an optional live-rate refresh pulls current
//! rates from an external service with a bounded timeout, falling back to
//! the static table when the service is slow, down, or returns junk.

use std::time::Duration;

use tracing::{debug, warn};

/// Approximate conversion rates to USD (USD baseline 1.0).
const STATIC_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 1.10),
    ("GBP", 1.27),
    ("JPY", 0.0067),
    ("INR", 0.012),
];

/// Currency symbols recognized in scraped price text.
const CURRENCY_SYMBOLS: &[(char, &str)] = &[
    ('€', "EUR"),
    ('$', "USD"),
    ('£', "GBP"),
    ('¥', "JPY"),
    ('₹', "INR"),
];

/// Timeout for one live-rate request.
const LIVE_RATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Map a currency symbol to its ISO code.
pub fn symbol_to_code(symbol: char) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, code)| *code)
}

/// Immutable USD conversion table, built once and injected into scrapers.
#[derive(Debug, Clone)]
pub struct CurrencyTable {
    rates: Vec<(String, f64)>,
}

impl Default for CurrencyTable {
    fn default() -> Self {
        Self {
            rates: STATIC_RATES
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
        }
    }
}

impl CurrencyTable {
    /// Conversion rate to USD. Unrecognized codes are treated as already-USD,
    /// a known approximation that keeps odd symbols from zeroing out prices.
    pub fn usd_rate(&self, code: &str) -> f64 {
        self.rates
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, rate)| *rate)
            .unwrap_or(1.0)
    }

    /// Convert an amount to USD, rounded to cents.
    pub fn normalize(&self, amount: f64, code: &str) -> f64 {
        round_cents(amount * self.usd_rate(code))
    }

    /// Replace the rate for one currency.
    pub fn set_rate(&mut self, code: &str, rate: f64) {
        match self.rates.iter_mut().find(|(c, _)| c == code) {
            Some(entry) => entry.1 = rate,
            None => self.rates.push((code.to_string(), rate)),
        }
    }

    /// Refresh every non-USD rate from the live service. Codes the service
    /// cannot answer for keep their static rate.
    pub async fn refresh_live(&mut self, client: &reqwest::Client) {
        let codes: Vec<String> = self
            .rates
            .iter()
            .filter(|(code, _)| code != "USD")
            .map(|(code, _)| code.clone())
            .collect();

        for code in codes {
            let rate = live_usd_rate(client, self, &code).await;
            self.set_rate(&code, rate);
        }
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Fetch the live USD rate for one currency, falling back to the table's
/// current rate on timeout, non-success status, or a malformed payload.
pub async fn live_usd_rate(client: &reqwest::Client, table: &CurrencyTable, code: &str) -> f64 {
    match fetch_live_rate(client, code).await {
        Ok(rate) => {
            debug!("Fetched live {} to USD rate: {}", code, rate);
            rate
        }
        Err(e) => {
            let fallback = table.usd_rate(code);
            warn!(
                "Failed to fetch live {} rate, using fallback ({}): {}",
                code, fallback, e
            );
            fallback
        }
    }
}

async fn fetch_live_rate(client: &reqwest::Client, code: &str) -> anyhow::Result<f64> {
    let url = format!("https://api.exchangerate-api.com/v4/latest/{}", code);
    let response = client
        .get(&url)
        .timeout(LIVE_RATE_TIMEOUT)
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("rate service returned {}", response.status());
    }

    let body: serde_json::Value = response.json().await?;
    body.get("rates")
        .and_then(|rates| rates.get("USD"))
        .and_then(|usd| usd.as_f64())
        .ok_or_else(|| anyhow::anyhow!("rate payload missing rates.USD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usd_normalization_is_identity_with_rounding() {
        let table = CurrencyTable::default();
        assert_eq!(table.normalize(4.50, "USD"), 4.50);
        assert_eq!(table.normalize(4.505, "USD"), 4.51);
        assert_eq!(table.normalize(0.0, "USD"), 0.0);
    }

    #[test]
    fn eur_converts_via_static_rate() {
        let table = CurrencyTable::default();
        assert_eq!(table.normalize(4.50, "EUR"), 4.95);
        assert_eq!(table.normalize(20.0, "EUR"), 22.00);
    }

    #[test]
    fn unknown_code_treated_as_usd() {
        let table = CurrencyTable::default();
        assert_eq!(table.usd_rate("XYZ"), 1.0);
        assert_eq!(table.normalize(9.99, "XYZ"), 9.99);
    }

    #[test]
    fn jpy_and_inr_rates_apply() {
        let table = CurrencyTable::default();
        assert_eq!(table.normalize(1000.0, "JPY"), 6.7);
        assert_eq!(table.normalize(500.0, "INR"), 6.0);
    }

    #[test]
    fn set_rate_overrides_and_extends() {
        let mut table = CurrencyTable::default();
        table.set_rate("EUR", 1.05);
        assert_eq!(table.usd_rate("EUR"), 1.05);

        table.set_rate("CHF", 1.12);
        assert_eq!(table.usd_rate("CHF"), 1.12);
    }

    #[test]
    fn symbol_map_covers_scraped_symbols() {
        assert_eq!(symbol_to_code('€'), Some("EUR"));
        assert_eq!(symbol_to_code('$'), Some("USD"));
        assert_eq!(symbol_to_code('£'), Some("GBP"));
        assert_eq!(symbol_to_code('¥'), Some("JPY"));
        assert_eq!(symbol_to_code('₹'), Some("INR"));
        assert_eq!(symbol_to_code('₩'), None);
    }
}
