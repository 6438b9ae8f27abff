//! Plan models for scraped eSIM offers.
//!
//! A `ScrapedPlan` is the transient output of one provider scrape; it is
//! normalized (USD pricing, ISO country code) before being handed to the
//! ingestion writer. Stored rows come back as `StoredPlan` for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Data allowance for a plan.
///
/// Persisted datasets use a 999 GB marker for unlimited plans; that value is
/// confined to the store boundary via [`DataAllowance::stored_gb`] and
/// [`DataAllowance::from_stored_gb`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAllowance {
    /// Unmetered data for the validity period.
    Unlimited,
    /// Metered allowance in gigabytes.
    Metered(f64),
}

impl DataAllowance {
    /// Stored marker for unlimited plans, kept for dataset compatibility.
    pub const UNLIMITED_GB: f64 = 999.0;

    /// Interpret a stored gigabyte value.
    pub fn from_stored_gb(gb: f64) -> Self {
        if gb >= Self::UNLIMITED_GB {
            Self::Unlimited
        } else {
            Self::Metered(gb)
        }
    }

    /// Gigabyte value as written to the store.
    pub fn stored_gb(&self) -> f64 {
        match self {
            Self::Unlimited => Self::UNLIMITED_GB,
            Self::Metered(gb) => *gb,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Human-readable label as used in plan names ("Unlimited" or "5GB").
    pub fn label(&self) -> String {
        match self {
            Self::Unlimited => "Unlimited".to_string(),
            Self::Metered(gb) => format!("{}GB", gb),
        }
    }
}

/// One pricing offer scraped from a provider page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPlan {
    /// Display name, e.g. "United States 5GB - 30 Days".
    pub name: String,
    /// Data allowance.
    pub data: DataAllowance,
    /// Validity period in days.
    pub validity_days: u32,
    /// Price normalized to USD.
    pub price_usd: f64,
    /// Currency code as shown on the provider page.
    pub currency: String,
    /// Price in the original currency, before normalization.
    pub original_price: f64,
    /// Network technology, e.g. "4G/5G".
    pub network_type: String,
    /// Coverage scope, e.g. "National".
    pub coverage_type: String,
    /// Whether tethering is allowed.
    pub hotspot_allowed: bool,
    /// Whether voice calls are included.
    pub voice_calls: bool,
    /// Whether SMS is included.
    pub sms_included: bool,
    /// URL of the plan on the provider site.
    pub plan_url: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
}

impl ScrapedPlan {
    /// Create a plan with provider-wide defaults (USD pricing, 4G/5G,
    /// national coverage, hotspot allowed, no voice or SMS).
    pub fn new(
        name: String,
        country_code: &str,
        data: DataAllowance,
        validity_days: u32,
        price_usd: f64,
        plan_url: String,
    ) -> Self {
        Self {
            name,
            data,
            validity_days,
            price_usd,
            currency: "USD".to_string(),
            original_price: price_usd,
            network_type: "4G/5G".to_string(),
            coverage_type: "National".to_string(),
            hotspot_allowed: true,
            voice_calls: false,
            sms_included: false,
            plan_url,
            country_code: country_code.to_string(),
        }
    }
}

/// A persisted plan row, joined with its provider name for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlan {
    pub id: i64,
    pub provider_name: String,
    pub name: String,
    pub data: DataAllowance,
    pub validity_days: u32,
    pub price_usd: f64,
    pub currency: String,
    pub plan_url: Option<String>,
    pub last_scraped_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_allowance_stored_round_trip() {
        assert_eq!(
            DataAllowance::from_stored_gb(5.0),
            DataAllowance::Metered(5.0)
        );
        assert_eq!(
            DataAllowance::from_stored_gb(999.0),
            DataAllowance::Unlimited
        );
        assert_eq!(DataAllowance::Unlimited.stored_gb(), 999.0);
        assert_eq!(DataAllowance::Metered(0.5).stored_gb(), 0.5);
    }

    #[test]
    fn test_data_allowance_label() {
        assert_eq!(DataAllowance::Unlimited.label(), "Unlimited");
        assert_eq!(DataAllowance::Metered(10.0).label(), "10GB");
        assert_eq!(DataAllowance::Metered(0.5).label(), "0.5GB");
    }

    #[test]
    fn test_scraped_plan_defaults() {
        let plan = ScrapedPlan::new(
            "United States 5GB - 30 Days".to_string(),
            "US",
            DataAllowance::Metered(5.0),
            30,
            14.0,
            "https://www.airalo.com/united-states-esim".to_string(),
        );
        assert_eq!(plan.currency, "USD");
        assert_eq!(plan.original_price, 14.0);
        assert_eq!(plan.network_type, "4G/5G");
        assert_eq!(plan.coverage_type, "National");
        assert!(plan.hotspot_allowed);
        assert!(!plan.voice_calls);
        assert!(!plan.sms_included);
    }
}
