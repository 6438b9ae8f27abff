//! Provider and country reference entities.
//!
//! Both are seeded once by `init` and resolved by name or code during
//! ingestion; the pipeline never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An eSIM provider whose plans are tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Database row ID.
    pub id: i64,
    /// Canonical provider name, e.g. "Airalo".
    pub name: String,
    /// Provider homepage.
    pub website_url: Option<String>,
    /// Short description for listings.
    pub description: Option<String>,
    /// When the provider row was created.
    pub created_at: DateTime<Utc>,
}

/// A destination country plans are sold for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    /// Database row ID.
    pub id: i64,
    /// ISO 3166-1 alpha-2 code, e.g. "US".
    pub code: String,
    /// English display name.
    pub name: String,
    /// When the country row was created.
    pub created_at: DateTime<Utc>,
}
