//! Data models for planscout.

mod plan;
mod provider;
mod run;
mod variant;

pub use plan::{DataAllowance, ScrapedPlan, StoredPlan};
pub use provider::{Country, Provider};
pub use run::{IngestReport, RunStatus, ScrapeRun};
pub use variant::{Variant, VariantPrice};
