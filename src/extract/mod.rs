//! Page-data extraction strategies.
//!
//! Provider catalog pages expose plan data in two shapes: structural markup,
//! where plan tiles are anchors or cards carrying the numbers in URLs and
//! visible text, and serialized component props embedded in the page source.
//! Each strategy operates on the final HTML string, so extraction stays
//! testable without a browser and is shared between fetch paths.

pub mod dom;
pub mod embedded;

pub use dom::{scan_plan_cards, scan_plan_links, LinkScan, PlanCandidate};
pub use embedded::extract_unlimited_plans;
