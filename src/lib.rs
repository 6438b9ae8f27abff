//! planscout - eSIM data plan price tracking and ingestion pipeline.
//!
//! Scrapes mobile data plan listings from eSIM provider storefronts,
//! normalizes prices to USD, and keeps a local SQLite snapshot of each
//! provider's current catalog for price comparison.

pub mod cli;
pub mod config;
pub mod currency;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod repository;
pub mod scrapers;
