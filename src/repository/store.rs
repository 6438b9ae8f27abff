//! Plan store backed by SQLite.
//!
//! Holds providers, countries, scraped plans, and the scrape run log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use super::{parse_datetime, parse_datetime_opt, to_option, Result, StoreError};
use crate::models::{
    Country, DataAllowance, Provider, RunStatus, ScrapeRun, ScrapedPlan, StoredPlan,
};

/// Seed entry for a provider row.
pub struct ProviderSeed {
    pub name: &'static str,
    pub website_url: &'static str,
    pub description: &'static str,
}

/// Aggregate run counts over a time window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_runs: i64,
    pub successful: i64,
    pub failed: i64,
    pub running: i64,
}

/// SQLite-backed store for plans and scrape runs.
pub struct PlanStore {
    db_path: PathBuf,
}

impl PlanStore {
    /// Open the store, creating the schema if needed.
    pub fn new(db_path: &Path) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS providers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                website_url TEXT,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS countries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- One row per plan; full-replace per (provider, country) on ingest
            CREATE TABLE IF NOT EXISTS esim_plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id INTEGER NOT NULL,
                country_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                data_amount_gb REAL NOT NULL,
                validity_days INTEGER NOT NULL,
                price_usd REAL NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                original_price REAL NOT NULL,
                is_unlimited INTEGER NOT NULL DEFAULT 0,
                network_type TEXT NOT NULL DEFAULT '4G/5G',
                coverage_type TEXT NOT NULL DEFAULT 'National',
                hotspot_allowed INTEGER NOT NULL DEFAULT 1,
                voice_calls INTEGER NOT NULL DEFAULT 0,
                sms_included INTEGER NOT NULL DEFAULT 0,
                plan_url TEXT,
                last_scraped_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Audit log of ingestion runs
            CREATE TABLE IF NOT EXISTS scrape_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id INTEGER NOT NULL,
                scrape_type TEXT NOT NULL DEFAULT 'full',
                status TEXT NOT NULL DEFAULT 'running',
                plans_found INTEGER NOT NULL DEFAULT 0,
                plans_added INTEGER NOT NULL DEFAULT 0,
                plans_updated INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_esim_plans_provider_country
                ON esim_plans(provider_id, country_id);
            CREATE INDEX IF NOT EXISTS idx_esim_plans_country
                ON esim_plans(country_id);
            CREATE INDEX IF NOT EXISTS idx_scrape_runs_started
                ON scrape_runs(started_at);
        "#,
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    /// Insert provider seeds, skipping names that already exist.
    /// Returns the number of rows inserted.
    pub fn seed_providers(&self, seeds: &[ProviderSeed]) -> Result<usize> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        for seed in seeds {
            inserted += conn.execute(
                r#"
                INSERT INTO providers (name, website_url, description, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(name) DO NOTHING
                "#,
                params![seed.name, seed.website_url, seed.description, now],
            )?;
        }

        Ok(inserted)
    }

    /// Add a provider. The name must be unique.
    pub fn add_provider(
        &self,
        name: &str,
        website_url: Option<&str>,
        description: Option<&str>,
    ) -> Result<i64> {
        if name.is_empty() {
            return Err(StoreError::Invalid("Provider name is required".to_string()));
        }

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO providers (name, website_url, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, website_url, description, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get all providers ordered by name.
    pub fn providers(&self) -> Result<Vec<Provider>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM providers ORDER BY name")?;

        let providers = stmt
            .query_map([], row_to_provider)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(providers)
    }

    /// Look up a provider by name.
    pub fn provider_by_name(&self, name: &str) -> Result<Option<Provider>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM providers WHERE name = ?")?;

        to_option(stmt.query_row(params![name], row_to_provider))
    }

    /// Check if a provider row exists.
    pub fn provider_exists(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM providers WHERE id = ?",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete a provider row.
    pub fn delete_provider(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn.execute("DELETE FROM providers WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    // ------------------------------------------------------------------
    // Countries
    // ------------------------------------------------------------------

    /// Insert (code, name) country seeds, skipping codes that already exist.
    /// Returns the number of rows inserted.
    pub fn seed_countries(&self, entries: &[(&str, &str)]) -> Result<usize> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        for (code, name) in entries {
            inserted += conn.execute(
                r#"
                INSERT INTO countries (code, name, created_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(code) DO NOTHING
                "#,
                params![code, name, now],
            )?;
        }

        Ok(inserted)
    }

    /// Get all countries ordered by code.
    pub fn countries(&self) -> Result<Vec<Country>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM countries ORDER BY code")?;

        let countries = stmt
            .query_map([], |row| {
                Ok(Country {
                    id: row.get("id")?,
                    code: row.get("code")?,
                    name: row.get("name")?,
                    created_at: parse_datetime(&row.get::<_, String>("created_at")?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(countries)
    }

    /// Resolve an ISO country code to its row id.
    pub fn country_id_by_code(&self, code: &str) -> Result<Option<i64>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id FROM countries WHERE code = ?")?;

        to_option(stmt.query_row(params![code], |row| row.get(0)))
    }

    // ------------------------------------------------------------------
    // Plans
    // ------------------------------------------------------------------

    /// Delete all plans for a (provider, country) pair.
    /// Returns the number of rows deleted.
    pub fn delete_plans(&self, provider_id: i64, country_id: i64) -> Result<usize> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "DELETE FROM esim_plans WHERE provider_id = ? AND country_id = ?",
            params![provider_id, country_id],
        )?;
        Ok(rows)
    }

    /// Insert a scraped plan.
    pub fn insert_plan(
        &self,
        provider_id: i64,
        country_id: i64,
        plan: &ScrapedPlan,
    ) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO esim_plans (
                provider_id, country_id, name, data_amount_gb, validity_days,
                price_usd, currency, original_price, is_unlimited, network_type,
                coverage_type, hotspot_allowed, voice_calls, sms_included,
                plan_url, last_scraped_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                provider_id,
                country_id,
                plan.name,
                plan.data.stored_gb(),
                plan.validity_days,
                plan.price_usd,
                plan.currency,
                plan.original_price,
                plan.data.is_unlimited(),
                plan.network_type,
                plan.coverage_type,
                plan.hotspot_allowed,
                plan.voice_calls,
                plan.sms_included,
                plan.plan_url,
                now,
                now,
            ],
        )?;

        Ok(())
    }

    /// Count stored plans for a provider, optionally scoped to a country.
    pub fn count_plans(&self, provider_id: i64, country_id: Option<i64>) -> Result<i64> {
        let conn = self.connect()?;
        let count: i64 = match country_id {
            Some(country_id) => conn.query_row(
                "SELECT COUNT(*) FROM esim_plans WHERE provider_id = ? AND country_id = ?",
                params![provider_id, country_id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM esim_plans WHERE provider_id = ?",
                params![provider_id],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    /// Get plans for a country code, cheapest first.
    pub fn plans_for_country(
        &self,
        code: &str,
        provider: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredPlan>> {
        let conn = self.connect()?;

        let base = r#"
            SELECT p.id, pr.name AS provider_name, p.name, p.data_amount_gb,
                   p.validity_days, p.price_usd, p.currency, p.plan_url,
                   p.last_scraped_at
            FROM esim_plans p
            JOIN providers pr ON pr.id = p.provider_id
            JOIN countries c ON c.id = p.country_id
            WHERE c.code = ?1
        "#;

        let plans = match provider {
            Some(provider) => {
                let sql = format!("{base} AND pr.name = ?2 ORDER BY p.price_usd ASC LIMIT ?3");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![code, provider, limit as i64], row_to_stored_plan)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!("{base} ORDER BY p.price_usd ASC LIMIT ?2");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![code, limit as i64], row_to_stored_plan)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(plans)
    }

    // ------------------------------------------------------------------
    // Scrape runs
    // ------------------------------------------------------------------

    /// Open a run in `running` state. Returns the run id.
    pub fn open_run(&self, provider_id: i64, scrape_type: &str, plans_found: usize) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO scrape_runs (provider_id, scrape_type, status, plans_found, started_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                provider_id,
                scrape_type,
                RunStatus::Running.as_str(),
                plans_found as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Close a run on a terminal status with final counts.
    pub fn close_run(
        &self,
        run_id: i64,
        status: RunStatus,
        plans_added: i64,
        plans_updated: i64,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE scrape_runs SET
                status = ?1,
                plans_added = ?2,
                plans_updated = ?3,
                error_message = ?4,
                completed_at = ?5
            WHERE id = ?6
            "#,
            params![
                status.as_str(),
                plans_added,
                plans_updated,
                error_message,
                Utc::now().to_rfc3339(),
                run_id,
            ],
        )?;
        Ok(())
    }

    /// Get a run by id.
    pub fn run(&self, id: i64) -> Result<Option<ScrapeRun>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM scrape_runs WHERE id = ?")?;

        to_option(stmt.query_row(params![id], row_to_run))
    }

    /// Get the most recent runs with their provider names, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<(ScrapeRun, String)>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.*, COALESCE(pr.name, '?') AS provider_name
            FROM scrape_runs r
            LEFT JOIN providers pr ON pr.id = r.provider_id
            ORDER BY r.started_at DESC
            LIMIT ?
            "#,
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row_to_run(row)?, row.get::<_, String>("provider_name")?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Aggregate run counts since the given instant.
    pub fn run_summary_since(&self, since: DateTime<Utc>) -> Result<RunSummary> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT status FROM scrape_runs WHERE started_at >= ?")?;

        let mut summary = RunSummary::default();
        let statuses = stmt.query_map(params![since.to_rfc3339()], |row| {
            row.get::<_, String>(0)
        })?;

        for status in statuses {
            summary.total_runs += 1;
            match RunStatus::from_str(&status?) {
                Some(RunStatus::Completed) => summary.successful += 1,
                Some(RunStatus::Failed) => summary.failed += 1,
                Some(RunStatus::Running) => summary.running += 1,
                None => {}
            }
        }

        Ok(summary)
    }
}

fn row_to_provider(row: &rusqlite::Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: row.get("id")?,
        name: row.get("name")?,
        website_url: row.get("website_url")?,
        description: row.get("description")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
    })
}

fn row_to_stored_plan(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredPlan> {
    Ok(StoredPlan {
        id: row.get("id")?,
        provider_name: row.get("provider_name")?,
        name: row.get("name")?,
        data: DataAllowance::from_stored_gb(row.get("data_amount_gb")?),
        validity_days: row.get("validity_days")?,
        price_usd: row.get("price_usd")?,
        currency: row.get("currency")?,
        plan_url: row.get("plan_url")?,
        last_scraped_at: parse_datetime(&row.get::<_, String>("last_scraped_at")?),
    })
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScrapeRun> {
    Ok(ScrapeRun {
        id: row.get("id")?,
        provider_id: row.get("provider_id")?,
        scrape_type: row.get("scrape_type")?,
        status: RunStatus::from_str(&row.get::<_, String>("status")?)
            .unwrap_or(RunStatus::Running),
        plans_found: row.get("plans_found")?,
        plans_added: row.get("plans_added")?,
        plans_updated: row.get("plans_updated")?,
        error_message: row.get("error_message")?,
        started_at: parse_datetime(&row.get::<_, String>("started_at")?),
        completed_at: parse_datetime_opt(row.get::<_, Option<String>>("completed_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataAllowance;

    fn temp_store() -> (tempfile::TempDir, PlanStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(&dir.path().join("planscout.db")).unwrap();
        (dir, store)
    }

    fn sample_plan(name: &str, country_code: &str, price: f64) -> ScrapedPlan {
        ScrapedPlan::new(
            name.to_string(),
            country_code,
            DataAllowance::Metered(5.0),
            30,
            price,
            "https://example.com/plan".to_string(),
        )
    }

    #[test]
    fn test_seed_providers_idempotent() {
        let (_dir, store) = temp_store();
        let seeds = [ProviderSeed {
            name: "Airalo",
            website_url: "https://www.airalo.com",
            description: "Global eSIM marketplace",
        }];

        assert_eq!(store.seed_providers(&seeds).unwrap(), 1);
        assert_eq!(store.seed_providers(&seeds).unwrap(), 0);

        let providers = store.providers().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Airalo");
        assert_eq!(
            providers[0].website_url.as_deref(),
            Some("https://www.airalo.com")
        );
    }

    #[test]
    fn test_add_provider_requires_name() {
        let (_dir, store) = temp_store();
        assert!(store.add_provider("", None, None).is_err());

        let id = store.add_provider("Nomad", Some("https://www.getnomad.app"), None).unwrap();
        assert!(store.provider_exists(id).unwrap());
    }

    #[test]
    fn test_country_lookup() {
        let (_dir, store) = temp_store();
        store
            .seed_countries(&[("US", "United States"), ("JP", "Japan")])
            .unwrap();

        assert!(store.country_id_by_code("US").unwrap().is_some());
        assert!(store.country_id_by_code("XX").unwrap().is_none());
        assert_eq!(store.countries().unwrap().len(), 2);
    }

    #[test]
    fn test_insert_and_replace_plans() {
        let (_dir, store) = temp_store();
        let provider_id = store.add_provider("Saily", None, None).unwrap();
        store.seed_countries(&[("US", "United States")]).unwrap();
        let country_id = store.country_id_by_code("US").unwrap().unwrap();

        store
            .insert_plan(provider_id, country_id, &sample_plan("US 5GB - 30 Days", "US", 12.99))
            .unwrap();
        store
            .insert_plan(provider_id, country_id, &sample_plan("US 10GB - 30 Days", "US", 19.99))
            .unwrap();
        assert_eq!(store.count_plans(provider_id, Some(country_id)).unwrap(), 2);

        let deleted = store.delete_plans(provider_id, country_id).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count_plans(provider_id, Some(country_id)).unwrap(), 0);
    }

    #[test]
    fn test_plans_for_country_ordered_by_price() {
        let (_dir, store) = temp_store();
        let provider_id = store.add_provider("Airalo", None, None).unwrap();
        store.seed_countries(&[("DE", "Germany")]).unwrap();
        let country_id = store.country_id_by_code("DE").unwrap().unwrap();

        store
            .insert_plan(provider_id, country_id, &sample_plan("DE 10GB - 30 Days", "DE", 21.0))
            .unwrap();
        store
            .insert_plan(provider_id, country_id, &sample_plan("DE 1GB - 7 Days", "DE", 4.5))
            .unwrap();

        let plans = store.plans_for_country("DE", None, 50).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].name, "DE 1GB - 7 Days");
        assert_eq!(plans[0].provider_name, "Airalo");
        assert!(plans[0].price_usd < plans[1].price_usd);

        let filtered = store.plans_for_country("DE", Some("Holafly"), 50).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_unlimited_round_trip() {
        let (_dir, store) = temp_store();
        let provider_id = store.add_provider("Holafly", None, None).unwrap();
        store.seed_countries(&[("JP", "Japan")]).unwrap();
        let country_id = store.country_id_by_code("JP").unwrap().unwrap();

        let plan = ScrapedPlan::new(
            "JP Unlimited - 10 Days".to_string(),
            "JP",
            DataAllowance::Unlimited,
            10,
            34.0,
            "https://esim.holafly.com/esim-japan/".to_string(),
        );
        store.insert_plan(provider_id, country_id, &plan).unwrap();

        let plans = store.plans_for_country("JP", None, 10).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].data.is_unlimited());
    }

    #[test]
    fn test_run_lifecycle() {
        let (_dir, store) = temp_store();
        let provider_id = store.add_provider("Airalo", None, None).unwrap();

        let run_id = store.open_run(provider_id, "full", 12).unwrap();
        let run = store.run(run_id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.plans_found, 12);
        assert!(run.completed_at.is_none());

        store
            .close_run(run_id, RunStatus::Completed, 10, 0, Some("Country not found: XX"))
            .unwrap();
        let run = store.run(run_id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.plans_added, 10);
        assert_eq!(run.error_message.as_deref(), Some("Country not found: XX"));
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn test_recent_runs_and_summary() {
        let (_dir, store) = temp_store();
        let provider_id = store.add_provider("Saily", None, None).unwrap();

        let first = store.open_run(provider_id, "full", 3).unwrap();
        store.close_run(first, RunStatus::Completed, 3, 0, None).unwrap();
        let second = store.open_run(provider_id, "full", 0).unwrap();
        store
            .close_run(second, RunStatus::Failed, 0, 0, Some("Scraping failed: timeout"))
            .unwrap();
        store.open_run(provider_id, "full", 5).unwrap();

        let runs = store.recent_runs(20).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].1, "Saily");

        let summary = store
            .run_summary_since(Utc::now() - chrono::Duration::hours(24))
            .unwrap();
        assert_eq!(summary.total_runs, 3);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.running, 1);

        let none = store
            .run_summary_since(Utc::now() + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(none.total_runs, 0);
    }

    #[test]
    fn test_provider_delete() {
        let (_dir, store) = temp_store();
        let id = store.add_provider("Ubigi", None, None).unwrap();
        assert!(store.provider_exists(id).unwrap());
        assert!(store.delete_provider(id).unwrap());
        assert!(!store.provider_exists(id).unwrap());
        assert!(!store.delete_provider(id).unwrap());
    }
}
