//! Ingestion of scraped plan batches into the store.
//!
//! Each batch is written with full-replace semantics: existing plans for
//! every (provider, country) pair touched by the batch are deleted, then
//! the batch is inserted plan by plan. Individual failures are recorded
//! as error strings on the report and never abort the batch.

use tracing::{debug, warn};

use crate::models::{IngestReport, RunStatus, ScrapedPlan};
use crate::repository::{PlanStore, Result as StoreResult, StoreError};

/// Writes scraped plan batches for one provider.
pub struct IngestionWriter<'a> {
    store: &'a PlanStore,
    provider_id: i64,
}

impl<'a> IngestionWriter<'a> {
    pub fn new(store: &'a PlanStore, provider_id: i64) -> Self {
        Self { store, provider_id }
    }

    /// Persist a batch of scraped plans, logging the run in `scrape_runs`.
    ///
    /// The run row always reaches a terminal status: `completed` with the
    /// final counts and concatenated item errors, or `failed` when an
    /// error spans the whole procedure. Item-level failures (a missing
    /// country, a rejected insert) leave the run `completed`.
    pub fn save_plans(&self, plans: &[ScrapedPlan]) -> IngestReport {
        let mut report = IngestReport::new(plans.len());

        let run_id = match self.store.open_run(self.provider_id, "full", plans.len()) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to open scrape run: {}", e);
                None
            }
        };

        match self.replace_and_insert(plans, &mut report) {
            Ok(()) => {
                if let Some(run_id) = run_id {
                    let joined = report.joined_errors();
                    if let Err(e) = self.store.close_run(
                        run_id,
                        RunStatus::Completed,
                        report.plans_added as i64,
                        report.plans_updated as i64,
                        joined.as_deref(),
                    ) {
                        warn!("Failed to close scrape run {}: {}", run_id, e);
                    }
                }
            }
            Err(e) => {
                report.success = false;
                report.errors.push(format!("Scraping failed: {}", e));
                if let Some(run_id) = run_id {
                    if let Err(close_err) =
                        self.store
                            .close_run(run_id, RunStatus::Failed, 0, 0, Some(&e.to_string()))
                    {
                        warn!("Failed to close scrape run {}: {}", run_id, close_err);
                    }
                }
            }
        }

        report
    }

    /// Delete stale plans for every country in the batch, then insert the
    /// batch. Returns `Err` only for failures that invalidate the whole
    /// procedure; everything else lands in `report.errors`.
    fn replace_and_insert(
        &self,
        plans: &[ScrapedPlan],
        report: &mut IngestReport,
    ) -> StoreResult<()> {
        if !self.store.provider_exists(self.provider_id)? {
            return Err(StoreError::Invalid(format!(
                "Provider not found: {}",
                self.provider_id
            )));
        }

        // Unique country codes in first-seen order
        let mut codes: Vec<&str> = Vec::new();
        for plan in plans {
            if !codes.contains(&plan.country_code.as_str()) {
                codes.push(&plan.country_code);
            }
        }

        for code in &codes {
            match self.store.country_id_by_code(code) {
                Ok(Some(country_id)) => {
                    if let Err(e) = self.store.delete_plans(self.provider_id, country_id) {
                        report
                            .errors
                            .push(format!("Failed to delete old plans for {}: {}", code, e));
                    }
                }
                Ok(None) => {
                    debug!("No country row for {}, nothing to delete", code);
                }
                Err(e) => {
                    debug!("Country lookup for {} failed: {}", code, e);
                }
            }
        }

        for plan in plans {
            let country_id = match self.store.country_id_by_code(&plan.country_code) {
                Ok(Some(id)) => id,
                Ok(None) | Err(_) => {
                    report
                        .errors
                        .push(format!("Country not found: {}", plan.country_code));
                    continue;
                }
            };

            match self.store.insert_plan(self.provider_id, country_id, plan) {
                Ok(()) => report.plans_added += 1,
                Err(e) => {
                    report
                        .errors
                        .push(format!("Failed to insert plan {}: {}", plan.name, e));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataAllowance;
    use crate::repository::PlanStore;

    fn setup() -> (tempfile::TempDir, PlanStore, i64) {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(&dir.path().join("planscout.db")).unwrap();
        store
            .seed_countries(&[("US", "United States"), ("DE", "Germany")])
            .unwrap();
        let provider_id = store.add_provider("Airalo", None, None).unwrap();
        (dir, store, provider_id)
    }

    fn plan(name: &str, code: &str, price: f64) -> ScrapedPlan {
        ScrapedPlan::new(
            name.to_string(),
            code,
            DataAllowance::Metered(3.0),
            30,
            price,
            format!("https://example.com/{}", name),
        )
    }

    #[test]
    fn save_replaces_existing_plans() {
        let (_dir, store, provider_id) = setup();
        let writer = IngestionWriter::new(&store, provider_id);
        let country_id = store.country_id_by_code("US").unwrap().unwrap();

        let first = writer.save_plans(&[
            plan("US 3GB - 30 Days", "US", 9.0),
            plan("US 5GB - 30 Days", "US", 14.0),
        ]);
        assert!(first.success);
        assert_eq!(first.plans_added, 2);
        assert!(first.errors.is_empty());

        // A second batch fully replaces the first
        let second = writer.save_plans(&[plan("US 10GB - 30 Days", "US", 24.0)]);
        assert!(second.success);
        assert_eq!(second.plans_added, 1);
        assert_eq!(store.count_plans(provider_id, Some(country_id)).unwrap(), 1);

        let stored = store.plans_for_country("US", None, 10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "US 10GB - 30 Days");
    }

    #[test]
    fn save_leaves_other_countries_untouched() {
        let (_dir, store, provider_id) = setup();
        let writer = IngestionWriter::new(&store, provider_id);

        writer.save_plans(&[plan("DE 3GB - 30 Days", "DE", 8.0)]);
        writer.save_plans(&[plan("US 3GB - 30 Days", "US", 9.0)]);

        assert_eq!(store.plans_for_country("DE", None, 10).unwrap().len(), 1);
        assert_eq!(store.plans_for_country("US", None, 10).unwrap().len(), 1);
    }

    #[test]
    fn unknown_country_is_soft_error() {
        let (_dir, store, provider_id) = setup();
        let writer = IngestionWriter::new(&store, provider_id);

        let report = writer.save_plans(&[
            plan("US 3GB - 30 Days", "US", 9.0),
            plan("XX 3GB - 30 Days", "XX", 9.0),
        ]);

        // Run completes; the bad plan shows up as an error string
        assert!(report.success);
        assert_eq!(report.plans_found, 2);
        assert_eq!(report.plans_added, 1);
        assert_eq!(report.errors, vec!["Country not found: XX".to_string()]);

        let runs = store.recent_runs(5).unwrap();
        assert_eq!(runs[0].0.status, RunStatus::Completed);
        assert_eq!(
            runs[0].0.error_message.as_deref(),
            Some("Country not found: XX")
        );
    }

    #[test]
    fn item_errors_join_with_semicolons() {
        let (_dir, store, provider_id) = setup();
        let writer = IngestionWriter::new(&store, provider_id);

        let report = writer.save_plans(&[
            plan("XX 1GB - 7 Days", "XX", 4.0),
            plan("YY 1GB - 7 Days", "YY", 4.0),
        ]);

        assert!(report.success);
        assert_eq!(report.plans_added, 0);

        let runs = store.recent_runs(5).unwrap();
        assert_eq!(
            runs[0].0.error_message.as_deref(),
            Some("Country not found: XX; Country not found: YY")
        );
    }

    #[test]
    fn missing_provider_fails_run() {
        let (_dir, store, provider_id) = setup();
        store.delete_provider(provider_id).unwrap();

        let writer = IngestionWriter::new(&store, provider_id);
        let report = writer.save_plans(&[plan("US 3GB - 30 Days", "US", 9.0)]);

        assert!(!report.success);
        assert_eq!(report.plans_added, 0);
        assert!(report.errors[0].starts_with("Scraping failed:"));

        let runs = store.recent_runs(5).unwrap();
        assert_eq!(runs[0].0.status, RunStatus::Failed);
        assert!(runs[0].0.completed_at.is_some());
        // Failed runs keep the raw error message, not the joined item errors
        assert!(runs[0]
            .0
            .error_message
            .as_deref()
            .unwrap()
            .contains("Provider not found"));
    }

    #[test]
    fn empty_batch_completes_cleanly() {
        let (_dir, store, provider_id) = setup();
        let writer = IngestionWriter::new(&store, provider_id);

        let report = writer.save_plans(&[]);
        assert!(report.success);
        assert_eq!(report.plans_found, 0);
        assert_eq!(report.plans_added, 0);
        assert!(report.errors.is_empty());

        let runs = store.recent_runs(5).unwrap();
        assert_eq!(runs[0].0.status, RunStatus::Completed);
        assert_eq!(runs[0].0.error_message, None);
    }
}
