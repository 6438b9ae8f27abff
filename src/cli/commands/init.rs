//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::{PlanStore, ProviderSeed};

/// Provider rows seeded on init. Scrapers exist for the first three;
/// the rest are known storefronts kept for manual entry and future work.
const PROVIDER_SEEDS: &[ProviderSeed] = &[
    ProviderSeed {
        name: "Airalo",
        website_url: "https://www.airalo.com",
        description: "Global eSIM marketplace covering 200+ destinations",
    },
    ProviderSeed {
        name: "Saily",
        website_url: "https://saily.com",
        description: "eSIM service by Nord Security",
    },
    ProviderSeed {
        name: "Holafly",
        website_url: "https://esim.holafly.com",
        description: "Travel eSIMs with unlimited data plans",
    },
    ProviderSeed {
        name: "Nomad",
        website_url: "https://www.getnomad.app",
        description: "Travel data packs for 170+ countries",
    },
    ProviderSeed {
        name: "Ubigi",
        website_url: "https://cellulardata.ubigi.com",
        description: "Transatel's consumer eSIM data service",
    },
];

/// Countries covered by at least one provider's slug map.
const COUNTRY_SEEDS: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BH", "Bahrain"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CZ", "Czech Republic"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EG", "Egypt"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HK", "Hong Kong"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JO", "Jordan"),
    ("JP", "Japan"),
    ("KE", "Kenya"),
    ("KR", "South Korea"),
    ("KW", "Kuwait"),
    ("MA", "Morocco"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("OM", "Oman"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("QA", "Qatar"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("US", "United States"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
];

/// Initialize the data directory and database.
pub fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let store = PlanStore::new(&settings.database_path())?;

    let providers_added = store.seed_providers(PROVIDER_SEEDS)?;
    let countries_added = store.seed_countries(COUNTRY_SEEDS)?;

    if providers_added > 0 {
        println!(
            "  {} Seeded {} providers",
            style("✓").green(),
            providers_added
        );
    }
    if countries_added > 0 {
        println!(
            "  {} Seeded {} countries",
            style("✓").green(),
            countries_added
        );
    }
    if providers_added == 0 && countries_added == 0 {
        println!("  {} Database already seeded", style("!").yellow());
    }

    println!(
        "{} Initialized planscout in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_cover_every_scraper_country() {
        let seeded: Vec<&str> = COUNTRY_SEEDS.iter().map(|(code, _)| *code).collect();

        for code in crate::scrapers::airalo::COUNTRIES {
            assert!(seeded.contains(code), "missing country seed for {}", code);
        }
        for code in crate::scrapers::saily::COUNTRIES {
            assert!(seeded.contains(code), "missing country seed for {}", code);
        }
    }

    #[test]
    fn wired_providers_are_seeded() {
        let names: Vec<&str> = PROVIDER_SEEDS.iter().map(|seed| seed.name).collect();
        for name in crate::scrapers::supported_providers() {
            assert!(names.contains(name), "missing provider seed for {}", name);
        }
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());

        cmd_init(&settings).unwrap();
        cmd_init(&settings).unwrap();

        let store = PlanStore::new(&settings.database_path()).unwrap();
        assert_eq!(store.providers().unwrap().len(), PROVIDER_SEEDS.len());
        assert_eq!(store.countries().unwrap().len(), COUNTRY_SEEDS.len());
    }
}
