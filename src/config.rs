//! Configuration management.
//!
//! Settings come from three layers: built-in defaults, an optional
//! `planscout.toml`, and environment variables, each overriding the
//! last.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "planscout.db";

/// Config file looked for in the working directory and the data dir.
pub const CONFIG_FILENAME: &str = "planscout.toml";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Run the browser headless.
    pub headless: bool,
    /// Per-strategy navigation timeout in seconds.
    pub nav_timeout_secs: u64,
    /// Pinned Chrome executable. Probed from well-known paths when unset.
    pub chrome_path: Option<PathBuf>,
    /// Refresh currency rates from the live API before scraping.
    pub live_rates: bool,
    /// Seconds to pause between countries in a sweep.
    pub country_delay_secs: u64,
    /// Seconds to pause between providers in a multi-provider run.
    pub provider_delay_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("planscout");

        Self {
            data_dir,
            headless: true,
            nav_timeout_secs: 60,
            chrome_path: None,
            live_rates: false,
            country_delay_secs: 3,
            provider_delay_secs: 5,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Full path to the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_DATABASE_FILENAME)
    }

    /// Check if the database file exists yet.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    pub fn country_delay(&self) -> Duration {
        Duration::from_secs(self.country_delay_secs)
    }

    pub fn provider_delay(&self) -> Duration {
        Duration::from_secs(self.provider_delay_secs)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Data directory path, absolute or relative to the config file.
    pub data_dir: Option<String>,
    /// Run the browser headless.
    pub headless: Option<bool>,
    /// Per-strategy navigation timeout in seconds.
    pub nav_timeout_secs: Option<u64>,
    /// Chrome executable path.
    pub chrome_path: Option<String>,
    /// Refresh currency rates from the live API before scraping.
    pub live_rates: Option<bool>,
    /// Seconds to pause between countries.
    pub country_delay_secs: Option<u64>,
    /// Seconds to pause between providers.
    pub provider_delay_secs: Option<u64>,
}

impl Config {
    /// Load the config file from an explicit path, the working
    /// directory, or the default data directory, in that order. Missing
    /// files fall through; a present but unparsable file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf), String> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        } else {
            candidates.push(cwd.join(CONFIG_FILENAME));
            candidates.push(Settings::default().data_dir.join(CONFIG_FILENAME));
        }

        for path in candidates {
            if !path.exists() {
                if explicit.is_some() {
                    return Err(format!("Config file not found: {}", path.display()));
                }
                continue;
            }
            debug!("Loading config from {}", path.display());
            let config = Self::load_from_path(&path)?;
            let base_dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| cwd.clone());
            return Ok((config, base_dir));
        }

        Ok((Self::default(), cwd))
    }

    /// Parse a TOML config file.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        toml::from_str(&contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
    }

    /// Apply file values onto settings. Relative paths resolve against
    /// `base_dir`, normally the config file's directory.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = resolve_path(data_dir, base_dir);
        }
        if let Some(headless) = self.headless {
            settings.headless = headless;
        }
        if let Some(timeout) = self.nav_timeout_secs {
            settings.nav_timeout_secs = timeout;
        }
        if let Some(ref chrome_path) = self.chrome_path {
            settings.chrome_path = Some(resolve_path(chrome_path, base_dir));
        }
        if let Some(live_rates) = self.live_rates {
            settings.live_rates = live_rates;
        }
        if let Some(delay) = self.country_delay_secs {
            settings.country_delay_secs = delay;
        }
        if let Some(delay) = self.provider_delay_secs {
            settings.provider_delay_secs = delay;
        }
    }
}

fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(path_str);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Load settings: defaults, then the config file, then environment
/// overrides.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, String> {
    let (config, base_dir) = Config::load(config_path)?;

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(dir) = env_var("PLANSCOUT_DATA_DIR") {
        debug!("Using PLANSCOUT_DATA_DIR from environment: {}", dir);
        settings.data_dir = PathBuf::from(dir);
    }
    if let Some(path) = env_var("CHROME_PATH") {
        debug!("Using CHROME_PATH from environment: {}", path);
        settings.chrome_path = Some(PathBuf::from(path));
    }
    if let Some(flag) = env_var("PLANSCOUT_LIVE_RATES") {
        settings.live_rates = flag == "1" || flag.eq_ignore_ascii_case("true");
    }

    Ok(settings)
}
