//! Browser executable discovery.

use std::path::PathBuf;

use tracing::info;

/// Resolves the Chrome/Chromium executable to launch.
///
/// Injected into `BrowserSession` so tests can substitute a fixed
/// path without touching the filesystem.
pub trait BrowserLocator: Send + Sync {
    fn locate(&self) -> Option<PathBuf>;
}

/// Well-known Chrome install locations, checked in order.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// Commands searched in `PATH` when no known location matches.
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Locator that checks an explicit override first, then well-known
/// install locations, then `PATH`.
pub struct SystemLocator {
    override_path: Option<PathBuf>,
}

impl SystemLocator {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }
}

impl BrowserLocator for SystemLocator {
    fn locate(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.override_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        for path in CHROME_PATHS {
            let p = PathBuf::from(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Some(p);
            }
        }

        for cmd in CHROME_COMMANDS {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Some(path);
            }
        }

        None
    }
}

/// Locator with a fixed answer, for tests.
pub struct FixedLocator(pub Option<PathBuf>);

impl BrowserLocator for FixedLocator {
    fn locate(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_path_wins_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let fake_chrome = dir.path().join("chrome");
        std::fs::write(&fake_chrome, "").unwrap();

        let locator = SystemLocator::new(Some(fake_chrome.clone()));
        assert_eq!(locator.locate(), Some(fake_chrome));
    }

    #[test]
    fn missing_override_falls_through() {
        let locator = SystemLocator::new(Some(PathBuf::from("/nonexistent/chrome-binary")));
        // Whatever the host has installed, the bogus override is never returned
        if let Some(found) = locator.locate() {
            assert_ne!(found, PathBuf::from("/nonexistent/chrome-binary"));
        }
    }

    #[test]
    fn fixed_locator_returns_its_answer() {
        assert_eq!(FixedLocator(None).locate(), None);
        assert_eq!(
            FixedLocator(Some(PathBuf::from("/tmp/chrome"))).locate(),
            Some(PathBuf::from("/tmp/chrome"))
        );
    }
}
