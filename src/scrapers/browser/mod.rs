//! Headless browser session management.
//!
//! Wraps chromiumoxide (CDP) with the launch flags and request headers
//! the provider sites tolerate. One session owns one Chrome process;
//! scrapers open a fresh page per fetch and close it on every exit path.

mod locate;
mod navigate;

pub use locate::{BrowserLocator, FixedLocator, SystemLocator};
pub use navigate::WaitStrategy;

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tracing::info;

use super::{Result, ScrapeError};
use crate::config::Settings;

/// User agent presented to scraped sites.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Chrome arguments for ephemeral scraping runs.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
    "--disable-blink-features=AutomationControlled",
];

const VIEWPORT: (u32, u32) = (1920, 1080);

/// Request headers set on every page to look like a regular browser.
fn extra_headers() -> Headers {
    Headers::new(serde_json::json!({
        "Accept-Language": "en-US,en;q=0.9",
        "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
        "Accept-Encoding": "gzip, deflate, br",
        "Cache-Control": "no-cache",
        "Pragma": "no-cache",
    }))
}

/// A single headless Chrome process with per-call page scoping.
pub struct BrowserSession {
    locator: Box<dyn BrowserLocator>,
    headless: bool,
    nav_timeout: Duration,
    browser: Option<Browser>,
}

impl BrowserSession {
    pub fn new(locator: Box<dyn BrowserLocator>, headless: bool, nav_timeout_secs: u64) -> Self {
        Self {
            locator,
            headless,
            nav_timeout: Duration::from_secs(nav_timeout_secs),
            browser: None,
        }
    }

    /// Build a session from application settings, probing the system for
    /// a Chrome binary unless one is pinned.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Box::new(SystemLocator::new(settings.chrome_path.clone())),
            settings.headless,
            settings.nav_timeout_secs,
        )
    }

    /// Launch the browser process. Idempotent: a live session is reused.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        let chrome_path = self.locator.locate().ok_or_else(|| {
            ScrapeError::BrowserLaunch(
                "Chrome/Chromium not found. Please install it:\n\
                 - Arch/Manjaro: sudo pacman -S chromium\n\
                 - Ubuntu/Debian: sudo apt install chromium-browser\n\
                 - Fedora: sudo dnf install chromium\n\
                 - Or download from: https://www.google.com/chrome/"
                    .to_string(),
            )
        })?;

        info!("Launching browser (headless={})", self.headless);

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless, confusingly
        if !self.headless {
            builder = builder.with_head();
        }

        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        builder = builder.arg(format!("--window-size={},{}", VIEWPORT.0, VIEWPORT.1));

        let config = builder
            .build()
            .map_err(|e| ScrapeError::BrowserLaunch(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::BrowserLaunch(format!("Failed to launch browser: {}", e)))?;

        // Spawn handler task
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(browser);

        Ok(())
    }

    /// Open a fresh page with the scraping user agent and headers applied.
    /// The caller owns the page and must close it when done.
    pub async fn new_page(&self) -> Result<Page> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScrapeError::BrowserLaunch("Browser not initialized".to_string()))?;

        let page = browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await?;
        page.execute(SetExtraHttpHeadersParams::new(extra_headers()))
            .await?;

        Ok(page)
    }

    /// Navigate a page, trying each wait strategy in turn.
    pub async fn navigate(&self, page: &Page, url: &str) -> Result<WaitStrategy> {
        navigate::navigate_with_strategies(page, url, self.nav_timeout).await
    }

    /// Tear down the browser process. Safe to call when already closed.
    pub async fn close(&mut self) {
        self.browser = None;
    }
}
