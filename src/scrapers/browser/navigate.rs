//! Navigation with layered wait strategies.
//!
//! Provider sites vary in how reliably they finish loading, so each
//! navigation is retried under progressively different readiness
//! checks. The first strategy that succeeds wins; an error surfaces
//! only when every strategy has failed.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use tracing::{debug, warn};

use crate::scrapers::{Result, ScrapeError};

/// Readiness check applied after navigation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// The DOM has been parsed (readyState interactive or complete).
    ContentParsed,
    /// No new resource requests for a short window after load.
    NetworkQuiesced,
    /// The load event has fired (readyState complete).
    FullyLoaded,
}

impl WaitStrategy {
    /// Strategies in the order they are attempted.
    pub const LADDER: &'static [WaitStrategy] = &[
        WaitStrategy::ContentParsed,
        WaitStrategy::NetworkQuiesced,
        WaitStrategy::FullyLoaded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitStrategy::ContentParsed => "content-parsed",
            WaitStrategy::NetworkQuiesced => "network-quiesced",
            WaitStrategy::FullyLoaded => "fully-loaded",
        }
    }

    /// JavaScript promise that resolves with the reached state, or with
    /// "timeout" if the page never gets there.
    fn ready_script(&self, timeout_ms: u64) -> String {
        match self {
            WaitStrategy::ContentParsed => format!(
                r#"
                new Promise((resolve) => {{
                    if (document.readyState === 'complete' || document.readyState === 'interactive') {{
                        resolve(document.readyState);
                    }} else {{
                        document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                        setTimeout(() => resolve('timeout'), {timeout_ms});
                    }}
                }})
                "#
            ),
            WaitStrategy::NetworkQuiesced => format!(
                r#"
                new Promise((resolve) => {{
                    let count = performance.getEntriesByType('resource').length;
                    const check = () => {{
                        const now = performance.getEntriesByType('resource').length;
                        if (document.readyState === 'complete' && now === count) {{
                            resolve('idle');
                        }} else {{
                            count = now;
                            setTimeout(check, 500);
                        }}
                    }};
                    setTimeout(check, 500);
                    setTimeout(() => resolve('timeout'), {timeout_ms});
                }})
                "#
            ),
            WaitStrategy::FullyLoaded => format!(
                r#"
                new Promise((resolve) => {{
                    if (document.readyState === 'complete') {{
                        resolve(document.readyState);
                    }} else {{
                        window.addEventListener('load', () => resolve(document.readyState));
                        setTimeout(() => resolve('timeout'), {timeout_ms});
                    }}
                }})
                "#
            ),
        }
    }
}

/// Navigate to a URL, attempting each wait strategy in turn.
/// Returns the strategy that succeeded.
pub async fn navigate_with_strategies(
    page: &Page,
    url: &str,
    timeout: Duration,
) -> Result<WaitStrategy> {
    let mut last_error = None;

    for strategy in WaitStrategy::LADDER {
        match try_navigate(page, url, *strategy, timeout).await {
            Ok(()) => {
                debug!("Navigation succeeded with {} wait", strategy.as_str());
                return Ok(*strategy);
            }
            Err(e) => {
                warn!(
                    "Navigation with {} wait failed for {}: {}",
                    strategy.as_str(),
                    url,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    let last = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no strategies attempted".to_string());
    Err(ScrapeError::Navigation(format!(
        "Failed to navigate to {}: {}",
        url, last
    )))
}

async fn try_navigate(
    page: &Page,
    url: &str,
    strategy: WaitStrategy,
    timeout: Duration,
) -> Result<()> {
    let nav_params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| ScrapeError::Navigation(format!("Invalid URL: {}", e)))?;

    tokio::time::timeout(timeout, page.execute(nav_params))
        .await
        .map_err(|_| {
            ScrapeError::Navigation(format!(
                "Navigation timed out after {}s for {}",
                timeout.as_secs(),
                url
            ))
        })?
        .map_err(|e| ScrapeError::Navigation(format!("Navigation failed for {}: {}", url, e)))?;

    let script = strategy.ready_script(timeout.as_millis() as u64);
    match tokio::time::timeout(timeout, page.evaluate(script)).await {
        Ok(Ok(result)) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            if state == "timeout" {
                return Err(ScrapeError::Navigation(format!(
                    "Page never reached {} state",
                    strategy.as_str()
                )));
            }
            debug!("Page ready state: {}", state);
            Ok(())
        }
        Ok(Err(e)) => Err(ScrapeError::Navigation(format!("Ready check failed: {}", e))),
        Err(_) => Err(ScrapeError::Navigation(format!(
            "Timed out waiting for {} state",
            strategy.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_order_is_fixed() {
        assert_eq!(
            WaitStrategy::LADDER,
            &[
                WaitStrategy::ContentParsed,
                WaitStrategy::NetworkQuiesced,
                WaitStrategy::FullyLoaded,
            ]
        );
    }

    #[test]
    fn ready_scripts_embed_the_timeout() {
        for strategy in WaitStrategy::LADDER {
            let script = strategy.ready_script(60000);
            assert!(script.contains("60000"), "{} script", strategy.as_str());
            assert!(script.contains("resolve"));
        }
    }
}
