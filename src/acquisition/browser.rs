//! Locally driven headless Chromium session via chromiumoxide.
//!
//! One long-lived tab carries the listing traversal so pagination state and
//! cookies survive across pages. Detail pages open in a throwaway tab and
//! never touch the listing tab.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tracing::{debug, warn};

use super::{FetchError, Fetched, PageSource};

const NAVIGATE_TIMEOUT: Duration = Duration::from_secs(45);

/// Settle time after navigation; the marketplaces hydrate cards client-side.
const SETTLE: Duration = Duration::from_millis(1500);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. MELHORCARRO_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("MELHORCARRO_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.melhorcarro/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".melhorcarro/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".melhorcarro/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".melhorcarro/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".melhorcarro/chromium/chrome-linux64/chrome"),
                home.join(".melhorcarro/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Headless Chromium page source.
pub struct DrivenBrowser {
    browser: Browser,
    listing_tab: Page,
}

impl DrivenBrowser {
    /// Launch Chromium with automation indicators disabled.
    pub async fn launch() -> Result<Self, FetchError> {
        let chrome_path = find_chromium().ok_or(FetchError::NoBrowser)?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--lang=pt-BR")
            .arg("--window-size=1366,900")
            .build()
            .map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        // Drain CDP events for the life of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let listing_tab = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        Ok(Self {
            browser,
            listing_tab,
        })
    }

    /// Navigate `page` and return its rendered HTML, or `Empty` on any
    /// per-page failure.
    async fn render(page: &Page, url: &str) -> Fetched {
        let nav = tokio::time::timeout(NAVIGATE_TIMEOUT, page.goto(url)).await;
        match nav {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!(target_url = url, error = %e, "navigation failed");
                return Fetched::Empty;
            }
            Err(_) => {
                warn!(target_url = url, "navigation timed out");
                return Fetched::Empty;
            }
        }
        let _ = page.wait_for_navigation().await;
        tokio::time::sleep(SETTLE).await;

        match page.evaluate("document.documentElement.outerHTML").await {
            Ok(result) => match result.into_value::<String>() {
                Ok(html) => {
                    debug!(target_url = url, bytes = html.len(), "page rendered");
                    Fetched::Page(html)
                }
                Err(e) => {
                    warn!(target_url = url, error = ?e, "HTML conversion failed");
                    Fetched::Empty
                }
            },
            Err(e) => {
                warn!(target_url = url, error = %e, "HTML extraction failed");
                Fetched::Empty
            }
        }
    }
}

#[async_trait]
impl PageSource for DrivenBrowser {
    async fn listing_page(&mut self, url: &str) -> Result<Fetched, FetchError> {
        Ok(Self::render(&self.listing_tab, url).await)
    }

    async fn detail_page(&mut self, url: &str) -> Result<Fetched, FetchError> {
        // Isolated tab so the listing tab's history and scroll state survive.
        let tab = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let fetched = Self::render(&tab, url).await;
        let _ = tab.close().await;
        Ok(fetched)
    }

    async fn shutdown(&mut self) -> Result<(), FetchError> {
        let _ = self.browser.close().await;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "driven-browser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn render_and_isolated_detail_tab() {
        let mut source = DrivenBrowser::launch().await.expect("launch failed");

        let listing = source
            .listing_page("data:text/html,<h1>Listagem</h1>")
            .await
            .expect("listing fetch failed");
        assert!(listing.html().is_some_and(|h| h.contains("Listagem")));

        let detail = source
            .detail_page("data:text/html,<h1>Detalhe</h1>")
            .await
            .expect("detail fetch failed");
        assert!(detail.html().is_some_and(|h| h.contains("Detalhe")));

        // Listing tab untouched by the detail fetch.
        let again = source
            .listing_page("data:text/html,<h1>Listagem 2</h1>")
            .await
            .expect("second listing fetch failed");
        assert!(again.html().is_some_and(|h| h.contains("Listagem 2")));

        source.shutdown().await.expect("shutdown failed");
    }
}
