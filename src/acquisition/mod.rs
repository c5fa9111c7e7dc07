//! Page acquisition strategies.
//!
//! Every portal traversal consumes pages through the [`PageSource`] trait and
//! never knows how the HTML was obtained. Two implementations exist:
//!
//! - [`rendered::RenderedFetch`] — a remote render service fetches and
//!   JS-renders the page; selected when a render API key is configured.
//! - [`browser::DrivenBrowser`] — a locally driven headless Chromium session;
//!   the fallback when no key is present.
//!
//! A page that could not be produced after all recovery attempts is a *soft*
//! failure ([`Fetched::Empty`]): the traversal skips it and the run goes on.
//! [`FetchError`] is reserved for conditions that make the source itself
//! unusable.

use async_trait::async_trait;
use thiserror::Error;

use crate::filters::FilterSpec;

pub mod browser;
pub mod rendered;

/// Outcome of one page fetch.
#[derive(Debug, Clone)]
pub enum Fetched {
    /// Rendered HTML of the requested page.
    Page(String),
    /// The page could not be produced; skip it and continue the run.
    Empty,
}

impl Fetched {
    pub fn html(&self) -> Option<&str> {
        match self {
            Fetched::Page(html) => Some(html),
            Fetched::Empty => None,
        }
    }
}

/// Conditions that end a source's usefulness, as opposed to per-page misses.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("browser session error: {0}")]
    Browser(String),
    #[error("no Chromium binary found; set MELHORCARRO_CHROMIUM_PATH or install google-chrome/chromium")]
    NoBrowser,
}

/// One run's page supplier. Listing pages may share session state (the
/// driven browser keeps its tab); detail pages must never disturb it.
#[async_trait]
pub trait PageSource: Send {
    /// Fetch a listing (search results) page.
    async fn listing_page(&mut self, url: &str) -> Result<Fetched, FetchError>;

    /// Fetch a detail page without disturbing listing-session state.
    async fn detail_page(&mut self, url: &str) -> Result<Fetched, FetchError>;

    /// Tear the source down. Called once, including on cancellation.
    async fn shutdown(&mut self) -> Result<(), FetchError>;

    /// Short label for log lines.
    fn label(&self) -> &'static str;
}

/// Pick the acquisition strategy for a run: a configured render key selects
/// the remote service, otherwise a local browser session is launched.
pub async fn source_for(filters: &FilterSpec) -> Result<Box<dyn PageSource>, FetchError> {
    match filters.render_api_key() {
        Some(key) => Ok(Box::new(rendered::RenderedFetch::new(key))),
        None => Ok(Box::new(browser::DrivenBrowser::launch().await?)),
    }
}
