//! Remote-render acquisition over plain HTTP.
//!
//! Not a browser on our side — the render service runs one for us. Each
//! fetch asks the service to JS-render the target URL, escalating the
//! server-side wait across a fixed ladder until the body looks like a real
//! page. Anything still undersized after the last tier is a soft failure.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{FetchError, Fetched, PageSource};

const RENDER_ENDPOINT: &str = "https://api.zenrows.com/v1/";

/// Server-side render waits, in milliseconds, tried in order.
const WAIT_TIERS: &[u64] = &[3000, 6000, 9000, 12000];

/// Bodies at or below this size are anti-bot interstitials or empty shells,
/// never a marketplace results page.
const MIN_BODY_BYTES: usize = 100;

/// Remote render service client.
pub struct RenderedFetch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    wait_tiers: Vec<u64>,
}

impl RenderedFetch {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, RENDER_ENDPOINT.to_string())
    }

    /// Point the client at a different endpoint (tests use a local mock).
    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint,
            api_key,
            wait_tiers: WAIT_TIERS.to_vec(),
        }
    }

    /// Override the wait ladder (tests shorten it).
    pub fn with_waits(mut self, waits: Vec<u64>) -> Self {
        self.wait_tiers = waits;
        self
    }

    /// One render attempt per wait tier; the first plausible body wins.
    async fn fetch(&self, target: &str) -> Fetched {
        for wait in &self.wait_tiers {
            let resp = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("url", target),
                    ("apikey", self.api_key.as_str()),
                    ("js_render", "true"),
                    ("wait", &wait.to_string()),
                ])
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let body = r.text().await.unwrap_or_default();
                    if body.len() > MIN_BODY_BYTES {
                        debug!(target_url = target, wait, bytes = body.len(), "render ok");
                        return Fetched::Page(body);
                    }
                    warn!(
                        target_url = target,
                        wait,
                        bytes = body.len(),
                        "undersized render body, escalating wait"
                    );
                }
                Ok(r) => {
                    warn!(
                        target_url = target,
                        wait,
                        status = r.status().as_u16(),
                        "render service error, escalating wait"
                    );
                }
                Err(e) => {
                    warn!(target_url = target, wait, error = %e, "render transport error");
                }
            }
        }
        Fetched::Empty
    }
}

#[async_trait]
impl PageSource for RenderedFetch {
    async fn listing_page(&mut self, url: &str) -> Result<Fetched, FetchError> {
        Ok(self.fetch(url).await)
    }

    async fn detail_page(&mut self, url: &str) -> Result<Fetched, FetchError> {
        // Every render request is isolated server-side; no state to protect.
        Ok(self.fetch(url).await)
    }

    async fn shutdown(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    fn label(&self) -> &'static str {
        "rendered-fetch"
    }
}
