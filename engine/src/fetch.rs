//! Page fetching behind a narrow trait so the crawler can be driven by an
//! in-memory site in tests.

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_REDIRECTS: usize = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

/// Delivers raw page text, or `None` when the page cannot be used.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Option<String>;
}

/// Blocking HTTP fetcher: limited redirects, only successful `text/html`
/// responses are returned.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(max_redirects: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("word-position-search-bot/0.1")
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Option<String> {
        let response = match self.client.get(url.clone()).send() {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%url, %err, "fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(%url, status = %response.status(), "skipping non-success response");
            return None;
        }
        if let Some(content_type) = response.headers().get(header::CONTENT_TYPE) {
            if let Ok(value) = content_type.to_str() {
                if !value.starts_with("text/html") {
                    return None;
                }
            }
        }
        response.text().ok()
    }
}
