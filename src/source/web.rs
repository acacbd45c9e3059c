//! HTTP page source.
//!
//! Fetches a page with [`reqwest`], pretending to be a regular browser, and
//! reduces the HTML to its visible text with [`scraper`].  The text reduction
//! is a pure function ([`extract_text`]) so that tests can exercise it
//! without hitting the network.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::USER_AGENT;
use scraper::Html;
use tracing::debug;
use url::Url;

use super::ContentSource;
use crate::error::FetchError;

/// How long a single request may take before it counts as a failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Elements whose text is never rendered.  `<title>` text is kept.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A small pool of current desktop browser user-agents; one is picked at
/// random for every request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:130.0) Gecko/20100101 Firefox/130.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:130.0) Gecko/20100101 Firefox/130.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36 Edg/128.0.0.0",
];

/// A web page monitored over HTTP(S).
pub struct WebSource {
    url: String,
    client: reqwest::Client,
}

impl WebSource {
    /// Create a source for `url`.
    ///
    /// Fails if `url` does not parse or the HTTP client cannot be built
    /// (e.g. no TLS backend).
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_client(url.into(), reqwest::Client::builder())
    }

    fn with_client(url: String, builder: reqwest::ClientBuilder) -> Result<Self, FetchError> {
        Url::parse(&url).map_err(|e| FetchError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let client = builder.timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { url, client })
    }
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[async_trait]
impl ContentSource for WebSource {
    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        let ua = random_user_agent();
        debug!(url = %self.url, user_agent = ua, "fetching page");

        let resp = self
            .client
            .get(&self.url)
            .header(USER_AGENT, ua)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        Ok(extract_text(&body))
    }
}

/// Reduce an HTML document to its visible text.
///
/// Every text node outside [`HIDDEN_ELEMENTS`], `<title>` included, is trimmed; blank fragments
/// are dropped and the rest are joined with `\n` in document order.  The
/// output is deterministic for a given input.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    doc.tree
        .root()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                return None;
            }
            let fragment = text.trim();
            (!fragment.is_empty()).then_some(fragment)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
