mod extract;

use std::time::Duration;

use async_trait::async_trait;

pub use extract::extract_body_text;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Content Fetcher (spec §4.2): never returns an error, only body text or
/// an empty string when the page could not be retrieved or parsed.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .expect("reqwest client builds"),
        }
    }
}

impl Default for HttpContentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> String {
        let response = match self.client.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(url, status = %r.status(), "fetch: non-success status");
                return String::new();
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "fetch: request failed");
                return String::new();
            }
        };

        match response.text().await {
            Ok(html) => extract_body_text(&html),
            Err(e) => {
                tracing::debug!(url, error = %e, "fetch: body read failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_is_browser_like() {
        assert!(USER_AGENT.contains("Mozilla"));
    }

    #[test]
    fn client_builds_without_panicking() {
        let _fetcher = HttpContentFetcher::new();
    }
}
