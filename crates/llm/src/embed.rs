use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use newsagent_core::NewsAgentError;

/// Language-model embedding port (spec §6): a list of strings in, a list of
/// fixed-dimension float vectors out.
#[async_trait]
pub trait EmbedPort: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NewsAgentError>;
    fn dimension(&self) -> usize;
}

/// OpenAI-compatible `/embeddings` implementation. Shares the chat port's
/// base URL and key — the spec names no separate embedding endpoint
/// credentials, see DESIGN.md.
#[derive(Debug, Clone)]
pub struct HttpEmbedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbedClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbedPort for HttpEmbedClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NewsAgentError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NewsAgentError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NewsAgentError::ParseFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(NewsAgentError::UpstreamUnavailable(format!("{status}: {body}")));
        }

        let data = body
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| NewsAgentError::ParseFailed("missing data[]".into()))?;

        data.iter()
            .map(|item| {
                item.get("embedding")
                    .and_then(|e| e.as_array())
                    .map(|vals| {
                        vals.iter()
                            .filter_map(|v| v.as_f64())
                            .map(|v| v as f32)
                            .collect::<Vec<f32>>()
                    })
                    .ok_or_else(|| NewsAgentError::ParseFailed("missing embedding[]".into()))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_reports_configured_dimension() {
        let client = HttpEmbedClient::new("http://x", "key", "model", 1536);
        assert_eq!(client.dimension(), 1536);
    }
}
