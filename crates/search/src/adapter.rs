use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use newsagent_core::search::{RawArticle, SearchRequest};
use newsagent_core::NewsAgentError;

/// Search Adapter (spec §4.1): one operation, tolerant of three upstream
/// response shapes.
#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawArticle>, NewsAgentError>;
}

/// Talks to an upstream news-search API shaped like `{engine, tbm=news, q,
/// num, hl, gl, tbs}` (spec §6).
#[derive(Debug, Clone)]
pub struct HttpSearchAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSearchAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchPort for HttpSearchAdapter {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawArticle>, NewsAgentError> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(NewsAgentError::ConfigMissing("SEARCH_API_KEY".into()));
        };

        let query = request.keywords.join(" ");
        let num = request.count.min(50).to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", "google"),
                ("tbm", "news"),
                ("q", query.as_str()),
                ("num", num.as_str()),
                ("hl", request.language.as_str()),
                ("gl", request.country.as_str()),
                ("tbs", request.time_window.upstream_code()),
                ("api_key", api_key),
            ])
            .send()
            .await
            .map_err(|e| NewsAgentError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NewsAgentError::UpstreamUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(NewsAgentError::UpstreamUnavailable(format!("{status}: {body}")));
        }

        Ok(parse_upstream_body(&body))
    }
}

/// Parse a raw upstream response body into uniform records, tolerating the
/// three shapes named in spec §4.1. A shape mismatch is a non-fatal parse
/// failure — it yields an empty list, not an error.
pub fn parse_upstream_body(body: &str) -> Vec<RawArticle> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items.iter().filter_map(record_from_value).collect(),
        Ok(Value::Object(ref obj)) => obj
            .get("news_results")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(record_from_value).collect())
            .unwrap_or_default(),
        Ok(_) => Vec::new(),
        Err(_) => parse_line_oriented(body),
    }
}

fn record_from_value(value: &Value) -> Option<RawArticle> {
    let title = value.get("title").and_then(Value::as_str)?.trim();
    let url = value
        .get("url")
        .or_else(|| value.get("link"))
        .and_then(Value::as_str)?
        .trim();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    Some(RawArticle {
        title: title.to_string(),
        url: url.to_string(),
        source: value
            .get("source")
            .and_then(|s| s.as_str().map(String::from).or_else(|| s.get("name").and_then(Value::as_str).map(String::from)))
            .unwrap_or_default(),
        snippet: value.get("snippet").and_then(Value::as_str).unwrap_or_default().to_string(),
        date: value.get("date").and_then(Value::as_str).unwrap_or_default().to_string(),
    })
}

/// Line-oriented fallback shape: `title|url|source|date`, one record per
/// line. Lines missing a title or url are dropped.
fn parse_line_oriented(body: &str) -> Vec<RawArticle> {
    body.lines()
        .filter_map(|line| {
            let mut fields = line.split('|').map(str::trim);
            let title = fields.next().unwrap_or_default();
            let url = fields.next().unwrap_or_default();
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(RawArticle {
                title: title.to_string(),
                url: url.to_string(),
                source: fields.next().unwrap_or_default().to_string(),
                snippet: String::new(),
                date: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_of_maps_shape() {
        let body = r#"[{"title":"A","url":"https://a","source":"S","date":"2026-07-20"}]"#;
        let parsed = parse_upstream_body(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "A");
    }

    #[test]
    fn parses_news_results_wrapper_shape() {
        let body = r#"{"news_results":[{"title":"A","url":"https://a"},{"title":"B","link":"https://b"}]}"#;
        let parsed = parse_upstream_body(body);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].url, "https://b");
    }

    #[test]
    fn parses_line_oriented_shape() {
        let body = "Title One|https://a|Source A|2026-07-20\nTitle Two|https://b|Source B|2026-07-19";
        let parsed = parse_upstream_body(body);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].source, "Source A");
    }

    #[test]
    fn drops_records_missing_title_or_url() {
        let body = r#"[{"title":"A"},{"url":"https://b"},{"title":"C","url":"https://c"}]"#;
        let parsed = parse_upstream_body(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "C");
    }

    #[test]
    fn unrecognized_shape_yields_empty_not_error() {
        let body = r#""just a string""#;
        assert!(parse_upstream_body(body).is_empty());
    }
}
