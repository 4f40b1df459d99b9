use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Upper bound on stored body text (spec §3, invariant iv).
pub const MAX_BODY_CHARS: usize = 20_000;

/// A single news item normalized and stored by the ingestion engine.
///
/// Identity is the triple `(scope, title, url)`; `id` is a deterministic
/// hash of that triple so the same article ingested twice yields the same
/// record (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    /// `YYYY-MM-DD`, always present — see [`crate::date::normalize_date`].
    pub date: String,
    pub body: Option<String>,
    pub keywords: BTreeSet<String>,
    /// Session ID this article is deduplicated and evicted under.
    pub scope: String,
    pub embedded: bool,
    pub category: Option<String>,
    pub sentiment: Option<String>,
}

/// `md5(title + "_" + url + "_" + scope)`, the stable ID named in spec §4.3.
pub fn article_id(title: &str, url: &str, scope: &str) -> String {
    let key = format!("{title}_{url}_{scope}");
    format!("{:x}", md5::compute(key.as_bytes()))
}

/// Collapse internal whitespace runs and trim a title, per spec §4.3 step 3a.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_url(raw: &str) -> String {
    raw.trim().to_string()
}

impl Article {
    /// Build a fresh article with a derived ID, no keywords, `embedded=false`.
    /// `title` and `url` must already be normalized (see [`normalize_title`],
    /// [`normalize_url`]); `date` must already be normalized (see
    /// [`crate::date::normalize_date`]).
    pub fn new(title: String, url: String, source: String, date: String, scope: String) -> Self {
        let id = article_id(&title, &url, &scope);
        Self {
            id,
            title,
            url,
            source,
            date,
            body: None,
            keywords: BTreeSet::new(),
            scope,
            embedded: false,
            category: None,
            sentiment: None,
        }
    }

    /// Identity key used for dedup lookups (spec §3 invariant i).
    pub fn identity(&self) -> (&str, &str, &str) {
        (self.scope.as_str(), self.title.as_str(), self.url.as_str())
    }

    /// Set body text, truncating to [`MAX_BODY_CHARS`] (invariant iv).
    pub fn set_body(&mut self, text: String) {
        if text.chars().count() > MAX_BODY_CHARS {
            self.body = Some(text.chars().take(MAX_BODY_CHARS).collect());
        } else {
            self.body = Some(text);
        }
    }

    /// Union `new_keywords` into the article's keyword set. Returns `true`
    /// if the set actually grew (spec §4.3 step 3c: "updated" only counts
    /// when `merged ⊋ existing`).
    pub fn merge_keywords<I>(&mut self, new_keywords: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.keywords.len();
        for kw in new_keywords {
            self.keywords.insert(kw);
        }
        self.keywords.len() > before
    }

    pub fn is_stale(&self, today: &str, expire_days: i64) -> bool {
        let Ok(cutoff) = stale_cutoff(today, expire_days) else {
            return false;
        };
        self.date.as_str() < cutoff.as_str()
    }
}

fn stale_cutoff(today: &str, expire_days: i64) -> Result<String, chrono::ParseError> {
    use chrono::NaiveDate;
    let today = NaiveDate::parse_from_str(today, "%Y-%m-%d")?;
    let cutoff = today - chrono::Duration::days(expire_days);
    Ok(cutoff.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_title_url_scope_yields_same_id() {
        let a = article_id("Title", "https://x.example/a", "scope-1");
        let b = article_id("Title", "https://x.example/a", "scope-1");
        assert_eq!(a, b);
    }

    #[test]
    fn different_scope_yields_different_id() {
        let a = article_id("Title", "https://x.example/a", "scope-1");
        let b = article_id("Title", "https://x.example/a", "scope-2");
        assert_ne!(a, b);
    }

    #[test]
    fn merge_keywords_reports_growth_only_when_set_grows() {
        let mut article = Article::new(
            "T".into(),
            "https://x.example".into(),
            "src".into(),
            "2026-07-20".into(),
            "scope".into(),
        );
        assert!(article.merge_keywords(["ai".to_string(), "chips".to_string()]));
        assert!(!article.merge_keywords(["ai".to_string()]));
        assert!(article.merge_keywords(["chips".to_string(), "markets".to_string()]));
        assert_eq!(article.keywords.len(), 3);
    }

    #[test]
    fn body_is_truncated_to_max_chars() {
        let mut article = Article::new(
            "T".into(),
            "https://x.example".into(),
            "src".into(),
            "2026-07-20".into(),
            "scope".into(),
        );
        let long = "a".repeat(MAX_BODY_CHARS + 500);
        article.set_body(long);
        assert_eq!(article.body.unwrap().chars().count(), MAX_BODY_CHARS);
    }

    #[test]
    fn title_whitespace_is_collapsed() {
        assert_eq!(normalize_title("  hello    world  "), "hello world");
    }

    #[test]
    fn stale_article_is_detected_by_lexicographic_cutoff() {
        let mut article = Article::new(
            "T".into(),
            "https://x.example".into(),
            "src".into(),
            "2026-07-20".into(),
            "scope".into(),
        );
        assert!(article.is_stale("2026-07-25", 3));
        article.date = "2026-07-24".into();
        assert!(!article.is_stale("2026-07-25", 3));
    }
}
