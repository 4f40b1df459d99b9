use std::collections::BTreeMap;

use serde_json::Value;

/// Equality filter over top-level document fields. Every named field must
/// equal the given value; this keeps the simplest predicate that covers
/// every caller in the workspace, rather than a general query language.
#[derive(Debug, Clone, Default)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.0.iter().all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn by(field: impl Into<String>, order: SortOrder) -> Self {
        Self { field: field.into(), order }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&json!({"a": 1})));
    }

    #[test]
    fn filter_requires_all_fields_to_match() {
        let filter = Filter::new().eq("scope", "s1").eq("title", "T");
        assert!(filter.matches(&json!({"scope": "s1", "title": "T", "extra": true})));
        assert!(!filter.matches(&json!({"scope": "s1", "title": "Other"})));
        assert!(!filter.matches(&json!({"scope": "s1"})));
    }
}
