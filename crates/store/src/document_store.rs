use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use newsagent_core::NewsAgentError;

use crate::filter::{Filter, Sort, SortOrder};

/// One group produced by [`DocumentStore::aggregate`]: the distinct value of
/// the grouped field, paired with the count of matching documents that share
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateGroup {
    pub key: Value,
    pub count: u64,
}

/// Document datastore port (spec §6): insert-one, find-one, find-many with
/// filter and sort, update-one, delete-one, delete-many, count, and simple
/// aggregation (group, sort, limit).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, doc: Value) -> Result<String, NewsAgentError>;
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, NewsAgentError>;
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, NewsAgentError>;
    async fn update_one(&self, collection: &str, filter: &Filter, update: Value) -> Result<bool, NewsAgentError>;
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, NewsAgentError>;
    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, NewsAgentError>;
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, NewsAgentError>;

    /// Groups matching documents by the value of `group_by`, counts each
    /// group, then sorts and limits the groups (not the underlying
    /// documents). `sort.field` of `"count"` orders by the group size;
    /// anything else orders by the group key.
    async fn aggregate(
        &self,
        collection: &str,
        filter: &Filter,
        group_by: &str,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateGroup>, NewsAgentError>;
}

/// One collection's documents plus an `_id` → index lookup, the same shape
/// as the teacher's `MemoryStore` (entries `Vec` + `by_id` `HashMap`),
/// generalized from a fixed `MemoryEntry` to an arbitrary JSON document.
#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Value>,
    by_id: HashMap<String, usize>,
}

impl Collection {
    fn insert(&mut self, mut doc: Value, id: String) {
        doc["_id"] = Value::String(id.clone());
        let idx = self.docs.len();
        self.by_id.insert(id, idx);
        self.docs.push(doc);
    }

    fn reindex(&mut self) {
        self.by_id = self
            .docs
            .iter()
            .filter_map(|d| d.get("_id").and_then(|v| v.as_str()).map(String::from))
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
    }
}

/// Reference implementation of [`DocumentStore`] backing every other
/// crate's tests and the demo binary. Not a real database — no durability,
/// no transactions — but honours the same port contract a Mongo-backed
/// implementation would.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_docs(docs: &mut [Value], sort: &Sort) {
    docs.sort_by(|a, b| {
        let av = a.get(&sort.field);
        let bv = b.get(&sort.field);
        let ordering = compare_values(av, bv);
        match sort.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_one(&self, collection: &str, doc: Value) -> Result<String, NewsAgentError> {
        let id = doc
            .get("_id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().insert(doc, id.clone());
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, NewsAgentError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, NewsAgentError> {
        let collections = self.collections.read().await;
        let mut matched: Vec<Value> = collections
            .get(collection)
            .map(|c| c.docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = sort {
            sort_docs(&mut matched, sort);
        }
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, update: Value) -> Result<bool, NewsAgentError> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let Some(doc) = coll.docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(false);
        };

        if let (Some(target), Some(patch)) = (doc.as_object_mut(), update.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(true)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, NewsAgentError> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = coll.docs.len();
        let mut removed = false;
        coll.docs.retain(|d| {
            if !removed && filter.matches(d) {
                removed = true;
                false
            } else {
                true
            }
        });
        if coll.docs.len() < before {
            coll.reindex();
        }
        Ok(removed)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, NewsAgentError> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = coll.docs.len();
        coll.docs.retain(|d| !filter.matches(d));
        let removed = before.saturating_sub(coll.docs.len());
        if removed > 0 {
            coll.reindex();
        }
        Ok(removed as u64)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, NewsAgentError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn aggregate(
        &self,
        collection: &str,
        filter: &Filter,
        group_by: &str,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateGroup>, NewsAgentError> {
        let collections = self.collections.read().await;
        let matched: Vec<&Value> =
            collections.get(collection).map(|c| c.docs.iter().filter(|d| filter.matches(d)).collect()).unwrap_or_default();

        let mut by_key: BTreeMap<String, AggregateGroup> = BTreeMap::new();
        for doc in matched {
            let key = doc.get(group_by).cloned().unwrap_or(Value::Null);
            by_key.entry(key.to_string()).or_insert_with(|| AggregateGroup { key, count: 0 }).count += 1;
        }

        let mut groups: Vec<AggregateGroup> = by_key.into_values().collect();
        if let Some(sort) = sort {
            groups.sort_by(|a, b| {
                let ordering = if sort.field == "count" {
                    a.count.cmp(&b.count)
                } else {
                    compare_values(Some(&a.key), Some(&b.key))
                };
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = limit {
            groups.truncate(limit);
        }
        Ok(groups)
    }
}
