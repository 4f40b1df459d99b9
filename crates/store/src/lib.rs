pub mod cache;
pub mod collections;
pub mod document_store;
pub mod filter;

pub use cache::{CachePort, InMemoryCache};
pub use document_store::{AggregateGroup, DocumentStore, InMemoryDocumentStore};
pub use filter::{Filter, Sort, SortOrder};
