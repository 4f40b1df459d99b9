pub mod adapter;
pub mod category;

pub use adapter::{parse_upstream_body, HttpSearchAdapter, SearchPort};
pub use category::category_keywords;
