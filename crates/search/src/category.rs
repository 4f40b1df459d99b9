//! Category keyword expansions (spec.md §4.9 "search_general" leans on this
//! when the LM declines to produce keywords). Grounded on
//! `news_service.py::search_news_by_category`'s `category_queries` table,
//! translated from the original's closed Chinese category set into the
//! matching English category names.

pub fn category_keywords(category: &str) -> Option<&'static [&'static str]> {
    match category.to_lowercase().as_str() {
        "technology" | "科技" => Some(&["technology", "tech", "AI", "artificial intelligence"]),
        "sports" | "体育" => Some(&["sports", "football", "basketball", "soccer"]),
        "finance" | "财经" => Some(&["finance", "economy", "stock market", "markets"]),
        "entertainment" | "娱乐" => Some(&["entertainment", "celebrity", "movies", "music"]),
        "politics" | "政治" => Some(&["politics", "government", "policy"]),
        "health" | "健康" => Some(&["health", "medicine", "wellness"]),
        "education" | "教育" => Some(&["education", "schools", "university"]),
        "international" | "国际" => Some(&["international", "global", "world"]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_category_returns_keywords() {
        assert_eq!(
            category_keywords("technology"),
            Some(&["technology", "tech", "AI", "artificial intelligence"][..])
        );
    }

    #[test]
    fn unknown_category_returns_none() {
        assert!(category_keywords("astrology").is_none());
    }

    #[test]
    fn chinese_category_name_also_resolves() {
        assert!(category_keywords("科技").is_some());
    }
}
