//! Response-quality and context-relevance scoring (spec §4.11): "a
//! response-quality score (length buckets + personalization bit + memory-
//! used bit + news-context bit), and a context-relevance score (keyword
//! overlap + news presence)". Neither formula is specified further in
//! spec.md; the weights below are a deployment-time policy choice, recorded
//! in DESIGN.md.

/// Length bucket contributes up to 0.4 of the quality score: a useless
/// one-liner scores low, a fully-formed answer scores high, an implausibly
/// long dump doesn't score extra.
fn length_bucket_score(text: &str) -> f64 {
    match text.chars().count() {
        0 => 0.0,
        1..=40 => 0.15,
        41..=200 => 0.3,
        _ => 0.4,
    }
}

/// `quality_score(response, personalized, memory_used, has_news_context) ->
/// [0, 1]` (spec §4.11).
pub fn response_quality_score(text: &str, personalized: bool, memory_used: bool, has_news_context: bool) -> f64 {
    let mut score = length_bucket_score(text);
    if personalized {
        score += 0.2;
    }
    if memory_used {
        score += 0.2;
    }
    if has_news_context {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// Fraction of `query`'s distinct words (lowercased, length > 1) that appear
/// in `response`.
fn keyword_overlap(query: &str, response: &str) -> f64 {
    let response_lower = response.to_lowercase();
    let query_words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 1)
        .collect();

    if query_words.is_empty() {
        return 0.0;
    }

    let matched = query_words.iter().filter(|w| response_lower.contains(w.as_str())).count();
    matched as f64 / query_words.len() as f64
}

/// `context_relevance_score(query, response, news_present) -> [0, 1]` (spec
/// §4.11): keyword overlap weighted 0.7, a flat 0.3 bonus when the response
/// is actually grounded in retrieved news.
pub fn context_relevance_score(query: &str, response: &str, news_present: bool) -> f64 {
    let overlap = keyword_overlap(query, response) * 0.7;
    let news_bonus = if news_present { 0.3 } else { 0.0 };
    (overlap + news_bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_scores_zero_quality() {
        assert_eq!(response_quality_score("", false, false, false), 0.0);
    }

    #[test]
    fn full_bonuses_cap_at_one() {
        let score = response_quality_score(&"word ".repeat(100), true, true, true);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn longer_answers_score_higher_length_bucket() {
        assert!(response_quality_score("short", false, false, false) < response_quality_score(&"word ".repeat(50), false, false, false));
    }

    #[test]
    fn keyword_overlap_rewards_shared_terms() {
        let score = context_relevance_score("AI chips news", "Today's AI chips coverage expands.", true);
        assert!(score > 0.3);
    }

    #[test]
    fn no_overlap_and_no_news_scores_zero() {
        assert_eq!(context_relevance_score("markets", "Totally unrelated text.", false), 0.0);
    }
}
