use std::collections::HashSet;

use scraper::ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};

const MAX_BODY_CHARS: usize = 20_000;
const MIN_SELECTOR_MATCH_LEN: usize = 200;
const MIN_BLOCK_TEXT_LEN: usize = 20;

const NOISE_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside"];

/// Structural selectors tried in order (spec §4.2): article tags, common
/// body-class names, `[role=main]`.
const CANDIDATE_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"]",
    "main",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".article-content",
    ".content",
];

const BLOCK_TAGS: &[&str] = &["p", "div", "li", "td", "blockquote"];

/// Extract a bounded, cleaned body-text excerpt from raw HTML (spec §4.2).
/// Never panics on malformed input; worst case returns an empty string.
pub fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let noise: HashSet<&str> = NOISE_TAGS.iter().copied().collect();

    for selector_str in CANDIDATE_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else { continue };
        if let Some(element) = document.select(&selector).next() {
            let cleaned = clean_text(&collect_text(element, &noise));
            if cleaned.chars().count() > MIN_SELECTOR_MATCH_LEN {
                return truncate_with_ellipsis(&cleaned, MAX_BODY_CHARS);
            }
        }
    }

    // No selector produced enough text: concatenate block elements instead.
    let mut blocks = Vec::new();
    for tag in BLOCK_TAGS {
        let Ok(selector) = Selector::parse(tag) else { continue };
        for element in document.select(&selector) {
            let text = clean_text(&collect_text(element, &noise));
            if text.chars().count() > MIN_BLOCK_TEXT_LEN {
                blocks.push(text);
            }
        }
    }

    truncate_with_ellipsis(&clean_text(&blocks.join(" ")), MAX_BODY_CHARS)
}

/// Collect text under `element`, skipping any subtree rooted at a noise tag.
/// Recurses over the underlying `ego_tree` node rather than scraper's text
/// iterator so a `<script>` nested inside a kept element still gets dropped.
fn collect_text(element: ElementRef, noise: &HashSet<&str>) -> String {
    let mut out = String::new();
    collect_text_into(*element, noise, &mut out);
    out
}

fn collect_text_into(node: NodeRef<Node>, noise: &HashSet<&str>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(el) => {
            if noise.contains(el.name()) {
                return;
            }
            for child in node.children() {
                collect_text_into(child, noise, out);
                out.push(' ');
            }
        }
        _ => {}
    }
}

/// Collapse whitespace runs and drop characters that are neither CJK nor
/// common Latin sentence punctuation.
fn clean_text(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .filter(|c| {
            c.is_whitespace()
                || c.is_alphanumeric()
                || matches!(
                    c,
                    '.' | ',' | '!' | '?' | ':' | ';' | '\'' | '"' | '-' | '(' | ')' | '%' | '/'
                        | '。' | '，' | '、' | '!' | '?' | '：' | '；' | '“' | '”' | '—'
                )
        })
        .collect()
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_article_tag_content() {
        let body_text = "word ".repeat(60);
        let html = format!("<html><body><nav>menu</nav><article><p>{body_text}</p></article></body></html>");
        let extracted = extract_body_text(&html);
        assert!(extracted.contains("word"));
        assert!(!extracted.contains("menu"));
    }

    #[test]
    fn skips_nested_script_inside_kept_element() {
        let body_text = "content ".repeat(40);
        let html = format!(
            "<html><body><article><script>evil()</script><p>{body_text}</p></article></body></html>"
        );
        let extracted = extract_body_text(&html);
        assert!(extracted.contains("content"));
        assert!(!extracted.contains("evil"));
    }

    #[test]
    fn falls_back_to_paragraphs_when_no_selector_matches() {
        let html = "<html><body><div><p>This paragraph has more than twenty characters easily.</p></div></body></html>";
        let extracted = extract_body_text(html);
        assert!(extracted.contains("paragraph"));
    }

    #[test]
    fn short_content_yields_empty_string() {
        let html = "<html><body><p>short</p></body></html>";
        assert_eq!(extract_body_text(html), "");
    }

    #[test]
    fn truncates_to_max_body_chars() {
        let long_text = "a".repeat(MAX_BODY_CHARS + 500);
        let html = format!("<html><body><article><p>{long_text}</p></article></body></html>");
        let extracted = extract_body_text(&html);
        assert!(extracted.chars().count() <= MAX_BODY_CHARS + 1);
        assert!(extracted.ends_with('…'));
    }

    #[test]
    fn strips_malformed_html_without_panicking() {
        let extracted = extract_body_text("<html><body><article><p>unterminated");
        assert_eq!(extracted, "");
    }
}
