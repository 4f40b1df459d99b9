//! Date normalization shared by the ingestion engine and the data model.
//!
//! Algorithm (spec §4.3): lowercase the raw string, then in order —
//! (1) a relative-time keyword (Chinese or English) maps to today;
//! (2) the first matching format in a fixed ordered list is parsed;
//! (3) otherwise fall back to today.
//!
//! A parsed date later than `today` is also clamped to `today` — the spec's
//! testable invariant (§8) requires `a.date <= today`, and a "future"
//! publication date is indistinguishable from a parse artifact (timezone
//! drift in the upstream feed) rather than a real scheduled-future article.

use chrono::{NaiveDate, Utc};

/// Keywords (Chinese and English) that indicate a relative timestamp such as
/// "3 hours ago" or "2天前" rather than an absolute date.
const RELATIVE_KEYWORDS: &[&str] = &[
    "ago",
    "just now",
    "hours ago",
    "minutes ago",
    "days ago",
    "weeks ago",
    "天前",
    "小时前",
    "分钟前",
    "周前",
    "刚刚",
];

/// Ordered list of absolute-date formats tried in turn. `%Y-%m-%d` is first
/// so that an already-normalized date round-trips without reinterpretation.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y年%m月%d日",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Today's date (UTC). Kept as a thin wrapper so callers needing
/// deterministic tests can instead construct a `NaiveDate` directly and
/// call [`normalize_date`].
pub fn todays_date() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn today_string(today: NaiveDate) -> String {
    today.format("%Y-%m-%d").to_string()
}

/// Normalize a raw, possibly relative or malformed date string into
/// `YYYY-MM-DD`, given `today` for relative resolution and clamping.
pub fn normalize_date(raw: &str, today: NaiveDate) -> String {
    let lower = raw.trim().to_lowercase();

    if lower.is_empty() {
        return today_string(today);
    }

    if RELATIVE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return today_string(today);
    }

    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw.trim(), fmt) {
            let clamped = if parsed > today { today } else { parsed };
            return today_string(clamped);
        }
    }

    today_string(today)
}

/// `true` if `date` is a well-formed `YYYY-MM-DD` string.
pub fn is_normalized(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}
