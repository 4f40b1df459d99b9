//! The single mapping layer between free-form language-model labels and the
//! card's closed enums (spec §4.6, §9 "Free-form model output"). Every card
//! field that holds an enum value passes through here; nothing else in the
//! workspace is allowed to special-case a raw label.
//!
//! Unknown input maps to the documented default (medium / moderate / neutral)
//! and the mapping function reports whether it had to fall back, so the
//! caller can attach a warning to the card's generation metadata.

use crate::card::{CredibilityLevel, DifficultyLevel, EntityType, ImportanceLevel, SentimentConfidence, SentimentLabel};

/// Result of a normalization: the canonical value, and whether the input
/// was recognized directly (`false`) or fell back to the default (`true`).
pub struct Mapped<T> {
    pub value: T,
    pub fell_back: bool,
}

fn matches_any(raw: &str, candidates: &[&str]) -> bool {
    candidates.iter().any(|c| raw == *c)
}

pub fn normalize_importance_level(raw: &str) -> Mapped<ImportanceLevel> {
    let raw = raw.trim().to_lowercase();
    if matches_any(&raw, &["critical", "urgent", "极高", "极为重要", "非常重要"]) {
        return Mapped { value: ImportanceLevel::Critical, fell_back: false };
    }
    if matches_any(&raw, &["high", "important", "重要", "较高", "高"]) {
        return Mapped { value: ImportanceLevel::High, fell_back: false };
    }
    if matches_any(&raw, &["medium", "moderate", "中等", "一般", "普通"]) {
        return Mapped { value: ImportanceLevel::Medium, fell_back: false };
    }
    if matches_any(&raw, &["low", "较低", "低"]) {
        return Mapped { value: ImportanceLevel::Low, fell_back: false };
    }
    if matches_any(&raw, &["minimal", "negligible", "极低", "不重要", "无关紧要"]) {
        return Mapped { value: ImportanceLevel::Minimal, fell_back: false };
    }
    Mapped { value: ImportanceLevel::Medium, fell_back: true }
}

pub fn normalize_credibility_level(raw: &str) -> Mapped<CredibilityLevel> {
    let raw = raw.trim().to_lowercase();
    if matches_any(&raw, &["verified", "已验证", "非常可信"]) {
        return Mapped { value: CredibilityLevel::Verified, fell_back: false };
    }
    if matches_any(&raw, &["reliable", "可信", "可靠"]) {
        return Mapped { value: CredibilityLevel::Reliable, fell_back: false };
    }
    // "中等偏低可信度" is deliberately folded into `moderate`, not
    // `questionable` — see DESIGN.md for the open-question decision.
    if matches_any(&raw, &["moderate", "中等", "一般", "中等偏低可信度", "中等偏低"]) {
        return Mapped { value: CredibilityLevel::Moderate, fell_back: false };
    }
    if matches_any(&raw, &["questionable", "存疑", "可疑"]) {
        return Mapped { value: CredibilityLevel::Questionable, fell_back: false };
    }
    if matches_any(&raw, &["unverified", "未验证", "不可信"]) {
        return Mapped { value: CredibilityLevel::Unverified, fell_back: false };
    }
    Mapped { value: CredibilityLevel::Moderate, fell_back: true }
}

pub fn normalize_sentiment_label(raw: &str) -> Mapped<SentimentLabel> {
    let raw = raw.trim().to_lowercase();
    if matches_any(&raw, &["positive", "积极", "正面"]) {
        return Mapped { value: SentimentLabel::Positive, fell_back: false };
    }
    if matches_any(&raw, &["negative", "消极", "负面"]) {
        return Mapped { value: SentimentLabel::Negative, fell_back: false };
    }
    if matches_any(&raw, &["mixed", "复杂", "混合"]) {
        return Mapped { value: SentimentLabel::Mixed, fell_back: false };
    }
    if matches_any(&raw, &["neutral", "中性"]) {
        return Mapped { value: SentimentLabel::Neutral, fell_back: false };
    }
    Mapped { value: SentimentLabel::Neutral, fell_back: true }
}

pub fn normalize_sentiment_confidence(raw: &str) -> Mapped<SentimentConfidence> {
    let raw = raw.trim().to_lowercase();
    if matches_any(&raw, &["high", "高"]) {
        return Mapped { value: SentimentConfidence::High, fell_back: false };
    }
    if matches_any(&raw, &["medium", "中", "中等"]) {
        return Mapped { value: SentimentConfidence::Medium, fell_back: false };
    }
    if matches_any(&raw, &["low", "低"]) {
        return Mapped { value: SentimentConfidence::Low, fell_back: false };
    }
    Mapped { value: SentimentConfidence::Medium, fell_back: true }
}

pub fn normalize_difficulty_level(raw: &str) -> Mapped<DifficultyLevel> {
    let raw = raw.trim().to_lowercase();
    if matches_any(&raw, &["easy", "简单", "容易"]) {
        return Mapped { value: DifficultyLevel::Easy, fell_back: false };
    }
    if matches_any(&raw, &["hard", "difficult", "困难", "难"]) {
        return Mapped { value: DifficultyLevel::Hard, fell_back: false };
    }
    if matches_any(&raw, &["medium", "中等", "一般"]) {
        return Mapped { value: DifficultyLevel::Medium, fell_back: false };
    }
    Mapped { value: DifficultyLevel::Medium, fell_back: true }
}

pub fn normalize_entity_type(raw: &str) -> Mapped<EntityType> {
    let raw = raw.trim().to_lowercase();
    if matches_any(&raw, &["person", "people", "人物", "人"]) {
        return Mapped { value: EntityType::Person, fell_back: false };
    }
    if matches_any(&raw, &["organization", "org", "company", "组织", "机构", "公司"]) {
        return Mapped { value: EntityType::Organization, fell_back: false };
    }
    if matches_any(&raw, &["location", "place", "地点", "地址", "位置"]) {
        return Mapped { value: EntityType::Location, fell_back: false };
    }
    if matches_any(&raw, &["other", "其它", "其他"]) {
        return Mapped { value: EntityType::Other, fell_back: false };
    }
    Mapped { value: EntityType::Other, fell_back: true }
}

pub fn clamp_score(value: f64, min: f64, max: f64) -> f64 {
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_value_maps_to_itself() {
        for v in [
            ImportanceLevel::Critical,
            ImportanceLevel::High,
            ImportanceLevel::Medium,
            ImportanceLevel::Low,
            ImportanceLevel::Minimal,
        ] {
            let mapped = normalize_importance_level(v.as_str());
            assert_eq!(mapped.value, v);
            assert!(!mapped.fell_back);
        }
    }

    #[test]
    fn chinese_synonyms_map_to_canonical_importance() {
        assert_eq!(normalize_importance_level("极高").value, ImportanceLevel::Critical);
        assert_eq!(normalize_importance_level("重要").value, ImportanceLevel::High);
    }

    #[test]
    fn chinese_sentiment_synonyms_map_to_canonical() {
        assert_eq!(normalize_sentiment_label("积极").value, SentimentLabel::Positive);
        assert_eq!(normalize_sentiment_label("负面").value, SentimentLabel::Negative);
    }

    #[test]
    fn ambiguous_credibility_string_folds_to_moderate() {
        assert_eq!(normalize_credibility_level("中等偏低可信度").value, CredibilityLevel::Moderate);
    }

    #[test]
    fn unknown_label_falls_back_to_documented_default() {
        let mapped = normalize_importance_level("garbled-output");
        assert_eq!(mapped.value, ImportanceLevel::Medium);
        assert!(mapped.fell_back);

        let mapped = normalize_credibility_level("garbled-output");
        assert_eq!(mapped.value, CredibilityLevel::Moderate);
        assert!(mapped.fell_back);

        let mapped = normalize_sentiment_label("garbled-output");
        assert_eq!(mapped.value, SentimentLabel::Neutral);
        assert!(mapped.fell_back);
    }

    #[test]
    fn entity_type_synonyms_map_to_canonical() {
        assert_eq!(normalize_entity_type("组织").value, crate::card::EntityType::Organization);
        assert_eq!(normalize_entity_type("company").value, crate::card::EntityType::Organization);
        let mapped = normalize_entity_type("spaceship");
        assert_eq!(mapped.value, crate::card::EntityType::Other);
        assert!(mapped.fell_back);
    }

    #[test]
    fn scores_are_clamped_into_range() {
        assert_eq!(clamp_score(15.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp_score(-5.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp_score(0.5, -1.0, 1.0), 0.5);
    }
}
