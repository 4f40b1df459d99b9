//! Free-form language-model output is not guaranteed to be bare JSON — a
//! model might wrap its answer in prose or a fenced code block. This module
//! is the one place that pulls a JSON object back out (spec §4.6: "extracts
//! the first `{…}` substring if the model returned surrounding prose").

/// Extract the first parseable JSON value from `response`, trying a fenced
/// ` ```json ` block before falling back to the first `{` through the last
/// matching `}`.
pub fn extract_json_output<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    if let Some(fence_start) = response.find("```json") {
        let after_fence = &response[fence_start + "```json".len()..];
        if let Some(json_start) = after_fence.find(|c: char| !c.is_whitespace()) {
            let json_body = &after_fence[json_start..];
            if let Some(fence_end) = json_body.find("```") {
                let json_str = json_body[..fence_end].trim();
                if let Ok(val) = serde_json::from_str(json_str) {
                    return Some(val);
                }
            }
        }
    }

    let trimmed = response.trim();
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                let candidate = &trimmed[start..=end];
                if let Ok(val) = serde_json::from_str(candidate) {
                    return Some(val);
                }
            }
        }
    }

    None
}
