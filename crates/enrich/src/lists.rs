//! spec §4.6 normalization: "lists serialized as maps are converted to
//! `key: value` strings preserving both key and value" and "entity maps
//! are converted to the list-of-records form". The model is asked for
//! arrays but sometimes emits an object instead; these helpers make either
//! shape usable without failing the whole analysis.

use serde_json::Value;

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts a JSON array of strings/scalars, a bare string, or an object
/// (converted to `"key: value"` entries); anything else yields an empty list.
pub fn normalize_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", scalar_to_string(v).unwrap_or_default()))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// `(name, entity_type_raw)` pairs from either a list of `{name, entity_type}`
/// records or a `{name: type}` map.
pub fn normalize_entity_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?.to_string();
                let entity_type = item
                    .get("entity_type")
                    .or_else(|| item.get("type"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("other")
                    .to_string();
                Some((name, entity_type))
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, ty)| (name.clone(), ty.as_str().unwrap_or("other").to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_of_strings_passes_through() {
        let value = json!(["ai", "chips"]);
        assert_eq!(normalize_string_list(Some(&value)), vec!["ai".to_string(), "chips".to_string()]);
    }

    #[test]
    fn object_becomes_key_value_strings() {
        let value = json!({"topic": "ai", "region": "us"});
        let list = normalize_string_list(Some(&value));
        assert!(list.contains(&"topic: ai".to_string()));
        assert!(list.contains(&"region: us".to_string()));
    }

    #[test]
    fn missing_field_yields_empty_list() {
        assert!(normalize_string_list(None).is_empty());
    }

    #[test]
    fn entity_list_of_records_parses_directly() {
        let value = json!([{"name": "OpenAI", "entity_type": "organization"}]);
        let pairs = normalize_entity_pairs(Some(&value));
        assert_eq!(pairs, vec![("OpenAI".to_string(), "organization".to_string())]);
    }

    #[test]
    fn entity_map_form_converts_to_pairs() {
        let value = json!({"OpenAI": "organization", "Paris": "location"});
        let pairs = normalize_entity_pairs(Some(&value));
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("OpenAI".to_string(), "organization".to_string())));
    }
}
