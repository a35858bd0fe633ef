//! Coercion of the free-form `extra_tags` column into searchable text.
//!
//! The column is JSONB and has been written by several tools over time, so it can hold
//! a mapping (`{"subsidy": 15000, "tags": ["charger included"]}`), a plain list, or a
//! scalar. Every shape is reduced to a single space-separated string.

use serde_json::Value;

/// The shapes a tag attribute can take.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// A single string.
    Text(String),
    /// A list of items. Nested lists and maps are flattened.
    List(Vec<TagValue>),
    /// A mapping. Only the values are searchable; keys are dropped.
    Map(Vec<TagValue>),
    /// Anything else (numbers, booleans), kept in display form.
    Other(String),
    /// `null` or absent.
    Empty,
}

impl TagValue {
    /// Build a tag value from an optional JSON column.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None => TagValue::Empty,
            Some(v) => TagValue::from(v),
        }
    }

    /// Flatten into the text stored in the `tags_text` field.
    pub fn to_search_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_parts(&mut parts);
        parts.join(" ")
    }

    fn collect_parts(&self, parts: &mut Vec<String>) {
        match self {
            TagValue::Text(s) | TagValue::Other(s) => {
                if !s.is_empty() {
                    parts.push(s.clone());
                }
            }
            TagValue::List(items) | TagValue::Map(items) => {
                for item in items {
                    item.collect_parts(parts);
                }
            }
            TagValue::Empty => {}
        }
    }
}

impl From<&Value> for TagValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => TagValue::Empty,
            Value::String(s) => TagValue::Text(s.clone()),
            Value::Array(items) => TagValue::List(items.iter().map(TagValue::from).collect()),
            Value::Object(map) => TagValue::Map(map.values().map(TagValue::from).collect()),
            other => TagValue::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_values_are_joined() {
        let value = json!({"subsidy": 15000, "promo": "free charger"});
        let text = TagValue::from(&value).to_search_text();

        // serde_json keeps object keys sorted
        assert_eq!(text, "free charger 15000");
    }

    #[test]
    fn test_map_with_nested_list() {
        let value = json!({"tags": ["charger included", "no purchase tax"]});
        assert_eq!(
            TagValue::from(&value).to_search_text(),
            "charger included no purchase tax"
        );
    }

    #[test]
    fn test_list_and_scalar() {
        assert_eq!(TagValue::from(&json!(["a", 1, true])).to_search_text(), "a 1 true");
        assert_eq!(TagValue::from(&json!("hybrid")).to_search_text(), "hybrid");
        assert_eq!(TagValue::from(&json!(4.5)).to_search_text(), "4.5");
    }

    #[test]
    fn test_empty_shapes() {
        assert_eq!(TagValue::from_json(None).to_search_text(), "");
        assert_eq!(TagValue::from(&Value::Null).to_search_text(), "");
        assert_eq!(TagValue::from(&json!({})).to_search_text(), "");
        assert_eq!(TagValue::from(&json!([null, ""])).to_search_text(), "");
    }
}
