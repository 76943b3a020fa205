use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record from the search provider, kept as untyped JSON.
///
/// The provider has no fixed schema: prices arrive as numbers, currency
/// strings, or only inside free text. Accessors return empty values instead
/// of failing when a field is missing or has an unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSearchResult(Map<String, Value>);

impl RawSearchResult {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wraps a JSON value, or returns `None` if it is not an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a string field, or `None` if absent or not a string.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn link(&self) -> &str {
        self.text("link").unwrap_or_default()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.text("title").unwrap_or_default()
    }

    #[must_use]
    pub fn snippet(&self) -> &str {
        self.text("snippet").unwrap_or_default()
    }

    /// Merchant name as reported by the provider (e.g. `"Thorne"`).
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.text("source")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(RawSearchResult::from_value(json!("just a string")).is_none());
        assert!(RawSearchResult::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn accessors_tolerate_missing_and_mistyped_fields() {
        let raw = RawSearchResult::from_value(json!({ "title": 42 })).unwrap();
        assert_eq!(raw.link(), "");
        assert_eq!(raw.title(), "");
        assert_eq!(raw.snippet(), "");
        assert!(raw.source().is_none());
    }

    #[test]
    fn accessors_read_string_fields() {
        let raw = RawSearchResult::from_value(json!({
            "link": "https://www.thorne.com/products/zinc",
            "title": "Zinc Picolinate",
            "snippet": "30mg capsules",
            "source": "Thorne"
        }))
        .unwrap();
        assert_eq!(raw.link(), "https://www.thorne.com/products/zinc");
        assert_eq!(raw.title(), "Zinc Picolinate");
        assert_eq!(raw.snippet(), "30mg capsules");
        assert_eq!(raw.source(), Some("Thorne"));
    }
}
