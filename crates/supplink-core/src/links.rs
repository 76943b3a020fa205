use serde::{Deserialize, Serialize};

/// A purchasable product page found for an item on an approved brand domain.
///
/// `price` and `rating` are `0.0` when the search result did not expose them;
/// that is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLink {
    pub url: String,
    pub price: f64,
    pub rating: f64,
    /// Display name of the brand that owns the URL's domain.
    pub brand: String,
}

/// Canonical storage key for an item: trimmed and lower-cased.
///
/// Returns `None` when nothing is left after trimming.
#[must_use]
pub fn normalize_item_key(item: &str) -> Option<String> {
    let key = item.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_item_key_trims_and_lowercases() {
        assert_eq!(
            normalize_item_key("  Magnesium Glycinate \n").as_deref(),
            Some("magnesium glycinate")
        );
    }

    #[test]
    fn normalize_item_key_rejects_blank() {
        assert_eq!(normalize_item_key(""), None);
        assert_eq!(normalize_item_key("   \t"), None);
    }

    #[test]
    fn product_link_serializes_with_flat_fields() {
        let link = ProductLink {
            url: "https://www.thorne.com/products/magnesium-glycinate".to_string(),
            price: 18.0,
            rating: 0.0,
            brand: "Thorne".to_string(),
        };
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "url": "https://www.thorne.com/products/magnesium-glycinate",
                "price": 18.0,
                "rating": 0.0,
                "brand": "Thorne"
            })
        );
    }
}
