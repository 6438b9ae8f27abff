//! Pricing variants as embedded in provider page data.
//!
//! A `Variant` is the provider's own representation of one pricing tier,
//! recovered from serialized component props. Field values arrive as strings
//! or numbers depending on the serializer, so extraction is lenient.

use serde_json::Value;

/// One price entry on a variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPrice {
    /// Currency code, e.g. "USD".
    pub currency: String,
    /// Amount as published (string form, parsed on demand).
    pub amount: String,
}

/// One pricing tier from embedded provider data.
#[derive(Debug, Clone, Default)]
pub struct Variant {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Validity in days, as published.
    pub days: Option<String>,
    /// Data amount, as published.
    pub gigas: Option<String>,
    /// Destination label, as published.
    pub destiny: Option<String>,
    pub prices: Vec<VariantPrice>,
}

impl Variant {
    /// Build a variant from a decoded JSON object; None for non-objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let prices = obj
            .get("prices")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let price = entry.as_object()?;
                        Some(VariantPrice {
                            currency: field_string(price.get("currency")?)?,
                            amount: field_string(price.get("amount")?)?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: obj.get("id").and_then(field_string),
            name: obj.get("name").and_then(field_string),
            days: obj.get("days").and_then(field_string),
            gigas: obj.get("gigas").and_then(field_string),
            destiny: obj.get("destiny").and_then(field_string),
            prices,
        })
    }

    /// Validity in days, 0 when missing or unparseable. Trailing text after
    /// the leading digits is ignored, so "7 days" parses as 7.
    pub fn parsed_days(&self) -> u32 {
        let digits: String = self
            .days
            .as_deref()
            .unwrap_or("")
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().unwrap_or(0)
    }

    /// Amount of the first price entry in the given currency.
    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.prices
            .iter()
            .find(|p| p.currency == currency)
            .and_then(|p| p.amount.trim().parse().ok())
    }
}

/// String form of a scalar JSON value; None for composites and null.
fn field_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variant_from_object_with_prices() {
        let value = json!({
            "id": 42,
            "name": "5 days",
            "days": "5",
            "destiny": "usa",
            "prices": [
                { "currency": "EUR", "amount": "17.90" },
                { "currency": "USD", "amount": "19.00" }
            ]
        });

        let variant = Variant::from_value(&value).unwrap();
        assert_eq!(variant.id.as_deref(), Some("42"));
        assert_eq!(variant.parsed_days(), 5);
        assert_eq!(variant.price_in("USD"), Some(19.00));
        assert_eq!(variant.price_in("EUR"), Some(17.90));
        assert_eq!(variant.price_in("GBP"), None);
    }

    #[test]
    fn test_variant_days_missing_or_bad() {
        let variant = Variant::from_value(&json!({ "days": "soon" })).unwrap();
        assert_eq!(variant.parsed_days(), 0);

        let variant = Variant::from_value(&json!({})).unwrap();
        assert_eq!(variant.parsed_days(), 0);

        let variant = Variant::from_value(&json!({ "days": "7 days" })).unwrap();
        assert_eq!(variant.parsed_days(), 7);
    }

    #[test]
    fn test_variant_rejects_non_object() {
        assert!(Variant::from_value(&json!([1, 2, 3])).is_none());
        assert!(Variant::from_value(&json!("plan")).is_none());
    }
}
