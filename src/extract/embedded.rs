//! Embedded component-data decoding.
//!
//! Some provider pages ship their pricing tables as serialized component
//! props rather than visible markup. The props value is an HTML-escaped JSON
//! document in a tagged-tuple encoding: `[0, payload]` wraps a primitive
//! leaf, `[1, children]` a composite node. Decoding recovers plain JSON,
//! from which the variant list is pulled and filtered down to the validity
//! tiers worth tracking.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{DataAllowance, ScrapedPlan, Variant};

/// Validity tiers kept from variant dumps.
const TARGET_DAYS: &[u32] = &[1, 3, 5, 7, 10, 14, 15, 20, 30, 60, 90];

/// Recursion bound for the variants search.
const MAX_SEARCH_DEPTH: usize = 10;

static PROPS_ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"props="([^"]+)""#).unwrap());

/// Tag discriminants of the component serialization format.
enum Tagged<'a> {
    /// `[0, payload]`, a primitive leaf whose payload may itself be tagged.
    Leaf(&'a Value),
    /// `[1, children]`, a composite node.
    Node(&'a Value),
}

impl<'a> Tagged<'a> {
    /// Classify a two-element `[tag, payload]` array; anything else is plain.
    fn classify(value: &'a Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != 2 {
            return None;
        }
        match items[0].as_i64() {
            Some(0) => Some(Self::Leaf(&items[1])),
            Some(1) => Some(Self::Node(&items[1])),
            _ => None,
        }
    }
}

/// Decode a tagged-tuple value into plain JSON.
///
/// Untagged arrays and objects are decoded element-wise; scalars pass
/// through, so decoding an already-decoded value is the identity.
pub fn decode(value: &Value) -> Value {
    match Tagged::classify(value) {
        Some(Tagged::Leaf(payload)) => decode(payload),
        Some(Tagged::Node(children)) => decode_node(children),
        None => match value {
            Value::Array(items) => Value::Array(items.iter().map(decode).collect()),
            Value::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), decode(v))).collect())
            }
            scalar => scalar.clone(),
        },
    }
}

/// Decode a composite node: a list of `[string, value]` pairs becomes an
/// object, any other list is positional.
fn decode_node(children: &Value) -> Value {
    let Value::Array(entries) = children else {
        return decode(children);
    };

    if looks_like_pairs(entries) {
        let mut object = serde_json::Map::new();
        for entry in entries {
            if let Some(pair) = entry.as_array() {
                if pair.len() == 2 {
                    if let Value::String(key) = decode(&pair[0]) {
                        object.insert(key, decode(&pair[1]));
                    }
                }
            }
        }
        return Value::Object(object);
    }

    Value::Array(entries.iter().map(decode).collect())
}

fn looks_like_pairs(entries: &[Value]) -> bool {
    entries.first().map_or(false, |first| {
        first
            .as_array()
            .map_or(false, |pair| pair.len() == 2 && pair[0].is_string())
    })
}

/// Recursively locate a `variants` (or `Variants`) entry, bounded by depth.
fn find_variants(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Array(items) => items.iter().find_map(|item| find_variants(item, depth + 1)),
        Value::Object(map) => {
            for key in ["variants", "Variants"] {
                if let Some(found) = map.get(key) {
                    if !found.is_null() {
                        return Some(found);
                    }
                }
            }
            map.values()
                .find_map(|nested| find_variants(nested, depth + 1))
        }
        _ => None,
    }
}

/// Raw serialized props of the first component mentioning variants.
fn variant_props(html: &str) -> Option<&str> {
    PROPS_ATTR
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|attr| attr.as_str())
        .find(|attr| attr.contains("&quot;variants&quot;") || attr.contains("&quot;Variants&quot;"))
}

/// Undo the HTML entity escaping applied to attribute values.
fn unescape_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#x27;", "'")
}

/// Decode the embedded variant list from full page markup. Returns an empty
/// list when no component carries variants or the payload does not parse.
pub fn decode_variants(html: &str) -> Vec<Variant> {
    let Some(raw) = variant_props(html) else {
        debug!("No variants found in embedded component props");
        return Vec::new();
    };

    let parsed: Value = match serde_json::from_str(&unescape_entities(raw)) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse embedded props as JSON: {}", e);
            return Vec::new();
        }
    };

    let Some(tagged) = find_variants(&parsed, 0) else {
        debug!("Parsed props carry no variants entry");
        return Vec::new();
    };

    let Value::Array(items) = decode(tagged) else {
        debug!("Decoded variants entry is not a list");
        return Vec::new();
    };

    debug!("Decoded {} variants from embedded props", items.len());
    items.iter().filter_map(Variant::from_value).collect()
}

/// Extract unlimited plans from a page that embeds its pricing as variant
/// data. Variants outside the tracked validity tiers or without a USD price
/// entry are skipped.
pub fn extract_unlimited_plans(html: &str, country_code: &str, page_url: &str) -> Vec<ScrapedPlan> {
    let mut plans = Vec::new();
    for variant in decode_variants(html) {
        let days = variant.parsed_days();
        if !TARGET_DAYS.contains(&days) {
            continue;
        }

        let Some(price) = variant.price_in("USD") else {
            debug!("No USD price found for {} days variant", days);
            continue;
        };

        plans.push(ScrapedPlan::new(
            format!("{} Unlimited - {} Days", country_code, days),
            country_code,
            DataAllowance::Unlimited,
            days,
            price,
            page_url.to_string(),
        ));
    }

    debug!(
        "Extracted {} plans for target day values from {}",
        plans.len(),
        country_code
    );
    plans
}
