//! Structured representation of the product data embedded in a storefront page.
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The parsed feed: shop metadata plus products in page order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedDocument {
    pub shop: Shop,
    /// Output order follows this order.
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Shop {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub url: String,
    /// Falsy values (`""`, `0`, `false`) decode as `None`.
    #[serde(deserialize_with = "truthy_text")]
    pub description: Option<String>,
}

impl Shop {
    /// The channel description, falling back to the shop name when the
    /// page gives none (or an empty one).
    pub fn description_or_name(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.name)
    }
}

/// A single product.
///
/// Identifiers are assumed unique upstream; nothing here enforces it.
/// Fields the page leaves out decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    #[serde(deserialize_with = "text")]
    pub id: String,
    /// May contain markup; rendered verbatim inside CDATA.
    #[serde(deserialize_with = "text")]
    pub title: String,
    /// Falsy values decode as `None` and render as an empty CDATA section.
    #[serde(deserialize_with = "truthy_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "text")]
    pub link: String,
    #[serde(deserialize_with = "text")]
    pub image_link: String,
    /// Passed through as given ("in stock", "out of stock", ...).
    #[serde(deserialize_with = "text")]
    pub availability: String,
    pub price: Option<Price>,
}

/// Price as published by the page. Neither part is validated or normalized.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Price {
    #[serde(deserialize_with = "optional_text")]
    pub amount: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    pub currency: Option<String>,
}

impl Price {
    /// Amount and currency, only when both are present.
    pub fn combined(&self) -> Option<(&str, &str)> {
        match (self.amount.as_deref(), self.currency.as_deref()) {
            (Some(amount), Some(currency)) => Some((amount, currency)),
            _ => None,
        }
    }
}

impl FeedItem {
    pub fn price_parts(&self) -> Option<(&str, &str)> {
        self.price.as_ref().and_then(Price::combined)
    }
}

/// Converts a scalar to the text the page's own script would display.
///
/// Strings pass through; integers print without a fraction; floats follow
/// `Number.prototype.toString`, so `10.0` prints as `10`, `1e21` as `1e+21`
/// and `-0` as `0`. `null` yields `None`. Objects and arrays have no text form.
pub fn scalar_text(value: &Value) -> Result<Option<String>, &'static str> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => {
            let text = if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(number_text).unwrap_or_default()
            };
            Ok(Some(text))
        }
        Value::Array(_) => Err("an array"),
        Value::Object(_) => Err("an object"),
    }
}

/// Shortest round-trip digits, switching to exponent notation outside
/// `1e-6 <= |f| < 1e21` the way script engines do.
fn number_text(f: f64) -> String {
    if f == 0.0 {
        // Covers -0
        return "0".to_string();
    }
    let magnitude = f.abs();
    if (1e-6..1e21).contains(&magnitude) {
        // f64 Display never uses exponent notation and drops ".0"
        return f.to_string();
    }
    let text = format!("{:e}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

/// Values a script treats as false: `false`, `0`, `""`.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Like `optional_text`, but falsy values count as absent. Descriptions use
/// this so `description || fallback` behaves as on the page.
fn truthy_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_falsy(&value) {
        return Ok(None);
    }
    scalar_to_text(&value)
}

fn scalar_to_text<E: serde::de::Error>(value: &Value) -> Result<Option<String>, E> {
    scalar_text(value).map_err(|found| {
        E::invalid_type(
            serde::de::Unexpected::Other(found),
            &"a string, number or boolean",
        )
    })
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_text(&value)
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    optional_text(deserializer).map(Option::unwrap_or_default)
}
