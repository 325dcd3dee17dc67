use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque per-session token, generated once when a workflow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// One product record returned by discovery for a given store.
///
/// Fields the client does not interpret are kept in `extra` so the listing
/// can be echoed back to the backend unchanged inside a selection map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub review_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specifications: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductListing {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: None,
            rating: 0.0,
            review_count: 0,
            specifications: BTreeMap::new(),
            image_url: None,
            url: None,
            source: None,
            extra: Map::new(),
        }
    }

    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) if price > 0.0 => format!("${price:.2}"),
            _ => "Price N/A".to_string(),
        }
    }

    pub fn short_name(&self, max_chars: usize) -> String {
        if self.name.chars().count() <= max_chars {
            return self.name.clone();
        }
        let head: String = self.name.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Older backends number their listings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for listing id, got {other}"
        ))),
    }
}

/// Discovery output: store name to the listings found there, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductsByStore(pub BTreeMap<String, Vec<ProductListing>>);

impl ProductsByStore {
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// True when no store returned anything, including when no store was listed at all.
    pub fn is_empty_result(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn store(&self, store: &str) -> Option<&[ProductListing]> {
        self.0.get(store).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<ProductListing>)> {
        self.0.iter()
    }
}

/// The user's chosen listing per store. At most one entry per store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedProducts(BTreeMap<String, ProductListing>);

impl SelectedProducts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection for `store`, replacing only that store's previous choice.
    pub fn select(&mut self, store: impl Into<String>, listing: ProductListing) {
        self.0.insert(store.into(), listing);
    }

    pub fn get(&self, store: &str) -> Option<&ProductListing> {
        self.0.get(store)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProductListing)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    ProductsFound,
    Analyzed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Info,
    Warning,
    Error,
    Success,
}

/// User-facing status line. The kind is fixed where the status is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Upper-cases the first character of a store name: `amazon` -> `Amazon`.
pub fn capitalize(store: &str) -> String {
    let mut chars = store.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
