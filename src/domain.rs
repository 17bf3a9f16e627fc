use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A country as returned by the TV-Plan API. Unknown fields are kept in
/// `extra` so a cache rewrite never drops data the API sent us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Country {
    pub fn display_name(&self) -> &str {
        fallback_display_name(self.display_name.as_deref(), self.name.as_deref())
    }
}

/// A channel of one country. Channels without an id exist in the API output
/// and are carried through the cache, but never become selectable options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, deserialize_with = "opt_id_as_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    pub fn display_name(&self) -> &str {
        fallback_display_name(self.display_name.as_deref(), self.name.as_deref())
    }
}

/// A fetched payload together with the UTC timestamp of its last successful
/// fetch. `timestamp` is RFC 3339; a missing or unparseable value counts as
/// maximally stale, so an old record without one still deserializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cached<T> {
    pub data: T,
    #[serde(default)]
    pub timestamp: String,
}

/// One selectable entry of the plugin's channel picker. Serializes as a
/// one-entry mapping (`"Label": "value"`) to match the settings schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOption {
    pub label: String,
    pub value: String,
}

impl Serialize for ChannelOption {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label, &self.value)?;
        map.end()
    }
}

fn fallback_display_name<'a>(display_name: Option<&'a str>, name: Option<&'a str>) -> &'a str {
    display_name
        .filter(|value| !value.is_empty())
        .or(name.filter(|value| !value.is_empty()))
        .unwrap_or("Unknown")
}

// The API is inconsistent about numeric ids; cache keys are always strings.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn opt_id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
