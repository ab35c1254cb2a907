//! The loosely-typed configuration tree handed to the binder.
//!
//! Config sources (files, environment, flags) produce a [`ConfigValue`] tree;
//! the binder only ever reads it. Conversions from `toml::Value`,
//! `serde_json::Value` and any serde format (via `Deserialize`) are provided
//! so callers can plug in whatever decoder they already use.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// A mapping from string keys to configuration values.
pub type Table = BTreeMap<String, ConfigValue>;

/// A node of the generic configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Duration(Duration),
    Sequence(Vec<ConfigValue>),
    Mapping(Table),
}

impl ConfigValue {
    /// Short name of the runtime shape, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Unsigned(_) => "unsigned integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::Duration(_) => "duration",
            ConfigValue::Sequence(_) => "sequence",
            ConfigValue::Mapping(_) => "mapping",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ConfigValue::Sequence(_) | ConfigValue::Mapping(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Table> {
        match self {
            ConfigValue::Mapping(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

/// An empty mapping.
impl Default for ConfigValue {
    fn default() -> Self {
        ConfigValue::Mapping(Table::new())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Unsigned(u) => write!(f, "{u}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::String(s) => write!(f, "{s:?}"),
            ConfigValue::Duration(d) => write!(f, "{d:?}"),
            ConfigValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ConfigValue::Mapping(table) => {
                f.write_str("{")?;
                for (i, (key, value)) in table.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {$(
        impl From<$ty> for ConfigValue {
            fn from(v: $ty) -> Self {
                ConfigValue::Integer(v as i64)
            }
        }
    )*};
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {$(
        impl From<$ty> for ConfigValue {
            fn from(v: $ty) -> Self {
                ConfigValue::Unsigned(v as u64)
            }
        }
    )*};
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<f32> for ConfigValue {
    fn from(v: f32) -> Self {
        ConfigValue::Float(v as f64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::String(v)
    }
}

impl From<Duration> for ConfigValue {
    fn from(v: Duration) -> Self {
        ConfigValue::Duration(v)
    }
}

impl From<Table> for ConfigValue {
    fn from(v: Table) -> Self {
        ConfigValue::Mapping(v)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(v: Vec<T>) -> Self {
        ConfigValue::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<toml::Value> for ConfigValue {
    fn from(v: toml::Value) -> Self {
        match v {
            toml::Value::String(s) => ConfigValue::String(s),
            toml::Value::Integer(i) => ConfigValue::Integer(i),
            toml::Value::Float(x) => ConfigValue::Float(x),
            toml::Value::Boolean(b) => ConfigValue::Bool(b),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
            toml::Value::Array(items) => {
                ConfigValue::Sequence(items.into_iter().map(ConfigValue::from).collect())
            }
            toml::Value::Table(table) => ConfigValue::Mapping(table_from_toml(table)),
        }
    }
}

/// Convert a decoded TOML document into a [`Table`].
pub fn table_from_toml(table: toml::Table) -> Table {
    table
        .into_iter()
        .map(|(key, value)| (key, ConfigValue::from(value)))
        .collect()
}

impl From<serde_json::Value> for ConfigValue {
    /// JSON `null` has no configuration meaning: nulls are dropped from
    /// objects and arrays, and a bare `null` becomes an empty mapping.
    fn from(v: serde_json::Value) -> Self {
        json_to_value(v).unwrap_or_else(|| ConfigValue::Mapping(Table::new()))
    }
}

fn json_to_value(v: serde_json::Value) -> Option<ConfigValue> {
    let value = match v {
        serde_json::Value::Null => return None,
        serde_json::Value::Bool(b) => ConfigValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigValue::Integer(i)
            } else if let Some(u) = n.as_u64() {
                ConfigValue::Unsigned(u)
            } else {
                ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => ConfigValue::String(s),
        serde_json::Value::Array(items) => {
            ConfigValue::Sequence(items.into_iter().filter_map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => ConfigValue::Mapping(
            map.into_iter()
                .filter_map(|(key, value)| json_to_value(value).map(|v| (key, v)))
                .collect(),
        ),
    };
    Some(value)
}

// --- Deserialize: any serde format straight into a tree ---

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = ConfigValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ConfigValue, E> {
        Ok(ConfigValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigValue, E> {
        Ok(ConfigValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigValue, E> {
        match i64::try_from(v) {
            Ok(i) => Ok(ConfigValue::Integer(i)),
            Err(_) => Ok(ConfigValue::Unsigned(v)),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ConfigValue, E> {
        Ok(ConfigValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigValue, E> {
        Ok(ConfigValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ConfigValue, E> {
        Ok(ConfigValue::String(v))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ConfigValue, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ConfigValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Option<ConfigValue>>()? {
            items.extend(item);
        }
        Ok(ConfigValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ConfigValue, A::Error> {
        let mut table = Table::new();
        while let Some((key, value)) = map.next_entry::<String, Option<ConfigValue>>()? {
            if let Some(value) = value {
                table.insert(key, value);
            }
        }
        Ok(ConfigValue::Mapping(table))
    }
}
