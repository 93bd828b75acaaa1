//! Lenient YAML field types

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A field that may be written as one scalar or a list of scalars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringOrSlice(pub Vec<String>);

impl StringOrSlice {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'de> Deserialize<'de> for StringOrSlice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let out = match value {
            Value::Null => Vec::new(),
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| scalar_to_string(v).map_err(serde::de::Error::custom))
                .collect::<Result<_, _>>()?,
            other => vec![scalar_to_string(other).map_err(serde::de::Error::custom)?],
        };
        Ok(StringOrSlice(out))
    }
}

/// A field that may be a map or a list of `key=value` strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEqualSlice(pub BTreeMap<String, String>);

impl MapEqualSlice {
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<'de> Deserialize<'de> for MapEqualSlice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let mut out = BTreeMap::new();
        match value {
            Value::Null => {}
            Value::Mapping(map) => {
                for (k, v) in map {
                    let key = scalar_to_string(k).map_err(serde::de::Error::custom)?;
                    let value = scalar_to_string(v).map_err(serde::de::Error::custom)?;
                    out.insert(key, value);
                }
            }
            Value::Sequence(seq) => {
                for item in seq {
                    let item = scalar_to_string(item).map_err(serde::de::Error::custom)?;
                    match item.split_once('=') {
                        Some((k, v)) => out.insert(k.to_string(), v.to_string()),
                        None => out.insert(item, String::new()),
                    };
                }
            }
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a map or a list of key=value strings, found {:?}",
                    other
                )))
            }
        }
        Ok(MapEqualSlice(out))
    }
}

/// Render a YAML scalar as a string; collections are rejected
pub fn scalar_to_string(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        Value::Tagged(tagged) => scalar_to_string(tagged.value),
        other => Err(format!("expected a scalar value, found {:?}", other)),
    }
}
