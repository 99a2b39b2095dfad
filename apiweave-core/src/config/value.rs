use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::Value;

use super::ConfigError;

/// A configuration leaf or subtree, as read from YAML or the environment.
///
/// Environment variables always arrive as [`ConfigValue::String`]; typed
/// reads parse them on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

pub(crate) fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<&serde_yaml::Value> for ConfigValue {
    fn from(yaml: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Y;
        match yaml {
            Y::Null => Self::Null,
            Y::Bool(b) => Self::Bool(*b),
            Y::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::String(n.to_string())),
            Y::String(s) => Self::String(s.clone()),
            Y::Sequence(items) => Self::List(items.iter().map(Self::from).collect()),
            Y::Mapping(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (yaml_key(k), Self::from(v)))
                    .collect(),
            ),
            Y::Tagged(tagged) => Self::from(&tagged.value),
        }
    }
}

impl ConfigValue {
    /// JSON form, for sections copied as-is into generated documents
    /// (contact, license, servers).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => items.iter().map(Self::to_json).collect(),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Scalars rendered as text; `None` for null and collections.
    fn as_text(&self) -> Option<Cow<'_, str>> {
        Some(match self {
            Self::String(s) => Cow::Borrowed(s.trim()),
            Self::Integer(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::Null | Self::List(_) | Self::Map(_) => return None,
        })
    }
}

/// Typed read of a [`ConfigValue`], used by [`ApiConfig::get`](super::ApiConfig::get).
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be read from configuration",
    note = "readable types: String, bool, integers, f64, Option<T>, Vec<T>, serde_json::Value"
)]
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::String(s) => Ok(s.clone()),
            other => other
                .as_text()
                .map(Cow::into_owned)
                .ok_or_else(|| mismatch(key, "String")),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        let text = value.as_text().ok_or_else(|| mismatch(key, "bool"))?;
        match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(mismatch(key, "bool")),
        }
    }
}

// Numbers: YAML integers are range-checked, anything scalar is parsed as text.
macro_rules! numeric {
    ($($ty:ty),+ $(,)?) => {$(
        impl FromConfigValue for $ty {
            fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
                let fail = || mismatch(key, stringify!($ty));
                if let ConfigValue::Integer(i) = value {
                    return <$ty>::try_from(*i).map_err(|_| fail());
                }
                value.as_text().and_then(|t| t.parse().ok()).ok_or_else(fail)
            }
        }
    )+};
}

numeric!(u8, u16, u32, u64, usize, i32, i64);

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        value
            .as_text()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| mismatch(key, "f64"))
    }
}

impl FromConfigValue for Value {
    fn from_config_value(value: &ConfigValue, _key: &str) -> Result<Self, ConfigError> {
        Ok(value.to_json())
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        if *value == ConfigValue::Null {
            return Ok(None);
        }
        T::from_config_value(value, key).map(Some)
    }
}

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        let items: Vec<ConfigValue> = match value {
            ConfigValue::List(items) => items.clone(),
            // APIWEAVE_X=a,b,c
            ConfigValue::String(s) => s
                .split(',')
                .map(|part| ConfigValue::String(part.trim().to_string()))
                .collect(),
            scalar => vec![scalar.clone()],
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_config_value(item, &format!("{key}[{i}]")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_strings_convert_to_numbers_and_bools() {
        let v = ConfigValue::String(" 422 ".into());
        assert_eq!(u16::from_config_value(&v, "k").unwrap(), 422);
        let v = ConfigValue::String("off".into());
        assert!(!bool::from_config_value(&v, "k").unwrap());
    }

    #[test]
    fn out_of_range_integer_is_a_mismatch() {
        let v = ConfigValue::Integer(70_000);
        assert!(matches!(
            u16::from_config_value(&v, "port"),
            Err(ConfigError::TypeMismatch { expected: "u16", .. })
        ));
    }

    #[test]
    fn comma_separated_string_becomes_list() {
        let v = ConfigValue::String("a, b".into());
        let list: Vec<String> = Vec::from_config_value(&v, "k").unwrap();
        assert_eq!(list, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn maps_render_as_json_objects() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("name: Ada\nurl: http://x\n").unwrap();
        let json = ConfigValue::from(&yaml).to_json();
        assert_eq!(json, serde_json::json!({"name": "Ada", "url": "http://x"}));
    }
}
