use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::ConfigErrorKind;

/// Configuration capable of deriving named sub-scopes.
///
/// The service context only derives scopes and hands them to factories,
/// it never looks inside.
pub trait ConfigSource: Sized {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Derives the sub-scope `name`.
    ///
    /// # Errors
    /// Implementation defined, e.g. when `name` exists but isn't a section.
    fn scope(&self, name: &str) -> Result<Self, Self::Error>;
}

/// JSON backed [`ConfigSource`].
///
/// A missing section is an empty scope: it derives empty sub-scopes and deserializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonConfig {
    path: String,
    value: Value,
}

impl JsonConfig {
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            path: String::new(),
            value,
        }
    }

    /// # Errors
    /// Returns [`ConfigErrorKind::Parse`] if `document` isn't valid JSON.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigErrorKind> {
        serde_json::from_str(document).map(Self::new).map_err(ConfigErrorKind::Parse)
    }

    /// Dotted path of this scope, empty for the root
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// # Errors
    /// Returns [`ConfigErrorKind::Deserialize`] if the scope doesn't match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigErrorKind> {
        let value = match &self.value {
            Value::Null => Value::Object(Map::new()),
            value => value.clone(),
        };
        serde_json::from_value(value).map_err(|source| ConfigErrorKind::Deserialize {
            path: self.path.clone(),
            source,
        })
    }

    /// Reads the member `key`, `None` if it's missing.
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind::Deserialize`] if the member doesn't match `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigErrorKind> {
        let Some(value) = self.value.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| ConfigErrorKind::Deserialize {
                path: self.child_path(key),
                source,
            })
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            [self.path.as_str(), name].join(".")
        }
    }
}

impl ConfigSource for JsonConfig {
    type Error = ConfigErrorKind;

    fn scope(&self, name: &str) -> Result<Self, Self::Error> {
        let value = match &self.value {
            Value::Null => Value::Null,
            Value::Object(map) => map.get(name).cloned().unwrap_or_default(),
            other => {
                return Err(ConfigErrorKind::NotASection {
                    path: self.path.clone(),
                    found: kind_of(other),
                })
            }
        };

        Ok(Self {
            path: self.child_path(name),
            value,
        })
    }
}

impl From<Value> for JsonConfig {
    #[inline]
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigSource as _, JsonConfig};
    use crate::errors::ConfigErrorKind;

    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, Debug, PartialEq)]
    struct CacheSettings {
        #[serde(default = "default_capacity")]
        capacity: usize,
    }

    fn default_capacity() -> usize {
        16
    }

    #[test]
    fn test_scope_of_section() {
        let config = JsonConfig::new(json!({ "injector": { "cache": { "capacity": 64 } } }));
        let cache = config.scope("injector").unwrap().scope("cache").unwrap();

        assert_eq!(cache.path(), "injector.cache");
        assert_eq!(cache.deserialize::<CacheSettings>().unwrap(), CacheSettings { capacity: 64 });
        assert_eq!(cache.get::<usize>("capacity").unwrap(), Some(64));
        assert_eq!(cache.get::<usize>("ttl").unwrap(), None);
    }

    #[test]
    fn test_missing_section_is_empty() {
        let config = JsonConfig::default();
        let worker = config.scope("injector").unwrap().scope("worker").unwrap();

        assert!(worker.is_empty());
        assert_eq!(worker.path(), "injector.worker");
        assert_eq!(worker.deserialize::<CacheSettings>().unwrap(), CacheSettings { capacity: 16 });
    }

    #[test]
    fn test_scalar_is_not_a_section() {
        let config = JsonConfig::from_json_str(r#"{ "injector": 5 }"#).unwrap();
        let injector = config.scope("injector").unwrap();

        let err = injector.scope("cache").unwrap_err();
        assert!(matches!(err, ConfigErrorKind::NotASection { ref path, found: "a number" } if path == "injector"));
    }

    #[test]
    fn test_deserialize_error_carries_path() {
        let config = JsonConfig::new(json!({ "cache": { "capacity": "many" } }));
        let err = config.scope("cache").unwrap().deserialize::<CacheSettings>().unwrap_err();

        assert!(matches!(err, ConfigErrorKind::Deserialize { ref path, .. } if path == "cache"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(JsonConfig::from_json_str("{"), Err(ConfigErrorKind::Parse(_))));
    }
}
