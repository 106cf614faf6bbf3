//! Ordered key-value mappings (object shorthand).
//!
//! A [`Record`] keeps keys in insertion order; that order decides the order of
//! conjoined conditions, assignments and insert columns.

use crate::arg::Arg;
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// An ordered mapping from keys to arguments.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entries: Vec<(String, Arg)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing entry in place.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key` only when `value` is `Some`.
    pub fn set_opt<T: Into<Arg>>(self, key: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Arg>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Arg> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Json(serde_json::Value::Number(n)), Value::Float),
        },
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Json(other),
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(k, v)| (k, Arg::Value(json_to_value(v))))
                .collect(),
        }
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = SqlError;

    /// Only JSON objects are mappings.
    fn try_from(json: serde_json::Value) -> SqlResult<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(Record::from(map)),
            other => Err(SqlError::malformed(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Arg>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Build a [`Record`] from `key => value` pairs.
///
/// # Example
/// ```ignore
/// let row = record! { "firstName" => "Kaladin", "age" => 20, "updatedAt" => raw("now()") };
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.set($key, $value))+
    };
}

/// Build a `Vec<Arg>` from heterogeneous values.
///
/// # Example
/// ```ignore
/// sq().from("person").columns(["first_name", "age"]).values(args!["Shallan", 18])
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Arg::from($value)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::Escaped;

    #[test]
    fn keeps_insertion_order_and_replaces_in_place() {
        let r = Record::new().set("b", 1).set("a", 2).set("b", 3);
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(r.get("b").and_then(Arg::classify), Some(Escaped::Parameter(&Value::Int(3))));
    }

    #[test]
    fn set_opt_skips_none() {
        let r = Record::new().set_opt("a", Some(1)).set_opt("b", None::<i32>);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn from_json_object() {
        let r = Record::try_from(serde_json::json!({ "age": 13, "lastName": null, "tags": ["a"] })).unwrap();
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["age", "lastName", "tags"]);
        assert_eq!(r.get("lastName").and_then(Arg::classify), Some(Escaped::Parameter(&Value::Null)));
    }

    #[test]
    fn from_non_object_json_is_malformed() {
        assert!(matches!(
            Record::try_from(serde_json::json!(5)),
            Err(SqlError::MalformedCondition(_))
        ));
    }

    #[test]
    fn macros() {
        let r = crate::record! { "a" => 1, "b" => "x" };
        assert_eq!(r.len(), 2);
        assert!(crate::record! {}.is_empty());
        assert_eq!(crate::args![1, "x", ()].len(), 3);
    }
}
