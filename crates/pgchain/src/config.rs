//! Compile-time configuration.
//!
//! A [`Config`] is handed to the root builder once and shared by every builder
//! branched from it. It carries the key-mapping collaborator used for
//! object-shorthand input and for decoded output rows.

use heck::{ToLowerCamelCase, ToSnakeCase};
use std::fmt;
use std::sync::Arc;

/// Maps one key to another.
pub type KeyMapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Builder configuration.
#[derive(Clone)]
pub struct Config {
    /// Applied to every object-shorthand key before it becomes a column name.
    pub map_input_key: KeyMapper,
    /// Applied to every column name of a decoded output row.
    pub map_output_key: KeyMapper,
    /// Truncate SQL in log events (in chars). `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for Config {
    /// `lastName` → `last_name` on input, `last_name` → `lastName` on output.
    fn default() -> Self {
        Self {
            map_input_key: Arc::new(snake_case_key),
            map_output_key: Arc::new(camel_case_key),
            max_logged_sql: Some(200),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("map_input_key", &"<fn>")
            .field("map_output_key", &"<fn>")
            .field("max_logged_sql", &self.max_logged_sql)
            .finish()
    }
}

impl Config {
    /// Create a configuration with the default key transforms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that passes keys through untouched in both directions.
    pub fn identity() -> Self {
        Self::default()
            .map_input_keys(str::to_string)
            .map_output_keys(str::to_string)
    }

    /// Override the input key transform.
    pub fn map_input_keys(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.map_input_key = Arc::new(f);
        self
    }

    /// Override the output key transform.
    pub fn map_output_keys(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.map_output_key = Arc::new(f);
        self
    }

    /// Set maximum SQL length emitted in log events.
    pub fn max_logged_sql(mut self, len: Option<usize>) -> Self {
        self.max_logged_sql = len;
        self
    }

    pub(crate) fn input_key(&self, key: &str) -> String {
        (self.map_input_key)(key)
    }

    pub(crate) fn output_key(&self, key: &str) -> String {
        (self.map_output_key)(key)
    }
}

/// Default input transform: snake_case each dotted segment, quoted segments untouched.
pub fn snake_case_key(key: &str) -> String {
    map_segments(key, |s| s.to_snake_case())
}

/// Default output transform: lowerCamelCase each dotted segment.
pub fn camel_case_key(key: &str) -> String {
    map_segments(key, |s| s.to_lower_camel_case())
}

fn map_segments(key: &str, f: impl Fn(&str) -> String) -> String {
    if key.contains('"') {
        return key.to_string();
    }
    key.split('.').map(f).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_input_keys_are_snake_cased_per_segment() {
        let config = Config::default();
        assert_eq!(config.input_key("lastName"), "last_name");
        assert_eq!(config.input_key("p.firstName"), "p.first_name");
        assert_eq!(config.input_key("age"), "age");
        assert_eq!(config.input_key(r#""MixedCase""#), r#""MixedCase""#);
    }

    #[test]
    fn default_output_keys_are_camel_cased() {
        let config = Config::default();
        assert_eq!(config.output_key("last_name"), "lastName");
        assert_eq!(config.output_key("id"), "id");
    }

    #[test]
    fn identity_keeps_keys() {
        let config = Config::identity();
        assert_eq!(config.input_key("lastName"), "lastName");
        assert_eq!(config.output_key("last_name"), "last_name");
    }

    #[test]
    fn custom_mapper() {
        let config = Config::new().map_input_keys(|k| k.to_uppercase());
        assert_eq!(config.input_key("age"), "AGE");
    }
}
