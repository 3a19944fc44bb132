//! Run-unique identifier translation.
//!
//! Self-contained fixtures declare the columns they need under canonical
//! names. Before creating them, each column's `name` and `api-name` get a
//! millisecond timestamp suffix so repeated runs against the same backend
//! never collide. The translator remembers `canonical -> run-unique` and
//! rewrites every later payload of the same fixture (insert, query, expected
//! results) with those names.
//!
//! Rewriting walks the decoded tree: an object key or a string scalar is
//! replaced when it equals a canonical identifier exactly. Numbers are never
//! touched, so request payloads keep their opaque numeric tokens.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::value::{Map, Value};

/// Column field holding the identifier used in queries and inserts.
pub const API_NAME_FIELD: &str = "api-name";
/// Column field holding the human-readable name.
pub const NAME_FIELD: &str = "name";

/// Source of the timestamp suffix.
pub trait Clock {
    fn now_millis(&self) -> u128;
}

/// Wall clock: milliseconds since the UNIX epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

/// Per-fixture `canonical -> run-unique` identifier table.
pub struct Translator {
    table: BTreeMap<String, String>,
    clock: Box<dyn Clock>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            table: BTreeMap::new(),
            clock: Box::new(clock),
        }
    }

    /// Empties the table. Called before every fixture.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Run-unique identifier recorded for `canonical`, if any.
    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.table.get(canonical).map(String::as_str)
    }

    /// Table entries in their quoted, serialized-JSON form.
    pub fn quoted_entries(&self) -> Vec<(String, String)> {
        self.table
            .iter()
            .map(|(old, new)| (format!("\"{}\"", old), format!("\"{}\"", new)))
            .collect()
    }

    /// Suffixes a column definition's `name` and `api-name` with the current
    /// timestamp and records the `api-name` mapping.
    ///
    /// Fields that are absent or not strings are left as they are; a column
    /// without a string `api-name` records nothing.
    pub fn timestamp_column(&mut self, column: &Value) -> Value {
        let Value::Object(fields) = column else {
            return column.clone();
        };
        let stamp = self.clock.now_millis().to_string();
        let mut renamed = fields.clone();

        if let Some(Value::String(name)) = fields.get(NAME_FIELD) {
            renamed.insert(NAME_FIELD.to_string(), Value::String(format!("{name}{stamp}")));
        }
        if let Some(Value::String(api_name)) = fields.get(API_NAME_FIELD) {
            let unique = format!("{api_name}{stamp}");
            renamed.insert(API_NAME_FIELD.to_string(), Value::String(unique.clone()));
            self.table.insert(api_name.clone(), unique);
        }
        Value::Object(renamed)
    }

    /// Rewrites every canonical identifier in `payload`.
    pub fn apply(&self, payload: &Value) -> Value {
        if self.table.is_empty() {
            return payload.clone();
        }
        self.rewrite(payload)
    }

    fn rewrite(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.rename(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.rewrite(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (self.rename(k), self.rewrite(v)))
                    .collect::<Map>(),
            ),
            other => other.clone(),
        }
    }

    fn rename(&self, s: &str) -> String {
        self.table.get(s).cloned().unwrap_or_else(|| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(u128);

    impl Clock for FixedClock {
        fn now_millis(&self) -> u128 {
            self.0
        }
    }

    fn json(text: &str) -> Value {
        Value::parse_preserving(text).unwrap()
    }

    #[test]
    fn timestamps_both_names_and_records_api_name() {
        let mut t = Translator::with_clock(FixedClock(1700000000123));
        let column = json(r#"{"name": "My Col", "api-name": "mycol", "type": "integer"}"#);
        let renamed = t.timestamp_column(&column);

        assert_eq!(
            renamed,
            json(r#"{"name": "My Col1700000000123", "api-name": "mycol1700000000123", "type": "integer"}"#)
        );
        assert_eq!(t.get("mycol"), Some("mycol1700000000123"));
        assert_eq!(
            t.quoted_entries(),
            vec![("\"mycol\"".to_string(), "\"mycol1700000000123\"".to_string())]
        );
    }

    #[test]
    fn apply_rewrites_keys_and_values_but_not_substrings() {
        let mut t = Translator::with_clock(FixedClock(42));
        t.timestamp_column(&json(r#"{"name": "n", "api-name": "mycol"}"#));

        let query = json(r#"{"query": [{"mycol": {"equals": 10.50}}], "columns": ["mycol", "mycolumn"]}"#);
        assert_eq!(
            t.apply(&query),
            json(r#"{"query": [{"mycol42": {"equals": 10.50}}], "columns": ["mycol42", "mycolumn"]}"#)
        );
    }

    #[test]
    fn apply_preserves_numeric_tokens() {
        let mut t = Translator::with_clock(FixedClock(7));
        t.timestamp_column(&json(r#"{"name": "n", "api-name": "amount"}"#));
        let insert = json(r#"{"entity1": {"amount": 1.10}}"#);
        assert_eq!(t.apply(&insert).to_string(), r#"{"entity1":{"amount7":1.10}}"#);
    }

    #[test]
    fn empty_table_is_a_no_op() {
        let t = Translator::new();
        let query = json(r#"{"mycol": 1}"#);
        assert_eq!(t.apply(&query), query);
    }

    #[test]
    fn clear_drops_previous_fixture_entries() {
        let mut t = Translator::with_clock(FixedClock(1));
        t.timestamp_column(&json(r#"{"name": "a", "api-name": "a"}"#));
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.apply(&json(r#"["a"]"#)), json(r#"["a"]"#));
    }

    #[test]
    fn non_object_column_is_returned_untouched() {
        let mut t = Translator::new();
        assert_eq!(t.timestamp_column(&json("\"x\"")), json("\"x\""));
        assert_eq!(t.len(), 0);
    }
}
