//! Fixture model and loading.
//!
//! Each query category has one JSON document, `<category>.json`, holding an
//! array of fixtures:
//!
//! ```json
//! [
//!   {
//!     "name": "Count entities with amount",
//!     "description": "optional",
//!     "columns": [{"name": "Amount", "api-name": "amount", "type": "integer", "storage": "latest-value"}],
//!     "insert": {"entity1": {"amount": 10}},
//!     "query": {"query-name": "q", "query": [{"amount": {"equals": 10}}]},
//!     "expected": {"status": "success", "result": {"q": 1}, "took": "ignore"}
//!   }
//! ]
//! ```
//!
//! `columns`/`insert` make the fixture self-contained. Delete and update
//! fixtures also carry `additional_operation` and `result_additional`; the
//! `sql` category uses a string `query`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::RunnerError;
use crate::value::{Map, Value};

// ============================================================================
// QUERY CATEGORIES
// ============================================================================

/// A query category; also the stem of its fixture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum QueryKind {
    #[value(name = "count_entity")]
    CountEntity,
    #[value(name = "count_event")]
    CountEvent,
    #[value(name = "top_values")]
    TopValues,
    #[value(name = "aggregation")]
    Aggregation,
    #[value(name = "result")]
    Result,
    #[value(name = "score")]
    Score,
    #[value(name = "sql")]
    Sql,
    #[value(name = "delete")]
    Delete,
    #[value(name = "update")]
    Update,
}

impl QueryKind {
    /// Fixed processing order of a full suite run.
    pub const ALL: [QueryKind; 9] = [
        QueryKind::CountEntity,
        QueryKind::CountEvent,
        QueryKind::TopValues,
        QueryKind::Aggregation,
        QueryKind::Result,
        QueryKind::Score,
        QueryKind::Sql,
        QueryKind::Delete,
        QueryKind::Update,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::CountEntity => "count_entity",
            QueryKind::CountEvent => "count_event",
            QueryKind::TopValues => "top_values",
            QueryKind::Aggregation => "aggregation",
            QueryKind::Result => "result",
            QueryKind::Score => "score",
            QueryKind::Sql => "sql",
            QueryKind::Delete => "delete",
            QueryKind::Update => "update",
        }
    }

    /// Delete and update run an additional operation before verification.
    pub fn is_mutation(self) -> bool {
        matches!(self, QueryKind::Delete | QueryKind::Update)
    }

    pub fn is_raw(self) -> bool {
        self == QueryKind::Sql
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// One declarative test case.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<Value>>,
    #[serde(default)]
    pub insert: Option<Value>,
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub additional_operation: Option<Value>,
    #[serde(default)]
    pub result_additional: Option<Value>,
    pub expected: Value,
}

/// The query of a fixture, by form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Query<'a> {
    /// Raw query text, sent unmodified.
    Raw(&'a str),
    /// Structured filter, translated before dispatch.
    Structured(&'a Value),
}

impl Fixture {
    pub fn query(&self) -> Option<Query<'_>> {
        match self.query.as_ref()? {
            Value::String(text) => Some(Query::Raw(text)),
            other => Some(Query::Structured(other)),
        }
    }

    /// The expected block as a field map.
    ///
    /// Loading guarantees `expected` is an object; anything else reads empty.
    pub fn expected_fields(&self) -> Map {
        self.expected.as_object().cloned().unwrap_or_default()
    }

    pub fn columns(&self) -> &[Value] {
        self.columns.as_deref().unwrap_or_default()
    }

    fn validate(&self, kind: QueryKind, path: &Path) -> Result<(), RunnerError> {
        let shape = |issue: &str, help: Option<&str>| RunnerError::FixtureShape {
            path: path.to_path_buf(),
            name: self.name.clone(),
            issue: issue.to_string(),
            help: help.map(str::to_string),
        };

        if self.expected.as_object().is_none() {
            return Err(shape(
                "`expected` must be an object",
                Some("map each result field to its expected value, or to \"ignore\""),
            ));
        }
        match (kind.is_raw(), self.query()) {
            (true, Some(Query::Raw(_))) | (false, Some(Query::Structured(Value::Object(_)))) => {}
            (true, _) => return Err(shape("`query` must be a string of raw query text", None)),
            (false, _) => return Err(shape("`query` must be an object", None)),
        }
        if kind.is_mutation() {
            let op = self.additional_operation.as_ref().and_then(Value::as_object);
            let ack = self.result_additional.as_ref().and_then(Value::as_object);
            if op.is_none() || ack.is_none() {
                return Err(shape(
                    "`additional_operation` and `result_additional` objects are required",
                    Some("delete and update fixtures verify the operation acknowledgment first"),
                ));
            }
        }
        if self.columns().iter().any(|c| c.as_object().is_none()) {
            return Err(shape("every entry of `columns` must be an object", None));
        }
        Ok(())
    }
}

// ============================================================================
// FIXTURE SETS
// ============================================================================

/// All fixtures of one query category.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub kind: QueryKind,
    pub path: PathBuf,
    pub fixtures: Vec<Fixture>,
}

impl FixtureSet {
    /// Path of a category's fixture file.
    pub fn path_for(dir: &Path, kind: QueryKind, extension: &str) -> PathBuf {
        dir.join(format!("{}{}", kind.as_str(), extension))
    }

    /// Reads and decodes a category's fixture file.
    pub fn load(dir: &Path, kind: QueryKind, extension: &str) -> Result<Self, RunnerError> {
        let path = Self::path_for(dir, kind, extension);
        let source = fs::read_to_string(&path).map_err(|source| RunnerError::FixtureRead {
            path: path.clone(),
            source,
        })?;
        Self::from_source(kind, path, &source)
    }

    /// Decodes fixtures from already-read JSON text.
    pub fn from_source(kind: QueryKind, path: PathBuf, source: &str) -> Result<Self, RunnerError> {
        let fixtures: Vec<Fixture> = serde_json::from_str(source)
            .map_err(|e| RunnerError::decode(&path, source, &e))?;
        for fixture in &fixtures {
            fixture.validate(kind, &path)?;
        }
        Ok(Self {
            kind,
            path,
            fixtures,
        })
    }

    /// Whether the category provisions its own columns and data.
    ///
    /// Decided once from the first fixture and applied to the whole category.
    pub fn is_self_contained(&self) -> bool {
        self.fixtures.first().is_some_and(|f| f.insert.is_some())
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}
