//! # Shared test support
//!
//! An in-memory stand-in for the query API. It keeps created columns and
//! inserted rows, answers structured count/delete/update queries from them,
//! and can be scripted to return specific responses (stale reads, errors)
//! ahead of its own logic. Every call is recorded for assertions.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use querycheck::client::{ApiError, QueryApi};
use querycheck::compare::compare;
use querycheck::executor::{Executor, ExecutorConfig};
use querycheck::fixture::{FixtureSet, QueryKind};
use querycheck::translate::{Clock, Translator};
use querycheck::value::{Map, Value};

/// A recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateColumn(Value),
    Insert(Value),
    Delete(Value),
    Update(Value),
    Query(QueryKind, Value),
    Sql(String),
}

#[derive(Default)]
pub struct FakeBackend {
    pub calls: Vec<Call>,
    pub columns: Vec<String>,
    pub rows: BTreeMap<String, Map>,
    /// Responses returned, in order, by read/mutation calls before the backend logic.
    pub script: VecDeque<Result<Value, ApiError>>,
    pub fail_create: Option<ApiError>,
    pub fail_insert: Option<ApiError>,
}

pub fn json(text: &str) -> Value {
    Value::parse_preserving(text).expect("test JSON must be valid")
}

fn success(extra: &[(&str, Value)]) -> Value {
    let mut map = Map::new();
    map.insert("status".to_string(), Value::from("success"));
    for (k, v) in extra {
        map.insert(k.to_string(), v.clone());
    }
    Value::Object(map)
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(mut self, response: Result<Value, ApiError>) -> Self {
        self.script.push_back(response);
        self
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn query_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, Call::Query(..) | Call::Sql(_)))
    }

    // `filter` is a list of `{column: {"equals": value}}` conditions, all required.
    fn matches(&self, row: &Map, filter: &Value) -> bool {
        let Some(conditions) = filter.as_array() else {
            return false;
        };
        conditions.iter().all(|cond| {
            cond.as_object().is_some_and(|c| {
                c.iter().all(|(column, op)| {
                    self.columns.contains(column)
                        && match (row.get(column), op.get("equals")) {
                            (Some(have), Some(want)) => compare(want, have),
                            _ => false,
                        }
                })
            })
        })
    }

    fn matching_entities(&self, filter: &Value) -> Vec<String> {
        self.rows
            .iter()
            .filter(|(_, row)| self.matches(row, filter))
            .map(|(entity, _)| entity.clone())
            .collect()
    }
}

impl QueryApi for FakeBackend {
    fn create_column(&mut self, column: &Value) -> Result<Value, ApiError> {
        self.calls.push(Call::CreateColumn(column.clone()));
        if let Some(err) = self.fail_create.clone() {
            return Err(err);
        }
        if let Some(name) = column.get("api-name").and_then(Value::as_str) {
            self.columns.push(name.to_string());
        }
        Ok(success(&[]))
    }

    fn insert(&mut self, payload: &Value) -> Result<Value, ApiError> {
        self.calls.push(Call::Insert(payload.clone()));
        if let Some(err) = self.fail_insert.clone() {
            return Err(err);
        }
        let entities = payload.as_object().cloned().unwrap_or_default();
        for (entity, fields) in entities.iter() {
            let row = self.rows.entry(entity.clone()).or_default();
            if let Some(fields) = fields.as_object() {
                for (column, value) in fields.iter() {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(success(&[("inserted-entities", Value::from(entities.len() as i64))]))
    }

    fn delete(&mut self, query: &Value) -> Result<Value, ApiError> {
        self.calls.push(Call::Delete(query.clone()));
        if let Some(response) = self.script.pop_front() {
            return response;
        }
        let doomed = self.matching_entities(query.get("query").unwrap_or(&Value::Null));
        for entity in &doomed {
            self.rows.remove(entity);
        }
        Ok(success(&[("deleted_count", Value::from(doomed.len() as i64))]))
    }

    fn update(&mut self, query: &Value) -> Result<Value, ApiError> {
        self.calls.push(Call::Update(query.clone()));
        if let Some(response) = self.script.pop_front() {
            return response;
        }
        let targets = self.matching_entities(query.get("query").unwrap_or(&Value::Null));
        let set = query.get("set").and_then(Value::as_object).cloned().unwrap_or_default();
        for entity in &targets {
            if let Some(row) = self.rows.get_mut(entity) {
                for (column, value) in set.iter() {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(success(&[("updated_count", Value::from(targets.len() as i64))]))
    }

    fn query(&mut self, kind: QueryKind, query: &Value) -> Result<Value, ApiError> {
        self.calls.push(Call::Query(kind, query.clone()));
        if let Some(response) = self.script.pop_front() {
            return response;
        }
        let name = query
            .get("query-name")
            .and_then(Value::as_str)
            .unwrap_or("result")
            .to_string();
        let count = self
            .matching_entities(query.get("query").unwrap_or(&Value::Null))
            .len();
        let mut result = Map::new();
        result.insert(name, Value::from(count as i64));
        Ok(success(&[
            ("result", Value::Object(result)),
            ("took", Value::from(0.012)),
        ]))
    }

    fn sql(&mut self, text: &str) -> Result<Value, ApiError> {
        self.calls.push(Call::Sql(text.to_string()));
        if let Some(response) = self.script.pop_front() {
            return response;
        }
        Ok(success(&[("result", Value::Array(vec![]))]))
    }
}

/// A clock that advances one millisecond per reading.
pub struct TickingClock(Cell<u128>);

impl TickingClock {
    pub fn starting_at(ms: u128) -> Self {
        Self(Cell::new(ms))
    }
}

impl Clock for TickingClock {
    fn now_millis(&self) -> u128 {
        let now = self.0.get();
        self.0.set(now + 1);
        now
    }
}

pub fn quick_config() -> ExecutorConfig {
    ExecutorConfig {
        settle: Duration::ZERO,
        verbose: true,
    }
}

pub fn executor(backend: FakeBackend) -> Executor<FakeBackend> {
    Executor::with_translator(
        backend,
        Translator::with_clock(TickingClock::starting_at(1_700_000_000_000)),
        quick_config(),
    )
}

pub fn fixture_set(kind: QueryKind, source: &str) -> FixtureSet {
    FixtureSet::from_source(kind, format!("{kind}.json").into(), source)
        .expect("test fixtures must load")
}
