//! The query API as seen by the runner.
//!
//! The executor only talks to the backend through [`QueryApi`]; the shipped
//! implementation is [`http::HttpClient`], tests substitute in-memory fakes.

use thiserror::Error;

use crate::fixture::QueryKind;
use crate::value::Value;

pub mod http;

/// A failed collaborator call. Always fatal to the fixture, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Transport failure (connection refused, DNS, TLS, ...).
    #[error("network error: {0}")]
    Network(String),
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// The response body was not valid JSON.
    #[error("invalid response: {0}")]
    Decode(String),
    /// The API answered with an error status or an `errors` payload.
    #[error("API rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },
    /// The category has no structured query endpoint.
    #[error("'{0}' is not a structured query category")]
    Unsupported(QueryKind),
}

/// Operations the runner consumes from the query API.
pub trait QueryApi {
    fn create_column(&mut self, column: &Value) -> Result<Value, ApiError>;

    fn insert(&mut self, payload: &Value) -> Result<Value, ApiError>;

    fn delete(&mut self, query: &Value) -> Result<Value, ApiError>;

    fn update(&mut self, query: &Value) -> Result<Value, ApiError>;

    /// Structured query for one of the read categories (`count_entity` through `score`).
    fn query(&mut self, kind: QueryKind, query: &Value) -> Result<Value, ApiError>;

    /// Raw query text.
    fn sql(&mut self, text: &str) -> Result<Value, ApiError>;
}

impl<T: QueryApi + ?Sized> QueryApi for Box<T> {
    fn create_column(&mut self, column: &Value) -> Result<Value, ApiError> {
        (**self).create_column(column)
    }

    fn insert(&mut self, payload: &Value) -> Result<Value, ApiError> {
        (**self).insert(payload)
    }

    fn delete(&mut self, query: &Value) -> Result<Value, ApiError> {
        (**self).delete(query)
    }

    fn update(&mut self, query: &Value) -> Result<Value, ApiError> {
        (**self).update(query)
    }

    fn query(&mut self, kind: QueryKind, query: &Value) -> Result<Value, ApiError> {
        (**self).query(kind, query)
    }

    fn sql(&mut self, text: &str) -> Result<Value, ApiError> {
        (**self).sql(text)
    }
}
