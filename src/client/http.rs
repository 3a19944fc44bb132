//! Blocking HTTPS client for the query API.
//!
//! Every call is a `POST` of a JSON body (raw text for SQL) authenticated with
//! the API key in the `Authorization` header. Responses are decoded with the
//! preserving decoder so numeric tokens survive untouched.

use std::time::Duration;

use crate::client::{ApiError, QueryApi};
use crate::fixture::QueryKind;
use crate::value::Value;

pub const DEFAULT_BASE_URL: &str = "https://api.slicingdice.com/v1";

const JSON_CONTENT_TYPE: &str = "application/json";
const SQL_CONTENT_TYPE: &str = "application/sql";

/// Endpoint path for each call.
fn endpoint(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::CountEntity => "/query/count/entity/",
        QueryKind::CountEvent => "/query/count/event/",
        QueryKind::TopValues => "/query/top_values/",
        QueryKind::Aggregation => "/query/aggregation/",
        QueryKind::Result => "/data_extraction/result/",
        QueryKind::Score => "/data_extraction/score/",
        QueryKind::Sql => "/sql/",
        QueryKind::Delete => "/delete/",
        QueryKind::Update => "/update/",
    }
}

const COLUMN_PATH: &str = "/column/";
const INSERT_PATH: &str = "/insert/";

pub struct HttpClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let base_url: String = base_url.into();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::Decode(format!("failed to serialize request: {}", e)))?;
        self.post(path, JSON_CONTENT_TYPE, &bytes)
    }

    fn post(&self, path: &str, content_type: &str, body: &[u8]) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(target: "querycheck::http", %url, bytes = body.len(), "POST");

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", content_type)
            .header("Authorization", self.api_key.as_str())
            .send(body)
            .map_err(|e| {
                tracing::warn!(target: "querycheck::http", %url, error = %e, "request failed");
                match e {
                    ureq::Error::Timeout(_) => ApiError::Timeout,
                    other => ApiError::Network(other.to_string()),
                }
            })?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(format!("failed to read response: {}", e)))?;

        interpret_response(status, &text)
    }
}

/// Turns a raw status and body into the decoded payload or an [`ApiError`].
fn interpret_response(status: u16, text: &str) -> Result<Value, ApiError> {
    let decoded = Value::parse_preserving(text);
    let rejected = || ApiError::Rejected {
        status,
        body: text.chars().take(500).collect(),
    };

    if status >= 400 {
        tracing::warn!(target: "querycheck::http", status, "API returned an error status");
        return Err(rejected());
    }
    let value = decoded.map_err(|e| ApiError::Decode(e.to_string()))?;
    if value.get("errors").is_some() {
        tracing::warn!(target: "querycheck::http", status, "API returned an errors payload");
        return Err(rejected());
    }
    Ok(value)
}

impl QueryApi for HttpClient {
    fn create_column(&mut self, column: &Value) -> Result<Value, ApiError> {
        self.post_json(COLUMN_PATH, column)
    }

    fn insert(&mut self, payload: &Value) -> Result<Value, ApiError> {
        self.post_json(INSERT_PATH, payload)
    }

    fn delete(&mut self, query: &Value) -> Result<Value, ApiError> {
        self.query(QueryKind::Delete, query)
    }

    fn update(&mut self, query: &Value) -> Result<Value, ApiError> {
        self.query(QueryKind::Update, query)
    }

    fn query(&mut self, kind: QueryKind, query: &Value) -> Result<Value, ApiError> {
        if kind.is_raw() {
            return Err(ApiError::Unsupported(kind));
        }
        self.post_json(endpoint(kind), query)
    }

    fn sql(&mut self, text: &str) -> Result<Value, ApiError> {
        self.post(endpoint(QueryKind::Sql), SQL_CONTENT_TYPE, text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_is_decoded_preserving() {
        let v = interpret_response(200, r#"{"status": "success", "result": {"q": 1.0}}"#).unwrap();
        assert_eq!(v.to_string(), r#"{"result":{"q":1.0},"status":"success"}"#);
    }

    #[test]
    fn errors_payload_is_rejected() {
        let err = interpret_response(200, r#"{"errors": [{"code": 10}]}"#).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 200, .. }));
    }

    #[test]
    fn error_status_is_rejected_even_with_json_body() {
        let err = interpret_response(401, r#"{"status": "error"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 401, .. }));
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = interpret_response(200, "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn raw_category_has_no_structured_endpoint() {
        let mut client = HttpClient::new(DEFAULT_BASE_URL, "key", Duration::from_secs(1));
        let err = client.query(QueryKind::Sql, &Value::Null).unwrap_err();
        assert_eq!(err, ApiError::Unsupported(QueryKind::Sql));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpClient::new("http://localhost:8080/v1/", "key", Duration::from_secs(1));
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
