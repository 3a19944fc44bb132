//! Semantic comparison of decoded JSON values.
//!
//! [`compare`] is a structural match over [`Value`] pairs with three
//! tolerances that plain equality lacks:
//!
//! - arrays are compared as an order-insensitive existence check;
//! - numbers are compared across their decoded representations, with integer
//!   extraction for opaque tokens and relative closeness for floats;
//! - shape mismatches are simply "not equal", never an error.
//!
//! The `"ignore"` sentinel is a property of fixture `expected` blocks, not of
//! values, so it is handled by [`verify_fields`] before recursing.

use crate::value::{Map, Number, Value};

/// Literal that marks an expected field as unchecked.
pub const IGNORE: &str = "ignore";

/// Relative tolerance used for floating comparisons.
pub const REL_TOLERANCE: f64 = 1e-9;

/// Returns true if `actual` satisfies `expected`.
pub fn compare(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => compare_maps(e, a),
        (Value::Array(e), Value::Array(a)) => compare_arrays(e, a),
        (Value::Number(e), Value::Number(a)) => compare_numbers(e, a),
        (Value::String(e), Value::String(a)) => e == a,
        (Value::Bool(e), Value::Bool(a)) => e == a,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

/// Relative closeness: `|a-b| <= max(1e-9 * max(|a|,|b|), 0)`.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= (REL_TOLERANCE * a.abs().max(b.abs())).max(0.0)
}

/// Returns true if an expected field carries the `"ignore"` sentinel.
pub fn is_ignored(expected: &Value) -> bool {
    expected.as_str() == Some(IGNORE)
}

/// A single expected field that did not match.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: Value,
    pub actual: Option<Value>,
}

/// Checks every non-ignored field of `expected` against `actual`.
///
/// Returns the first mismatching field, or `None` when all fields match. An
/// `actual` that is not an object fails on its first checked field.
pub fn verify_fields(expected: &Map, actual: &Value) -> Option<FieldMismatch> {
    for (field, want) in expected.iter() {
        if is_ignored(want) {
            continue;
        }
        let got = actual.get(field);
        let matched = got.is_some_and(|got| compare(want, got));
        if !matched {
            return Some(FieldMismatch {
                field: field.clone(),
                expected: want.clone(),
                actual: got.cloned(),
            });
        }
    }
    None
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn compare_maps(expected: &Map, actual: &Map) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().all(|(key, want)| match actual.get(key) {
        Some(got) => compare(want, got),
        None => false,
    })
}

// Many-to-one tolerant: an actual element may satisfy several expected ones.
fn compare_arrays(expected: &[Value], actual: &[Value]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected
        .iter()
        .all(|want| actual.iter().any(|got| compare(want, got)))
}

fn compare_numbers(expected: &Number, actual: &Number) -> bool {
    match (expected, actual) {
        (Number::Int(e), Number::Token(_)) => match actual.integral() {
            Some(a) => *e == a,
            None => close_numbers(expected, actual),
        },
        (Number::Float(_), _) | (_, Number::Float(_)) => close_numbers(expected, actual),
        _ => match (expected.integral(), actual.integral()) {
            (Some(e), Some(a)) => e == a,
            _ => close_numbers(expected, actual),
        },
    }
}

fn close_numbers(expected: &Number, actual: &Number) -> bool {
    match (expected.as_f64(), actual.as_f64()) {
        (Some(e), Some(a)) => is_close(e, a),
        _ => false,
    }
}
