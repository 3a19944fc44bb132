//! querycheck: a fixture-driven integration test runner for an
//! eventually-consistent query API.
//!
//! The verification engine is made of two leaves, [`translate`] (run-unique
//! identifiers) and [`compare`] (type-tolerant JSON comparison), driven by the
//! [`executor`] one fixture at a time and by the [`suite`] across categories.

pub use crate::error::RunnerError;
pub use crate::value::{Number, Value};

pub mod cli;
pub mod client;
pub mod compare;
pub mod config;
pub mod error;
pub mod executor;
pub mod fixture;
pub mod output;
pub mod signal;
pub mod suite;
pub mod translate;
pub mod value;
