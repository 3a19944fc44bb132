//! Runs a single fixture against the query API.
//!
//! Each fixture goes through `Setup -> Act -> Verify`, with at most one
//! `Retry` (settle, re-`Act`, re-`Verify`) when verification finds a value
//! mismatch:
//!
//! - **Setup** (self-contained fixtures only): create the declared columns
//!   under run-unique names, insert the translated payload, then wait for the
//!   settle duration.
//! - **Act**: for delete/update, run and acknowledge the additional operation
//!   first, then query entity counts. Raw queries are sent verbatim;
//!   structured queries are translated first.
//! - **Verify**: compare each non-ignored expected field with the result.
//!
//! A failed collaborator call ends the fixture immediately and is never
//! retried. The retry re-runs only the verification query, never setup or the
//! additional operation, so fixtures must not depend on re-insertion to pass.

use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::client::{ApiError, QueryApi};
use crate::compare::{verify_fields, FieldMismatch};
use crate::fixture::{Fixture, Query, QueryKind};
use crate::output::{line_diff, plural, OutputSink, Status};
use crate::translate::{Translator, API_NAME_FIELD};
use crate::value::{Map, Value};

/// Result of running one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed { retried: bool },
    Failed,
}

impl Outcome {
    pub fn is_pass(self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Pause after inserts and before a retry.
    pub settle: Duration,
    /// Echo translated payloads and print failure diffs.
    pub verbose: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(10),
            verbose: true,
        }
    }
}

/// Why a step could not produce a result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("fixture has no usable {0}")]
    Fixture(&'static str),
}

pub struct Executor<A> {
    api: A,
    translator: Translator,
    config: ExecutorConfig,
}

impl<A: QueryApi> Executor<A> {
    pub fn new(api: A, config: ExecutorConfig) -> Self {
        Self::with_translator(api, Translator::new(), config)
    }

    pub fn with_translator(api: A, translator: Translator, config: ExecutorConfig) -> Self {
        Self {
            api,
            translator,
            config,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Runs `fixture` of category `kind` to completion.
    ///
    /// `self_contained` is decided per category by the orchestrator.
    pub fn run(
        &mut self,
        kind: QueryKind,
        fixture: &Fixture,
        self_contained: bool,
        out: &mut dyn OutputSink,
    ) -> Outcome {
        self.translator.clear();

        if self_contained {
            if let Err(err) = self.setup(fixture, out) {
                tracing::warn!(fixture = %fixture.name, error = %err, "setup aborted");
                self.report_error(&fixture.expected, &err, out);
                return Outcome::Failed;
            }
        }

        let target = if kind.is_mutation() {
            if !self.run_additional(kind, fixture, out) {
                return Outcome::Failed;
            }
            QueryKind::CountEntity
        } else {
            kind
        };

        let expected = self.expected_fields(fixture, self_contained);
        match self.act(target, fixture, out) {
            Ok(actual) => self.verify(target, fixture, &expected, &actual, out),
            Err(err) => {
                self.report_error(&Value::Object(expected), &err, out);
                Outcome::Failed
            }
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    fn setup(&mut self, fixture: &Fixture, out: &mut dyn OutputSink) -> Result<(), StepError> {
        let columns = fixture.columns();
        if !columns.is_empty() {
            out.emit(&format!("  Creating {}", plural(columns.len(), "column", "columns")));
        }
        for column in columns {
            let renamed = self.translator.timestamp_column(column);
            self.api.create_column(&renamed)?;
            if self.config.verbose {
                let api_name = renamed.get(API_NAME_FIELD).and_then(Value::as_str);
                out.emit(&format!("    - {}", api_name.unwrap_or_default()));
            }
        }

        if let Some(insert) = &fixture.insert {
            let entities = insert.as_object().map_or(0, |m| m.len());
            out.emit(&format!("  Inserting {}", plural(entities, "entity", "entities")));
            let translated = self.translator.apply(insert);
            self.echo(&translated, out);
            self.api.insert(&translated)?;
            self.settle();
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Act
    // ------------------------------------------------------------------------

    /// Runs the delete/update operation and checks its acknowledgment.
    ///
    /// Every non-ignored field of `result_additional` must match; there is no
    /// retry at this stage.
    fn run_additional(&mut self, kind: QueryKind, fixture: &Fixture, out: &mut dyn OutputSink) -> bool {
        let (Some(operation), Some(ack)) = (&fixture.additional_operation, &fixture.result_additional)
        else {
            self.report_error(&fixture.expected, &StepError::Fixture("additional_operation"), out);
            return false;
        };

        let operation = self.translator.apply(operation);
        let ack = self.translator.apply(ack).into_native();
        out.emit(if kind == QueryKind::Delete {
            "  Deleting"
        } else {
            "  Updating"
        });
        self.echo(&operation, out);

        let result = match kind {
            QueryKind::Delete => self.api.delete(&operation),
            _ => self.api.update(&operation),
        };
        let actual = match result {
            Ok(actual) => actual,
            Err(err) => {
                self.report_error(&ack, &StepError::from(err), out);
                return false;
            }
        };

        let ack_fields = ack.as_object().cloned().unwrap_or_default();
        match verify_fields(&ack_fields, &actual) {
            None => {
                out.emit("  Operation acknowledged");
                true
            }
            Some(mismatch) => {
                self.report_mismatch(&mismatch, out);
                false
            }
        }
    }

    fn act(
        &mut self,
        target: QueryKind,
        fixture: &Fixture,
        out: &mut dyn OutputSink,
    ) -> Result<Value, StepError> {
        match fixture.query().ok_or(StepError::Fixture("query"))? {
            Query::Raw(text) => Ok(self.api.sql(text)?),
            Query::Structured(query) => {
                let translated = self.translator.apply(query);
                out.emit("  Querying");
                self.echo(&translated, out);
                Ok(self.api.query(target, &translated)?)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Verify
    // ------------------------------------------------------------------------

    fn expected_fields(&self, fixture: &Fixture, self_contained: bool) -> Map {
        if !self_contained {
            return fixture.expected_fields();
        }
        self.translator
            .apply(&fixture.expected)
            .into_native()
            .as_object()
            .cloned()
            .unwrap_or_default()
    }

    fn verify(
        &mut self,
        target: QueryKind,
        fixture: &Fixture,
        expected: &Map,
        actual: &Value,
        out: &mut dyn OutputSink,
    ) -> Outcome {
        if verify_fields(expected, actual).is_none() {
            out.emit_status(Status::Passed);
            return Outcome::Passed { retried: false };
        }

        out.emit("  Trying again");
        tracing::info!(fixture = %fixture.name, "result mismatch, retrying after settle");
        self.settle();

        let retried = match self.act(target, fixture, out) {
            Ok(actual) => actual,
            Err(err) => {
                self.report_error(&Value::Object(expected.clone()), &err, out);
                return Outcome::Failed;
            }
        };
        match verify_fields(expected, &retried) {
            None => {
                out.emit("  Passed at second try!");
                out.emit_status(Status::Passed);
                Outcome::Passed { retried: true }
            }
            Some(mismatch) => {
                self.report_mismatch(&mismatch, out);
                Outcome::Failed
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    fn report_error(&self, expected: &Value, err: &StepError, out: &mut dyn OutputSink) {
        let shown = expected.get("result").unwrap_or(expected);
        out.emit(&format!("  Expected: \"result\": {}", shown));
        out.emit(&format!("  Result: \"result\": {}", err));
        out.emit_status(Status::Failed);
    }

    fn report_mismatch(&self, mismatch: &FieldMismatch, out: &mut dyn OutputSink) {
        let actual = mismatch
            .actual
            .as_ref()
            .map_or_else(|| "(missing)".to_string(), Value::to_string);
        out.emit(&format!("  Expected: \"{}\": {}", mismatch.field, mismatch.expected));
        out.emit(&format!("  Result: \"{}\": {}", mismatch.field, actual));
        if self.config.verbose {
            if let Some(actual) = &mismatch.actual {
                out.emit_diff(&line_diff(&mismatch.expected.to_pretty(), &actual.to_pretty()));
            }
        }
        out.emit_status(Status::Failed);
    }

    fn echo(&self, payload: &Value, out: &mut dyn OutputSink) {
        if self.config.verbose {
            out.emit(&format!("    - {}", payload));
        }
    }

    fn settle(&self) {
        if !self.config.settle.is_zero() {
            thread::sleep(self.config.settle);
        }
    }
}
