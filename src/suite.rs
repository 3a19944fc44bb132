//! Suite orchestration: categories in order, fixtures in order, one tally.
//!
//! The orchestrator owns the pass/fail [`Tally`] behind a shared handle so the
//! interruption listener can print a consistent snapshot while the main loop
//! is still running. Nothing else mutates it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::QueryApi;
use crate::error::RunnerError;
use crate::executor::{Executor, Outcome};
use crate::fixture::{FixtureSet, QueryKind};
use crate::output::OutputSink;

// ============================================================================
// TALLY
// ============================================================================

/// Pass/fail counts of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
    pub successes: usize,
    pub failures: usize,
    pub failed_tests: Vec<String>,
}

impl Tally {
    pub fn record(&mut self, name: &str, outcome: Outcome) {
        match outcome {
            Outcome::Passed { .. } => self.successes += 1,
            Outcome::Failed => {
                self.failures += 1;
                self.failed_tests.push(name.to_string());
            }
        }
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    pub fn all_passed(&self) -> bool {
        self.failures == 0
    }

    /// Process exit status for this tally.
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}

/// Tally handle shared with the interruption listener.
pub type SharedTally = Arc<Mutex<Tally>>;

// ============================================================================
// SUITE
// ============================================================================

#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub fixtures_dir: PathBuf,
    pub extension: String,
    /// Categories to run; always processed in [`QueryKind::ALL`] order.
    pub categories: Vec<QueryKind>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            fixtures_dir: PathBuf::from("fixtures"),
            extension: ".json".to_string(),
            categories: QueryKind::ALL.to_vec(),
        }
    }
}

/// How a category run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Completed,
    Cancelled,
}

pub struct Suite<A> {
    executor: Executor<A>,
    config: SuiteConfig,
    tally: SharedTally,
    cancel: Arc<AtomicBool>,
}

impl<A: QueryApi> Suite<A> {
    pub fn new(executor: Executor<A>, config: SuiteConfig) -> Self {
        Self {
            executor,
            config,
            tally: SharedTally::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tally_handle(&self) -> SharedTally {
        Arc::clone(&self.tally)
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Snapshot of the current tally.
    pub fn tally(&self) -> Tally {
        self.tally.lock().clone()
    }

    pub fn executor(&self) -> &Executor<A> {
        &self.executor
    }

    /// Categories selected by the configuration, in processing order.
    pub fn categories(&self) -> Vec<QueryKind> {
        QueryKind::ALL
            .into_iter()
            .filter(|kind| self.config.categories.contains(kind))
            .collect()
    }

    /// Runs every selected category, loading each fixture file on demand.
    ///
    /// A fixture file that cannot be read or decoded aborts the run.
    pub fn run(&mut self, out: &mut dyn OutputSink) -> Result<Flow, RunnerError> {
        for kind in self.categories() {
            let set = FixtureSet::load(&self.config.fixtures_dir, kind, &self.config.extension)?;
            if self.run_set(&set, out) == Flow::Cancelled {
                return Ok(Flow::Cancelled);
            }
        }
        Ok(Flow::Completed)
    }

    /// Runs all fixtures of one category in order.
    pub fn run_set(&mut self, set: &FixtureSet, out: &mut dyn OutputSink) -> Flow {
        if set.is_empty() {
            tracing::info!(category = %set.kind, "no fixtures");
            out.emit(&format!("No fixtures for query type {}", set.kind));
            return Flow::Completed;
        }

        let self_contained = set.is_self_contained();
        tracing::debug!(category = %set.kind, fixtures = set.len(), self_contained, "running category");

        for (i, fixture) in set.fixtures.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                return Flow::Cancelled;
            }

            out.emit(&format!(
                "({}/{}) Executing test \"{}\"",
                i + 1,
                set.len(),
                fixture.name
            ));
            if let Some(description) = &fixture.description {
                out.emit(&format!("  Description: {}", description));
            }
            out.emit(&format!("  Query type: {}", set.kind));

            let outcome = self.executor.run(set.kind, fixture, self_contained, out);
            self.tally.lock().record(&fixture.name, outcome);
        }
        Flow::Completed
    }
}
