//! Process-level errors.
//!
//! Anything in here stops the whole run: the suite cannot continue without its
//! fixture data. Per-fixture failures are never errors at this level; they are
//! reported and tallied by the executor.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RunnerError {
    #[error("Failed to read fixture file '{}'", .path.display())]
    #[diagnostic(
        code(querycheck::fixture::read),
        help("fixture files are looked up as <fixtures-dir>/<category>.json; check --fixtures")
    )]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode fixture file: {message}")]
    #[diagnostic(code(querycheck::fixture::decode))]
    FixtureDecode {
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("invalid JSON here")]
        span: SourceSpan,
    },

    #[error("Invalid fixture '{name}' in '{}': {issue}", .path.display())]
    #[diagnostic(code(querycheck::fixture::shape))]
    FixtureShape {
        path: PathBuf,
        name: String,
        issue: String,
        #[help]
        help: Option<String>,
    },
}

impl RunnerError {
    /// Builds a decode diagnostic pointing at the line/column serde_json reported.
    pub fn decode(path: &std::path::Path, source: &str, err: &serde_json::Error) -> Self {
        let offset = line_col_to_offset(source, err.line(), err.column());
        RunnerError::FixtureDecode {
            message: err.to_string(),
            src: Arc::new(NamedSource::new(path.display().to_string(), source.to_string())),
            span: SourceSpan::from((offset, 0)),
        }
    }
}

// serde_json lines and columns are 1-based; column 0 means "before the line".
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}
