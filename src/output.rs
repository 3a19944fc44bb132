//! Handles all user-facing output of a run.
//!
//! Progress text, per-fixture status lines, failure diffs and the final
//! summary all go through an [`OutputSink`], so the executor never writes to
//! stdout directly and tests can capture exactly what a user would see.

use std::fmt;
use std::io::Write;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::suite::Tally;

/// Outcome label printed on a fixture's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => f.write_str("Passed"),
            Status::Failed => f.write_str("Failed"),
        }
    }
}

/// Destination for human-readable run output.
pub trait OutputSink {
    /// Emits one line of text.
    fn emit(&mut self, text: &str);

    /// Emits a fixture's status line followed by a blank separator line.
    fn emit_status(&mut self, status: Status) {
        self.emit(&format!("  Status: {}", status));
        self.emit("");
    }

    /// Emits a line diff between two renderings.
    fn emit_diff(&mut self, diffs: &[Difference]) {
        for line in diff_lines(diffs) {
            self.emit(&line);
        }
    }
}

// ============================================================================
// OUTPUT SINKS: OutputBuffer and StdoutSink implementations
// ============================================================================

/// OutputBuffer: collects output into a String for testing or programmatic capture.
#[derive(Debug, Default, Clone)]
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(text);
    }
}

/// StdoutSink: writes to stdout, coloring status words and diffs.
pub struct StdoutSink {
    stream: StandardStream,
}

impl StdoutSink {
    pub fn new(color: ColorChoice) -> Self {
        Self {
            stream: StandardStream::stdout(color),
        }
    }

    fn write_colored(&mut self, text: &str, color: Color) {
        let _ = self
            .stream
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(self.stream, "{}", text);
        let _ = self.stream.reset();
    }
}

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        let _ = writeln!(self.stream, "{}", text);
    }

    fn emit_status(&mut self, status: Status) {
        let color = match status {
            Status::Passed => Color::Green,
            Status::Failed => Color::Red,
        };
        let _ = write!(self.stream, "  Status: ");
        self.write_colored(&status.to_string(), color);
        let _ = writeln!(self.stream);
        let _ = writeln!(self.stream);
    }

    fn emit_diff(&mut self, diffs: &[Difference]) {
        for diff in diffs {
            let (color, prefix, text) = match diff {
                Difference::Same(x) => (None, ' ', x),
                Difference::Add(x) => (Some(Color::Green), '+', x),
                Difference::Rem(x) => (Some(Color::Red), '-', x),
            };
            for line in text.lines() {
                let _ = self.stream.set_color(ColorSpec::new().set_fg(color));
                let _ = writeln!(self.stream, "    {}{}", prefix, line);
            }
        }
        let _ = self.stream.reset();
    }
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Line diff of two multi-line renderings, expected first.
pub fn line_diff(expected: &str, actual: &str) -> Vec<Difference> {
    Changeset::new(expected, actual, "\n").diffs
}

/// Writes the end-of-run summary.
pub fn write_summary(sink: &mut dyn OutputSink, tally: &Tally) {
    sink.emit("");
    sink.emit("Results:");
    sink.emit(&format!("  Successes: {}", tally.successes));
    sink.emit(&format!("  Fails: {}", tally.failures));
    for name in &tally.failed_tests {
        sink.emit(&format!("    -  {}", name));
    }
    sink.emit("");

    if tally.failures > 0 {
        let noun = if tally.failures == 1 {
            "test has"
        } else {
            "tests have"
        };
        sink.emit(&format!("FAIL: {} {} failed", tally.failures, noun));
    } else {
        sink.emit("SUCCESS: All tests passed");
    }
}

/// Formats `count` with the singular or plural noun.
pub fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn diff_lines(diffs: &[Difference]) -> Vec<String> {
    let mut lines = Vec::new();
    for diff in diffs {
        let (prefix, text) = match diff {
            Difference::Same(x) => (' ', x),
            Difference::Add(x) => ('+', x),
            Difference::Rem(x) => ('-', x),
        };
        lines.extend(text.lines().map(|line| format!("    {}{}", prefix, line)));
    }
    lines
}
