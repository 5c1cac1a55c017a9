use crate::rules::Rule;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};

/// A single failed rule against a single line. Handed to the reporter and dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation<'a> {
    pub line_number: usize,
    pub rule: Rule,
    pub reason: String,
    pub line: &'a str,
}

/// Receives violations as they happen and the total at the end of a run.
pub trait Reporter {
    fn violation(&mut self, violation: &RuleViolation<'_>) -> io::Result<()>;
    fn summary(&mut self, total: u64) -> io::Result<()>;
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn violation(&mut self, violation: &RuleViolation<'_>) -> io::Result<()> {
        (**self).violation(violation)
    }

    fn summary(&mut self, total: u64) -> io::Result<()> {
        (**self).summary(total)
    }
}

pub const ALL_CLEAR: &str = "No entries were found to be suspicious.";

pub fn summary_message(total: u64) -> String {
    if total == 0 {
        return ALL_CLEAR.to_string();
    }
    format!(
        "A total of {} suspicious entries have been found. Note that some entries might have been \
         counted more than once in case they raised errors on multiple checks.",
        total
    )
}

/// Colored, human-readable output.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn violation(&mut self, violation: &RuleViolation<'_>) -> io::Result<()> {
        let header = format!(
            "Potential error on line {}. The following details thrown an error:",
            violation.line_number
        );
        writeln!(self.out, "{}", header.red())?;
        writeln!(self.out, "{}", violation.reason.yellow())?;
        writeln!(self.out, "{}", violation.line.trim_end().blue())
    }

    fn summary(&mut self, total: u64) -> io::Result<()> {
        let message = summary_message(total);
        if total == 0 {
            writeln!(self.out, "{}", message.green())
        } else {
            writeln!(self.out, "{}", message.cyan())
        }
    }
}

#[derive(Serialize)]
struct SummaryLine {
    total_violations: u64,
}

/// One JSON object per line: each violation, then the total.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn violation(&mut self, violation: &RuleViolation<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, violation)?;
        writeln!(self.out)
    }

    fn summary(&mut self, total: u64) -> io::Result<()> {
        serde_json::to_writer(
            &mut self.out,
            &SummaryLine {
                total_violations: total,
            },
        )?;
        writeln!(self.out)
    }
}

/// Owned copy of a violation, as kept by [`CollectingReporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedViolation {
    pub line_number: usize,
    pub rule: Rule,
    pub reason: String,
    pub line: String,
}

/// Keeps everything in memory; handy for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub violations: Vec<RecordedViolation>,
    pub summaries: Vec<u64>,
}

impl Reporter for CollectingReporter {
    fn violation(&mut self, violation: &RuleViolation<'_>) -> io::Result<()> {
        self.violations.push(RecordedViolation {
            line_number: violation.line_number,
            rule: violation.rule,
            reason: violation.reason.clone(),
            line: violation.line.to_string(),
        });
        Ok(())
    }

    fn summary(&mut self, total: u64) -> io::Result<()> {
        self.summaries.push(total);
        Ok(())
    }
}
