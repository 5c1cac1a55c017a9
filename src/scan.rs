//! Drives a whole run: open inputs, feed lines in file order, summarize.

use crate::allowlist::{LoadError, UserAgentAllowList};
use crate::config::{MalformedPolicy, ScanConfig};
use crate::engine::RuleEngine;
use crate::error::ScanError;
use crate::parser::{parse_log_line, ParseError};
use crate::report::Reporter;
use crate::rules::{Rule, Selection};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Lines that were parsed and checked.
    pub checked: usize,
    /// Malformed lines passed over under [`MalformedPolicy::Skip`].
    pub skipped: usize,
    pub violations: u64,
}

pub fn open_log(path: &Path) -> Result<BufReader<File>, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::from_io(path, e))?;
    Ok(BufReader::new(file))
}

/// Run a complete scan as configured and hand back the reporter.
///
/// The user agent allow-list is only read when the selection needs it.
pub fn run_scan<R: Reporter>(
    config: &ScanConfig,
    selection: Selection,
    reporter: R,
) -> Result<(ScanOutcome, R), ScanError> {
    let reader = open_log(&config.input.log_file).map_err(|source| ScanError::Load {
        what: "The logs",
        source,
    })?;

    let user_agents = if selection.includes(Rule::UserAgent) {
        let list = UserAgentAllowList::load(&config.input.user_agents_file).map_err(|source| {
            ScanError::Load {
                what: "The user agent allow-list",
                source,
            }
        })?;
        Some(list)
    } else {
        None
    };

    let mut engine = RuleEngine::new(config.rules.clone(), user_agents, reporter);
    info!(path = %config.input.log_file.display(), ?selection, "starting scan");
    let outcome = scan_lines(reader, &mut engine, selection, config.input.on_malformed)?;
    engine.show_summary()?;
    Ok((outcome, engine.into_reporter()))
}

/// Parse and check every line of `reader` in order.
///
/// Every line goes through the parser, blank ones included, so the
/// malformed-line policy alone decides what happens to anything unparseable.
/// Lines that are not UTF-8 count as malformed too.
pub fn scan_lines<B: BufRead, R: Reporter>(
    mut reader: B,
    engine: &mut RuleEngine<R>,
    selection: Selection,
    policy: MalformedPolicy,
) -> Result<ScanOutcome, ScanError> {
    let mut outcome = ScanOutcome::default();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| ScanError::Read {
                line_number: line_number + 1,
                source,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let parsed = decode_line(&buf)
            .and_then(|line| parse_log_line(&line).map(|record| (line, record)));
        let (line, record) = match parsed {
            Ok(parsed) => parsed,
            Err(source) => match policy {
                MalformedPolicy::Abort => {
                    return Err(ScanError::Malformed {
                        line_number,
                        source,
                    })
                }
                MalformedPolicy::Skip => {
                    warn!(line = line_number, error = %source, "skipping malformed log entry");
                    outcome.skipped += 1;
                    continue;
                }
            },
        };

        engine.load(line, record, line_number);
        let failed = engine.run(selection)?;
        if failed > 0 {
            debug!(line = line_number, failed, "entry raised violations");
        }
        outcome.checked += 1;
    }

    outcome.violations = engine.violations();
    info!(
        checked = outcome.checked,
        skipped = outcome.skipped,
        violations = outcome.violations,
        "scan finished"
    );
    Ok(outcome)
}

/// Drop the line terminator (`\n` or `\r\n`) and check the encoding.
fn decode_line(raw: &[u8]) -> Result<String, ParseError> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(ParseError::InvalidUtf8)
}
