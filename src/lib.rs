//! Rule-based scanner for web server access logs.
//!
//! Each line is parsed into a [`parser::LogRecord`], loaded into a
//! [`engine::RuleEngine`] and checked against one or all [`rules::Rule`]s.
//! Failures go to a [`report::Reporter`] and are counted.

pub mod allowlist;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod rules;
pub mod scan;

pub use engine::{EngineError, RuleEngine};
pub use error::ScanError;
pub use parser::{parse_log_line, LogRecord, ParseError};
pub use rules::{Rule, Selection};
