use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Represents a single parsed access log entry.
///
/// Fields are kept as raw text: the parser only slices the line, it never
/// decides whether a value is acceptable. That is the rule engine's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub source_ip: String,
    pub timestamp: DateTime<FixedOffset>,
    pub method: String,
    pub url: String,
    pub status_code: String,
    pub body_size: String,
    pub host: String,
    pub user_agent: String,
}

/// Errors that can occur during log parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// No `[...]` group was found on the line
    #[error("no bracketed timestamp found")]
    MissingTimestamp,

    /// The bracketed group did not match `dd/Mon/yyyy:HH:MM:SS +zzzz`
    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Request, referrer and user agent must all be quoted
    #[error("expected at least 3 quoted fields, found {found}")]
    MissingQuotedFields { found: usize },

    /// The request has a method but nothing after it
    #[error("request line '{0}' has no URL")]
    MissingUrl(String),

    /// A positional token is out of range
    #[error("expected a token at position {index}, line only has {found}")]
    MissingToken { index: usize, found: usize },

    /// The raw bytes of the line are not UTF-8
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),
}

/// Expected log format:
///   CLIENT - IDENT [dd/Mon/yyyy:HH:MM:SS +zzzz] "METHOD URL PROTO" STATUS BODY_SIZE HOST "REFERRER" "USER_AGENT"
///
/// Example:
///   10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /1/status HTTP/1.1" 200 512 https://status.google.com/ "-" "Mozilla/5.0"
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

const STATUS_CODE_INDEX: usize = 8;
const BODY_SIZE_INDEX: usize = 9;
const HOST_INDEX: usize = 10;

static TIMESTAMP_REGEX: OnceLock<Regex> = OnceLock::new();
static QUOTED_REGEX: OnceLock<Regex> = OnceLock::new();

fn timestamp_regex() -> &'static Regex {
    TIMESTAMP_REGEX
        .get_or_init(|| Regex::new(r"\[(.*?)\]").expect("hard-coded regex should always compile"))
}

fn quoted_regex() -> &'static Regex {
    QUOTED_REGEX
        .get_or_init(|| Regex::new(r#""(.+?)""#).expect("hard-coded regex should always compile"))
}

/// Parse a single access log line into a structured `LogRecord`.
///
/// Returns `Err(ParseError)` if the line lacks a timestamp, the quoted
/// request/referrer/user-agent groups, or enough positional tokens.
pub fn parse_log_line(line: &str) -> Result<LogRecord, ParseError> {
    let line = line.trim();

    let source_ip = source_ip(line).to_string();
    let timestamp = parse_timestamp(line)?;

    let quoted: Vec<&str> = quoted_regex()
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if quoted.len() < 3 {
        return Err(ParseError::MissingQuotedFields {
            found: quoted.len(),
        });
    }

    let (method, url) = split_request(quoted[0])?;
    let fields = positional_fields(line)?;

    Ok(LogRecord {
        source_ip,
        timestamp,
        method,
        url,
        status_code: fields.status_code.to_string(),
        body_size: fields.body_size.to_string(),
        host: fields.host.to_string(),
        user_agent: quoted[2].to_string(),
    })
}

/// Tokens read by position rather than by delimiter.
#[derive(Debug, PartialEq)]
pub struct PositionalFields<'a> {
    pub status_code: &'a str,
    pub body_size: &'a str,
    pub host: &'a str,
}

/// Extract status code, body size and host by their token index.
///
/// The line is split on single spaces, so doubled spaces produce empty tokens
/// and shift every later field. Any layout change belongs here.
pub fn positional_fields(line: &str) -> Result<PositionalFields<'_>, ParseError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let token = |index: usize| {
        tokens.get(index).copied().ok_or(ParseError::MissingToken {
            index,
            found: tokens.len(),
        })
    };

    Ok(PositionalFields {
        status_code: token(STATUS_CODE_INDEX)?,
        body_size: token(BODY_SIZE_INDEX)?,
        host: token(HOST_INDEX)?,
    })
}

/// Everything before the first `-`, then before the first space.
fn source_ip(line: &str) -> &str {
    let head = line.split('-').next().unwrap_or_default();
    head.split(' ').next().unwrap_or_default()
}

fn parse_timestamp(line: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let raw = timestamp_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(ParseError::MissingTimestamp)?;

    DateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|source| {
        ParseError::InvalidTimestamp {
            value: raw.to_string(),
            source,
        }
    })
}

fn split_request(request: &str) -> Result<(String, String), ParseError> {
    let (method, url) = request
        .split_once(' ')
        .ok_or_else(|| ParseError::MissingUrl(request.to_string()))?;
    Ok((method.replace('"', ""), url.to_string()))
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────
