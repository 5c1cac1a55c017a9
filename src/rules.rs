//! Rule identifiers and the predicate table behind them.
//!
//! Every rule is a pure function over a [`LogRecord`]. The engine reaches a
//! predicate through `Rule::predicate`, which indexes the private registry
//! table by rule. `Rule::ALL` fixes the order `--all` runs them in.

use crate::allowlist::UserAgentAllowList;
use crate::config::RuleSettings;
use crate::parser::LogRecord;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::num::IntErrorKind;
use std::sync::OnceLock;

/// One security check against a single log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Ip,
    HttpMethod,
    Url,
    StatusCode,
    BodySize,
    Host,
    HttpProtocol,
    UserAgent,
}

impl Rule {
    /// Declared order used by `run_all`.
    pub const ALL: [Rule; 8] = [
        Rule::Ip,
        Rule::HttpMethod,
        Rule::Url,
        Rule::StatusCode,
        Rule::BodySize,
        Rule::Host,
        Rule::HttpProtocol,
        Rule::UserAgent,
    ];

    /// The command-line flag that selects this rule on its own.
    pub fn flag(self) -> &'static str {
        match self {
            Rule::Ip => "ip",
            Rule::HttpMethod => "httpmethod",
            Rule::Url => "url",
            Rule::StatusCode => "statuscode",
            Rule::BodySize => "bodysize",
            Rule::Host => "host",
            Rule::HttpProtocol => "httpprotocol",
            Rule::UserAgent => "useragent",
        }
    }

    /// Registry entries sit at their rule's discriminant.
    pub(crate) fn predicate(self) -> Predicate {
        let (rule, predicate) = REGISTRY[self as usize];
        debug_assert_eq!(rule, self, "registry out of order");
        predicate
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// Which rules a scan runs per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Single(Rule),
}

impl Selection {
    pub fn rules(self) -> Vec<Rule> {
        match self {
            Selection::All => Rule::ALL.to_vec(),
            Selection::Single(rule) => vec![rule],
        }
    }

    pub fn includes(self, rule: Rule) -> bool {
        match self {
            Selection::All => true,
            Selection::Single(selected) => selected == rule,
        }
    }
}

/// Everything a predicate may consult besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub settings: &'a RuleSettings,
    /// Must be `Some` whenever [`Rule::UserAgent`] is evaluated; with `None`
    /// that predicate has nothing to compare against and reports no violation.
    /// `RuleEngine::check` refuses to dispatch it in that case.
    pub user_agents: Option<&'a UserAgentAllowList>,
}

/// Returns `Some(reason)` when the record violates the rule.
pub type Predicate = fn(&LogRecord, &RuleContext<'_>) -> Option<String>;

static REGISTRY: [(Rule, Predicate); 8] = [
    (Rule::Ip, check_ip),
    (Rule::HttpMethod, check_http_method),
    (Rule::Url, check_url),
    (Rule::StatusCode, check_status_code),
    (Rule::BodySize, check_body_size),
    (Rule::Host, check_host),
    (Rule::HttpProtocol, check_http_protocol),
    (Rule::UserAgent, check_user_agent),
];

static SERVER_ERROR_REGEX: OnceLock<Regex> = OnceLock::new();

fn server_error_regex() -> &'static Regex {
    SERVER_ERROR_REGEX.get_or_init(|| {
        Regex::new(r"[5-9][0-9][0-9]+").expect("hard-coded regex should always compile")
    })
}

fn check_ip(record: &LogRecord, _: &RuleContext<'_>) -> Option<String> {
    match record.source_ip.parse::<IpAddr>() {
        Ok(_) => None,
        Err(_) => Some(format!("IP address {} is not valid.", record.source_ip)),
    }
}

/// Whitelist approach: TRACE, DEBUG and friends have no business in production.
fn check_http_method(record: &LogRecord, ctx: &RuleContext<'_>) -> Option<String> {
    if ctx.settings.allowed_methods.iter().any(|m| *m == record.method) {
        return None;
    }
    Some(format!(
        "The method of this request (i.e. '{}') looks suspicious.",
        record.method
    ))
}

fn check_url(record: &LogRecord, ctx: &RuleContext<'_>) -> Option<String> {
    let documented = ctx
        .settings
        .allowed_url_prefixes
        .iter()
        .any(|prefix| record.url.starts_with(prefix.as_str()));
    if documented {
        return None;
    }
    Some(format!(
        "The requested endpoint (i.e. '{}') is not being used by the documentation.",
        record.url
    ))
}

/// 5xx responses often follow injection attempts, so they are worth a look.
fn check_status_code(record: &LogRecord, _: &RuleContext<'_>) -> Option<String> {
    if !server_error_regex().is_match(&record.status_code) {
        return None;
    }
    Some(format!(
        "The HTTP code contained in this request (i.e. '{}') is related to a server-side error.",
        record.status_code
    ))
}

/// Any integer is compared against the limit, negative or not. Digits too
/// long for `i128` are still a size, just an enormous one.
fn check_body_size(record: &LogRecord, ctx: &RuleContext<'_>) -> Option<String> {
    let too_large = match record.body_size.parse::<i128>() {
        Ok(size) => size >= i128::from(ctx.settings.max_body_size),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => true,
            IntErrorKind::NegOverflow => false,
            _ => {
                return Some(format!(
                    "The body size of this HTTP request ('{}') is not a number.",
                    record.body_size
                ))
            }
        },
    };
    if !too_large {
        return None;
    }
    Some(format!(
        "The body size of this HTTP request ('{}') seems quite large.",
        record.body_size
    ))
}

fn check_host(record: &LogRecord, ctx: &RuleContext<'_>) -> Option<String> {
    let known = ctx
        .settings
        .allowed_hosts
        .iter()
        .any(|host| record.host.contains(host.as_str()));
    if known {
        return None;
    }
    Some(format!(
        "The host on this request (i.e. '{}') seems invalid.",
        record.host
    ))
}

fn check_http_protocol(record: &LogRecord, _: &RuleContext<'_>) -> Option<String> {
    if !record.host.contains("http://") {
        return None;
    }
    Some(format!(
        "The access to the host '{}' has been done without HTTPS on this request.",
        record.host
    ))
}

fn check_user_agent(record: &LogRecord, ctx: &RuleContext<'_>) -> Option<String> {
    // the engine refuses to dispatch here without an allow-list
    let agents = ctx.user_agents?;
    if agents.contains(&record.user_agent) {
        return None;
    }
    Some(format!(
        "The user agent of this HTTP request ('{}') seems suspicious.",
        record.user_agent
    ))
}
