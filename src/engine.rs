//! Rule evaluation against one loaded log record at a time.
//!
//! The engine moves between two states: nothing loaded, and a record loaded.
//! Loading again replaces the previous record wholesale. Checks only observe
//! the loaded record; they never change it.

use crate::allowlist::UserAgentAllowList;
use crate::config::RuleSettings;
use crate::parser::LogRecord;
use crate::report::{Reporter, RuleViolation};
use crate::rules::{Rule, RuleContext, Selection};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no log record is loaded")]
    NotLoaded,

    #[error("the user agent allow-list was not loaded")]
    AllowListUnavailable,

    #[error("failed to report violation: {0}")]
    Report(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
struct LoadedEntry {
    line: String,
    record: LogRecord,
    line_number: usize,
}

/// Per-run mutable state: the current record and the violation counter.
#[derive(Debug, Default)]
pub struct ScanSession {
    loaded: Option<LoadedEntry>,
    violations: u64,
}

pub struct RuleEngine<R: Reporter> {
    settings: RuleSettings,
    user_agents: Option<UserAgentAllowList>,
    reporter: R,
    session: ScanSession,
}

impl<R: Reporter> RuleEngine<R> {
    /// `user_agents` may be `None` when the user agent rule will not run.
    pub fn new(settings: RuleSettings, user_agents: Option<UserAgentAllowList>, reporter: R) -> Self {
        Self {
            settings,
            user_agents,
            reporter,
            session: ScanSession::default(),
        }
    }

    /// Replace the loaded record. Line numbers are 1-based.
    pub fn load(&mut self, line: impl Into<String>, record: LogRecord, line_number: usize) {
        self.session.loaded = Some(LoadedEntry {
            line: line.into(),
            record,
            line_number,
        });
    }

    pub fn is_loaded(&self) -> bool {
        self.session.loaded.is_some()
    }

    pub fn violations(&self) -> u64 {
        self.session.violations
    }

    /// Evaluate one rule against the loaded record.
    ///
    /// Returns `Ok(true)` when a violation was reported. Repeating a check
    /// reports and counts it again.
    pub fn check(&mut self, rule: Rule) -> Result<bool, EngineError> {
        let entry = self.session.loaded.as_ref().ok_or(EngineError::NotLoaded)?;
        if rule == Rule::UserAgent && self.user_agents.is_none() {
            return Err(EngineError::AllowListUnavailable);
        }

        let ctx = RuleContext {
            settings: &self.settings,
            user_agents: self.user_agents.as_ref(),
        };
        let Some(reason) = rule.predicate()(&entry.record, &ctx) else {
            return Ok(false);
        };

        trace!(line = entry.line_number, %rule, "rule violated");
        self.reporter.violation(&RuleViolation {
            line_number: entry.line_number,
            rule,
            reason,
            line: &entry.line,
        })?;
        self.session.violations += 1;
        Ok(true)
    }

    pub fn validate_ip(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::Ip)
    }

    pub fn validate_method(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::HttpMethod)
    }

    pub fn validate_url(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::Url)
    }

    pub fn validate_status_code(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::StatusCode)
    }

    pub fn validate_body_size(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::BodySize)
    }

    pub fn validate_host(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::Host)
    }

    pub fn validate_protocol(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::HttpProtocol)
    }

    pub fn validate_user_agent(&mut self) -> Result<bool, EngineError> {
        self.check(Rule::UserAgent)
    }

    /// Every rule in declared order, without stopping at the first failure.
    /// Returns how many rules this record violated.
    pub fn run_all(&mut self) -> Result<u32, EngineError> {
        self.run(Selection::All)
    }

    pub fn run(&mut self, selection: Selection) -> Result<u32, EngineError> {
        let mut failed = 0;
        for rule in selection.rules() {
            if self.check(rule)? {
                failed += 1;
            }
        }
        Ok(failed)
    }

    pub fn show_summary(&mut self) -> Result<(), EngineError> {
        self.reporter.summary(self.session.violations)?;
        Ok(())
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_log_line;
    use crate::report::CollectingReporter;

    const CLEAN: &str = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /1/status HTTP/1.1" 200 512 https://status.google.com/ "-" "Mozilla/5.0""#;
    const HOSTILE: &str = r#"999.999.999.999 - - [10/Oct/2023:13:55:36 +0000] "TRACE /admin HTTP/1.1" 503 2048 http://evil.example/ "-" "sqlmap/1.7""#;

    fn engine() -> RuleEngine<CollectingReporter> {
        let settings = RuleSettings {
            allowed_hosts: vec!["google.com".to_string()],
            ..RuleSettings::default()
        };
        let agents = UserAgentAllowList::from_content("Mozilla/5.0\n");
        RuleEngine::new(settings, Some(agents), CollectingReporter::default())
    }

    fn loaded(line: &str) -> RuleEngine<CollectingReporter> {
        let mut engine = engine();
        engine.load(line, parse_log_line(line).unwrap(), 1);
        engine
    }

    #[test]
    fn check_before_load_fails() {
        let mut engine = engine();
        assert!(!engine.is_loaded());
        assert!(matches!(engine.validate_ip(), Err(EngineError::NotLoaded)));
        assert!(matches!(engine.run_all(), Err(EngineError::NotLoaded)));
        assert_eq!(engine.violations(), 0);
    }

    #[test]
    fn clean_record_has_no_violations() {
        let mut engine = loaded(CLEAN);
        assert_eq!(engine.run_all().unwrap(), 0);
        assert_eq!(engine.violations(), 0);
        assert!(engine.reporter().violations.is_empty());
    }

    #[test]
    fn run_all_counts_every_failing_rule() {
        let mut engine = loaded(HOSTILE);
        assert_eq!(engine.run_all().unwrap(), 8);
        assert_eq!(engine.violations(), 8);

        let rules: Vec<Rule> = engine.reporter().violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, Rule::ALL.to_vec());
    }

    #[test]
    fn cleartext_foreign_host_fails_two_rules() {
        let line = CLEAN.replace("https://status.google.com/", "http://evil.example/");
        let mut engine = loaded(&line);
        assert_eq!(engine.run_all().unwrap(), 2);
        let rules: Vec<Rule> = engine.reporter().violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![Rule::Host, Rule::HttpProtocol]);
    }

    #[test]
    fn repeated_checks_count_twice() {
        let mut engine = loaded(HOSTILE);
        assert!(engine.validate_status_code().unwrap());
        assert!(engine.validate_status_code().unwrap());
        assert_eq!(engine.violations(), 2);
        assert_eq!(engine.reporter().violations.len(), 2);
    }

    #[test]
    fn loading_replaces_previous_record() {
        let mut engine = loaded(HOSTILE);
        engine.load(CLEAN, parse_log_line(CLEAN).unwrap(), 2);
        assert!(!engine.validate_method().unwrap());
        assert!(!engine.validate_ip().unwrap());
        assert_eq!(engine.violations(), 0);
    }

    #[test]
    fn counter_is_never_reset_between_lines() {
        let mut engine = loaded(HOSTILE);
        engine.validate_body_size().unwrap();
        engine.load(HOSTILE, parse_log_line(HOSTILE).unwrap(), 2);
        engine.validate_body_size().unwrap();
        assert_eq!(engine.violations(), 2);

        let numbers: Vec<usize> = engine
            .reporter()
            .violations
            .iter()
            .map(|v| v.line_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn violation_carries_raw_line() {
        let mut engine = loaded(HOSTILE);
        engine.validate_url().unwrap();
        let violation = &engine.reporter().violations[0];
        assert_eq!(violation.line, HOSTILE);
        assert!(violation.reason.contains("/admin"));
    }

    #[test]
    fn user_agent_rule_requires_allow_list() {
        let mut engine = RuleEngine::new(
            RuleSettings::default(),
            None,
            CollectingReporter::default(),
        );
        engine.load(CLEAN, parse_log_line(CLEAN).unwrap(), 1);
        assert!(!engine.validate_host().unwrap());
        assert!(matches!(
            engine.validate_user_agent(),
            Err(EngineError::AllowListUnavailable)
        ));
    }

    #[test]
    fn summary_reports_running_total() {
        let mut engine = loaded(HOSTILE);
        engine.validate_protocol().unwrap();
        engine.show_summary().unwrap();
        assert_eq!(engine.into_reporter().summaries, vec![1]);
    }
}
