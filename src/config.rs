//! Scan configuration.
//!
//! [`ScanConfig`] carries everything the engine would otherwise hardcode:
//! allowed hosts, documented URL prefixes, allowed methods, the body size
//! limit, input paths and the malformed-line policy.
//!
//! # Loading order
//! 1. CLI arguments (highest)
//! 2. TOML file passed with `--config`
//! 3. `Default` implementations
//!
//! ```no_run
//! use access_scanner::config::ScanConfig;
//!
//! let config = ScanConfig::parse("[rules]\nmax_body_size = 4096").unwrap();
//! assert_eq!(config.rules.max_body_size, 4096);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LOG_FILE: &str = "./data/samples.log";
pub const DEFAULT_USER_AGENTS_FILE: &str = "./data/user-agents.txt";
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration, one TOML table per section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub rules: RuleSettings,
}

impl ScanConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// What to do with a line the parser rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Stop the whole run on the first unparseable line.
    #[default]
    Abort,
    /// Warn, count the line as skipped and move on.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub log_file: PathBuf,
    pub user_agents_file: PathBuf,
    pub on_malformed: MalformedPolicy,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            user_agents_file: PathBuf::from(DEFAULT_USER_AGENTS_FILE),
            on_malformed: MalformedPolicy::Abort,
        }
    }
}

/// Allow-lists and thresholds consulted by the rule predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Substrings a host must contain.
    pub allowed_hosts: Vec<String>,
    /// Documented endpoints; a URL must start with one of these.
    pub allowed_url_prefixes: Vec<String>,
    pub allowed_methods: Vec<String>,
    /// Bodies of this size or larger are flagged.
    pub max_body_size: u64,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            allowed_hosts: to_strings(&["https://www.google.com/", "https://status.google.com/"]),
            allowed_url_prefixes: to_strings(&[
                "/1/indexing",
                "/1/infrastructure",
                "/1/inventory",
                "/1/latency",
                "/1/reachability",
                "/1/status",
            ]),
            allowed_methods: to_strings(&["GET", "POST", "HEAD", "PUT", "DELETE", "OPTIONS"]),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_api() {
        let config = ScanConfig::default();
        assert_eq!(config.rules.max_body_size, 1500);
        assert_eq!(config.rules.allowed_methods.len(), 6);
        assert_eq!(config.rules.allowed_url_prefixes.len(), 6);
        assert_eq!(config.input.on_malformed, MalformedPolicy::Abort);
        assert_eq!(config.input.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(ScanConfig::parse("").unwrap(), ScanConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = ScanConfig::parse(
            r#"
            [rules]
            allowed_hosts = ["google.com"]

            [input]
            on_malformed = "skip"
            "#,
        )
        .unwrap();
        assert_eq!(config.rules.allowed_hosts, vec!["google.com".to_string()]);
        assert_eq!(config.rules.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.input.on_malformed, MalformedPolicy::Skip);
        assert_eq!(
            config.input.user_agents_file,
            PathBuf::from(DEFAULT_USER_AGENTS_FILE)
        );
    }

    #[test]
    fn rejects_wrong_types() {
        let err = ScanConfig::parse("[rules]\nmax_body_size = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rules]\nmax_body_size = 10").unwrap();
        let config = ScanConfig::from_file(file.path()).unwrap();
        assert_eq!(config.rules.max_body_size, 10);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ScanConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
