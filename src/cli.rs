use crate::config::{MalformedPolicy, ScanConfig};
use crate::rules::{Rule, Selection};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable
    Text,
    /// One JSON object per line
    Json,
}

/// Flags suspicious entries in web server access logs
#[derive(Parser, Debug)]
#[command(
    name = "access_scanner",
    author,
    version,
    about = "Checks web server access logs against a set of security rules"
)]
#[command(group(
    ArgGroup::new("check")
        .required(true)
        .args(["all", "ip", "httpmethod", "url", "statuscode", "bodysize", "host", "httpprotocol", "useragent"])
))]
pub struct Args {
    /// Perform all the available checks
    #[arg(long)]
    pub all: bool,

    /// Check the IP address is valid
    #[arg(long)]
    pub ip: bool,

    /// Check which HTTP method is being used
    #[arg(long)]
    pub httpmethod: bool,

    /// Check the URL is an endpoint listed in the API documentation
    #[arg(long)]
    pub url: bool,

    /// Check the HTTP status code is not a server-side error
    #[arg(long)]
    pub statuscode: bool,

    /// Check the request body is not too large
    #[arg(long)]
    pub bodysize: bool,

    /// Check the host is valid
    #[arg(long)]
    pub host: bool,

    /// Check for connections made without encryption
    #[arg(long)]
    pub httpprotocol: bool,

    /// Check the user agent is a recognized client
    #[arg(long)]
    pub useragent: bool,

    /// Path to the access log to scan
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to the list of recognized user agents
    #[arg(long = "user-agents", value_name = "PATH")]
    pub user_agents: Option<PathBuf>,

    /// TOML file with allow-lists and thresholds
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Warn about malformed lines and keep going instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,

    /// Do not ask for confirmation before `--all`
    #[arg(short = 'y', long)]
    pub yes: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Diagnostic log level, overridden by RUST_LOG
    #[arg(long = "log-level", default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,
}

impl Args {
    pub fn selection(&self) -> Selection {
        let flags = [
            (self.ip, Rule::Ip),
            (self.httpmethod, Rule::HttpMethod),
            (self.url, Rule::Url),
            (self.statuscode, Rule::StatusCode),
            (self.bodysize, Rule::BodySize),
            (self.host, Rule::Host),
            (self.httpprotocol, Rule::HttpProtocol),
            (self.useragent, Rule::UserAgent),
        ];
        flags
            .into_iter()
            .find(|(set, _)| *set)
            .map(|(_, rule)| Selection::Single(rule))
            .unwrap_or(Selection::All)
    }

    /// Command-line paths and policy take precedence over the config file.
    pub fn apply_to(&self, config: &mut ScanConfig) {
        if let Some(path) = &self.log_file {
            config.input.log_file = path.clone();
        }
        if let Some(path) = &self.user_agents {
            config.input.user_agents_file = path.clone();
        }
        if self.skip_malformed {
            config.input.on_malformed = MalformedPolicy::Skip;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("access_scanner").chain(args.iter().copied()))
    }

    #[test]
    fn each_flag_selects_its_rule() {
        for rule in Rule::ALL {
            let flag = format!("--{}", rule.flag());
            let args = parse(&[flag.as_str()]).unwrap();
            assert_eq!(args.selection(), Selection::Single(rule));
        }
        assert_eq!(parse(&["--all"]).unwrap().selection(), Selection::All);
    }

    #[test]
    fn a_check_flag_is_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--log-file", "x.log"]).is_err());
    }

    #[test]
    fn check_flags_are_mutually_exclusive() {
        assert!(parse(&["--ip", "--host"]).is_err());
        assert!(parse(&["--all", "--useragent"]).is_err());
    }

    #[test]
    fn overrides_config_paths_and_policy() {
        let args = parse(&[
            "--ip",
            "--log-file",
            "/tmp/access.log",
            "--user-agents",
            "/tmp/ua.txt",
            "--skip-malformed",
        ])
        .unwrap();
        let mut config = ScanConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.input.log_file, PathBuf::from("/tmp/access.log"));
        assert_eq!(config.input.user_agents_file, PathBuf::from("/tmp/ua.txt"));
        assert_eq!(config.input.on_malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let args = parse(&["--statuscode"]).unwrap();
        let mut config = ScanConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config, ScanConfig::default());
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.log_level, "warn");
    }
}
