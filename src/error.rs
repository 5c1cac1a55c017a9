//! Run-level error type and exit code mapping

use crate::allowlist::LoadError;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::parser::ParseError;

/// Anything that ends a scan early.
///
/// Rule violations are not errors; they are reported and counted.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The log source or the user agent allow-list is missing or unreadable.
    #[error("{what} {source}")]
    Load {
        what: &'static str,
        #[source]
        source: LoadError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A line failed to parse while the abort policy was in effect.
    #[error("malformed log entry on line {line_number}: {source}")]
    Malformed {
        line_number: usize,
        #[source]
        source: ParseError,
    },

    #[error("could not read line {line_number}: {source}")]
    Read {
        line_number: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Terminal I/O outside of reporting, e.g. the confirmation prompt.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The operator cancelled the run.
    #[error("Operation interrupted")]
    Interrupted,
}

impl ScanError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                        |
    /// |------|------------------------------------------------|
    /// | 0    | Success, or the confirmation was declined      |
    /// | 1    | Any error that stopped the scan                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Load { .. }
            | Self::Config(_)
            | Self::Malformed { .. }
            | Self::Read { .. }
            | Self::Engine(_)
            | Self::Io(_)
            | Self::Interrupted => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn load_error_names_the_input() {
        let err = ScanError::Load {
            what: "The logs",
            source: LoadError::NotFound {
                path: PathBuf::from("./data/samples.log"),
            },
        };
        assert_eq!(err.to_string(), "The logs './data/samples.log' could not be found");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn interrupted_has_distinct_message() {
        assert_eq!(ScanError::Interrupted.to_string(), "Operation interrupted");
        assert_eq!(ScanError::Interrupted.exit_code(), 1);
    }

    #[test]
    fn malformed_reports_line_number() {
        let err = ScanError::Malformed {
            line_number: 4,
            source: ParseError::MissingTimestamp,
        };
        assert!(err.to_string().starts_with("malformed log entry on line 4"));
    }
}
