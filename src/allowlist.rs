use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Failure to obtain a required input file. Always fatal for the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'{path}' could not be found")]
    NotFound { path: PathBuf },

    #[error("'{path}' could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Recognized user agents, kept as the raw file text.
///
/// Membership is substring containment over the whole content, so a partial
/// agent string such as `curl` matches a listed `curl/8.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentAllowList {
    content: String,
}

impl UserAgentAllowList {
    /// Read the allow-list once for the duration of a run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;
        debug!(path = %path.display(), lines = content.lines().count(), "loaded user agent allow-list");
        Ok(Self::from_content(content))
    }

    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.content.contains(agent)
    }
}
