//! Error taxonomy shared by the parser, index, enumerator and sync engine.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by library operations.
///
/// Batch operations catch these per repository and keep going; standalone
/// operations let them reach the process boundary.
#[derive(Debug, Error)]
pub enum ClonerError {
    /// Input URL could not be decomposed unambiguously
    #[error("invalid URL '{url}': {reason}")]
    Format { url: String, reason: String },

    /// Bulk enumeration requested against a host with no registered provider
    #[error("API fetching is not supported for host '{host}'")]
    UnsupportedHost { host: String },

    /// Neither the organization nor the user endpoint knows this name
    #[error("organization or user '{name}' not found")]
    NotFound { name: String },

    /// Transient rate limiting; retried inside the enumerator
    #[error("rate limited by {host}")]
    RateLimited { host: String },

    /// Hosting API answered with a status that is not retried
    #[error("API request to {url} failed: {reason}")]
    Api { url: String, reason: String },

    /// A VCS subprocess exited unsuccessfully or could not be started
    #[error("`{command}` failed ({status}): {stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    /// An external operation exceeded its configured time limit
    #[error("`{operation}` timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    /// The index file could not be read, parsed or written
    #[error("index {}{}: {source}", .path.display(), .line.map(|l| format!(" line {l}")).unwrap_or_default())]
    Index {
        path: PathBuf,
        line: Option<usize>,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure outside the index (e.g. creating parent directories)
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Interrupted by the user before the batch finished
    #[error("operation cancelled by user")]
    Cancelled,
}

impl ClonerError {
    pub fn format(url: &str, reason: impl Into<String>) -> Self {
        Self::Format {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = ClonerError> = std::result::Result<T, E>;
