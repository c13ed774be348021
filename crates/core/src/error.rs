//! Error type shared by every stage of the generator.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failures. Anything that only degrades output is reported as a
/// [`Diagnostic`](crate::ir::Diagnostic) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file could not be read or written.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The OpenAPI document is not valid JSON/YAML for the expected shape.
    #[error("failed to parse API document: {0}")]
    Parse(String),

    /// Output could not be serialized.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The config file is malformed.
    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        /// The config file.
        path: PathBuf,
        /// YAML error with its location.
        #[source]
        source: serde_yaml::Error,
    },

    /// A required config value is missing or selects nothing.
    #[error("{0}")]
    MissingConfig(String),

    /// The client `type` names no known target.
    #[error("unsupported client type: {0}")]
    UnsupportedTarget(String),

    /// A tag filter pattern does not compile.
    #[error("invalid {list} pattern {pattern:?}: {source}")]
    InvalidTagPattern {
        /// `include` or `exclude`.
        list: &'static str,
        /// The pattern as written.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// A derived IR references models it does not contain.
    #[error("unresolved model references: {}", names.join(", "))]
    UnresolvedReferences {
        /// Referenced names with no model, sorted.
        names: Vec<String>,
    },

    /// An external hook command failed to start or exited non-zero.
    #[error("{label} ({command}) failed: {status}")]
    CommandFailed {
        /// Which hook ran, e.g. `post-command`.
        label: String,
        /// The command line.
        command: String,
        /// Exit status or spawn error.
        status: String,
    },
}
