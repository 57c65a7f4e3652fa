use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Identifier of one commit in the external version history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(String);

impl CommitId {
    /// Creates a commit identifier from the versioning tool's output.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CommitId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Failure writing an audit entry to the log store.
#[derive(Debug, Error)]
pub enum WriteError {
    /// An entry with the same name already exists. Existing entries are
    /// immutable; a duplicate name must never truncate or overwrite.
    #[error("audit entry '{0}' already exists")]
    AlreadyExists(String),

    /// Underlying I/O failure while creating or writing the entry.
    #[error("failed to write audit entry '{entry_name}': {source}")]
    Io {
        /// Name of the entry that failed to write.
        entry_name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Failure staging or committing an audit entry into version history.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The staging step failed (path missing, permissions, tool error).
    #[error("failed to stage '{path}': {detail}")]
    StageFailed {
        /// Path that could not be staged.
        path: PathBuf,
        /// Tool output describing the failure.
        detail: String,
    },

    /// The commit step found nothing new to commit, e.g. after a prior
    /// partial failure already committed the same content. Non-fatal.
    #[error("nothing to commit")]
    NothingToCommit,

    /// Any other versioning tool failure.
    #[error("versioning tool failed: {0}")]
    Tool(String),
}

/// Port for persisting one audit record to a uniquely named entry in the
/// append-only log store.
#[async_trait]
pub trait AuditLogWriter: Send + Sync {
    /// Writes the record body to a new entry named `entry_name` and
    /// returns the path of the created resource.
    ///
    /// The log directory is created on first use. An existing entry with
    /// the same name surfaces as [`WriteError::AlreadyExists`].
    async fn write(&self, entry_name: &str, body: &Value) -> Result<PathBuf, WriteError>;
}

/// Port over the external, process-wide versioning tool.
///
/// The tool is not reentrant: concurrent invocations can corrupt its
/// index/lock state. Implementations assume they are never invoked
/// concurrently with themselves; the commit queue enforces that.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Stages the given path for the next commit.
    async fn stage(&self, path: &Path) -> Result<(), CommitError>;

    /// Creates one commit with the given single-line message and returns
    /// its identifier.
    async fn commit(&self, message: &str) -> Result<CommitId, CommitError>;
}
