use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use issuetrail_application::{AuditLogWriter, WriteError};
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Audit log writer persisting entries as JSON files in one fixed
/// directory.
///
/// The directory is created on first use; entries are opened with
/// `create_new`, so a name collision surfaces as
/// [`WriteError::AlreadyExists`] instead of truncating a prior entry.
#[derive(Debug, Clone)]
pub struct FsAuditLogWriter {
    log_dir: PathBuf,
}

impl FsAuditLogWriter {
    /// Creates a writer rooted at the given log directory.
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Returns the log directory path.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        self.log_dir.as_path()
    }
}

#[async_trait]
impl AuditLogWriter for FsAuditLogWriter {
    async fn write(&self, entry_name: &str, body: &Value) -> Result<PathBuf, WriteError> {
        tokio::fs::create_dir_all(&self.log_dir)
            .await
            .map_err(|source| WriteError::Io {
                entry_name: entry_name.to_owned(),
                source,
            })?;

        let mut serialized =
            serde_json::to_vec_pretty(body).map_err(|error| WriteError::Io {
                entry_name: entry_name.to_owned(),
                source: std::io::Error::other(error),
            })?;
        serialized.push(b'\n');

        let path = self.log_dir.join(entry_name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| {
                if source.kind() == ErrorKind::AlreadyExists {
                    WriteError::AlreadyExists(entry_name.to_owned())
                } else {
                    WriteError::Io {
                        entry_name: entry_name.to_owned(),
                        source,
                    }
                }
            })?;

        file.write_all(&serialized)
            .await
            .map_err(|source| WriteError::Io {
                entry_name: entry_name.to_owned(),
                source,
            })?;
        file.sync_all().await.map_err(|source| WriteError::Io {
            entry_name: entry_name.to_owned(),
            source,
        })?;

        debug!(entry = entry_name, path = %path.display(), "audit entry written");
        Ok(path)
    }
}
