use std::path::{Path, PathBuf};

use async_trait::async_trait;
use issuetrail_application::{CommitError, CommitId, VersionControl};
use tokio::process::Command;
use tracing::debug;

/// Version-control adapter invoking the `git` binary.
///
/// Both operations run with the repository root as working directory
/// and stage paths relative to it. git's index lock makes the tool
/// process-wide and non-reentrant; the commit queue guarantees this
/// adapter is never invoked concurrently with itself.
#[derive(Debug, Clone)]
pub struct GitVersionControl {
    repo_root: PathBuf,
}

impl GitVersionControl {
    /// Creates an adapter over the repository at `repo_root`.
    #[must_use]
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    async fn run_git(&self, args: &[&str]) -> Result<std::process::Output, std::io::Error> {
        debug!(args = ?args, "invoking git");
        // Output is matched against git's English messages, so pin the
        // locale regardless of the host environment.
        Command::new("git")
            .args(args)
            .env("LC_ALL", "C")
            .current_dir(&self.repo_root)
            .output()
            .await
    }
}

#[async_trait]
impl VersionControl for GitVersionControl {
    async fn stage(&self, path: &Path) -> Result<(), CommitError> {
        let relative = path.strip_prefix(&self.repo_root).unwrap_or(path);
        let Some(relative) = relative.to_str() else {
            return Err(CommitError::StageFailed {
                path: path.to_path_buf(),
                detail: "path is not valid UTF-8".to_owned(),
            });
        };

        let output = self
            .run_git(&["add", relative])
            .await
            .map_err(|error| CommitError::StageFailed {
                path: path.to_path_buf(),
                detail: error.to_string(),
            })?;

        if !output.status.success() {
            return Err(CommitError::StageFailed {
                path: path.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitId, CommitError> {
        let output = self
            .run_git(&["commit", "-m", message])
            .await
            .map_err(|error| CommitError::Tool(error.to_string()))?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stdout.contains("nothing to commit")
                || stderr.contains("nothing to commit")
                || stdout.contains("nothing added to commit")
            {
                return Err(CommitError::NothingToCommit);
            }

            return Err(CommitError::Tool(format!(
                "git commit failed: {}",
                if stderr.trim().is_empty() {
                    stdout.trim()
                } else {
                    stderr.trim()
                }
            )));
        }

        let head = self
            .run_git(&["rev-parse", "HEAD"])
            .await
            .map_err(|error| CommitError::Tool(error.to_string()))?;
        if !head.status.success() {
            return Err(CommitError::Tool(format!(
                "git rev-parse failed: {}",
                String::from_utf8_lossy(&head.stderr).trim()
            )));
        }

        Ok(CommitId::new(
            String::from_utf8_lossy(&head.stdout).trim().to_owned(),
        ))
    }
}
