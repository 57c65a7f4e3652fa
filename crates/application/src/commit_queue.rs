use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use issuetrail_domain::AuditRecord;
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tracing::{info, warn};

use crate::audit_ports::{AuditLogWriter, CommitError, CommitId, VersionControl, WriteError};

#[cfg(test)]
mod tests;

/// One queued unit of audit work: write the entry, stage it, commit it.
///
/// Exclusively owned by the queue between enqueue and execution; never
/// shared, never mutated once created.
#[derive(Debug)]
pub struct CommitTask {
    /// The audit record to persist and version-commit.
    pub record: AuditRecord,
}

/// Details of one failed commit task, delivered to the failure observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFailure {
    /// Entry name of the failed task.
    pub entry_name: String,
    /// Commit message of the failed task.
    pub message: String,
    /// Rendered error text.
    pub error: String,
}

#[derive(Debug, Error)]
enum TaskError {
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Single-consumer, multi-producer FIFO queue executing commit tasks
/// strictly one at a time, in enqueue order.
///
/// The queue exists because the versioning tool is process-wide and not
/// reentrant: exactly one worker task, spawned at construction, drains
/// the channel, so no two tasks' write/stage/commit sequences ever
/// overlap in time. Producers never block; a task enqueued while the
/// worker is busy simply waits its turn.
///
/// The queue is unbounded and offers no retry and no dead-lettering: a
/// failed task is logged, reported to the optional failure observer,
/// and dropped, and the worker moves on to the next task.
pub struct CommitQueue {
    sender: mpsc::UnboundedSender<CommitTask>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl CommitQueue {
    /// Spawns the queue and its single worker task.
    #[must_use]
    pub fn spawn(
        writer: Arc<dyn AuditLogWriter>,
        version_control: Arc<dyn VersionControl>,
    ) -> Arc<Self> {
        Self::spawn_with_observer(writer, version_control, None)
    }

    /// Spawns the queue with a failure observer.
    ///
    /// The observer receives one [`CommitFailure`] per failed task. It
    /// exists for tests and operators; failures are still swallowed and
    /// never reach the mutating caller.
    #[must_use]
    pub fn spawn_with_observer(
        writer: Arc<dyn AuditLogWriter>,
        version_control: Arc<dyn VersionControl>,
        failure_observer: Option<mpsc::UnboundedSender<CommitFailure>>,
    ) -> Arc<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<CommitTask>();
        let pending = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new(Notify::new());

        let worker_pending = Arc::clone(&pending);
        let worker_drained = Arc::clone(&drained);
        tokio::spawn(async move {
            // The one worker loop for the queue's lifetime. A task runs
            // to completion before the next is taken off the channel.
            while let Some(task) = receiver.recv().await {
                execute_task(
                    writer.as_ref(),
                    version_control.as_ref(),
                    failure_observer.as_ref(),
                    task,
                )
                .await;

                if worker_pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                    worker_drained.notify_waiters();
                }
            }
        });

        Arc::new(Self {
            sender,
            pending,
            drained,
        })
    }

    /// Appends a task to the tail of the queue and returns immediately.
    ///
    /// Never blocks; safe to call from any number of concurrent
    /// producers. Enqueue order, observed at the channel send, is the
    /// execution order.
    pub fn enqueue(&self, task: CommitTask) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(rejected) = self.sender.send(task) {
            // Only possible when the runtime is shutting down and the
            // worker is gone; the entry is lost like any other failure.
            self.pending.fetch_sub(1, Ordering::AcqRel);
            warn!(
                entry = %rejected.0.record.entry_name,
                "commit queue worker is gone; dropping audit task"
            );
        }
    }

    /// Returns the number of tasks enqueued but not yet completed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits until every task enqueued so far has been attempted.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// Runs one task to completion and absorbs its outcome.
///
/// Errors never escape this boundary: the mutating caller received its
/// response before the task ran, and one task's failure must not block
/// later tasks.
async fn execute_task(
    writer: &dyn AuditLogWriter,
    version_control: &dyn VersionControl,
    failure_observer: Option<&mpsc::UnboundedSender<CommitFailure>>,
    task: CommitTask,
) {
    let record = task.record;

    match persist_record(writer, version_control, &record).await {
        Ok(commit_id) => {
            info!(
                entry = %record.entry_name,
                commit = %commit_id,
                "audit entry committed"
            );
        }
        Err(TaskError::Commit(CommitError::NothingToCommit)) => {
            info!(
                entry = %record.entry_name,
                "audit entry produced nothing to commit"
            );
        }
        Err(error) => {
            warn!(
                entry = %record.entry_name,
                message = %record.message,
                error = %error,
                "audit commit task failed"
            );

            if let Some(observer) = failure_observer {
                let _ = observer.send(CommitFailure {
                    entry_name: record.entry_name.clone(),
                    message: record.message.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
}

async fn persist_record(
    writer: &dyn AuditLogWriter,
    version_control: &dyn VersionControl,
    record: &AuditRecord,
) -> Result<CommitId, TaskError> {
    let path = writer.write(&record.entry_name, &record.body).await?;
    version_control.stage(&path).await?;
    let commit_id = version_control.commit(&record.message).await?;

    Ok(commit_id)
}
