use std::sync::Arc;

use issuetrail_core::{AppResult, IssueId};
use issuetrail_domain::{
    AuditRecord, Comment, Issue, IssueUpdate, LogicalClock, MutationChange, MutationEvent,
    NewComment, NewIssue,
};
use serde_json::json;
use tracing::warn;

use crate::commit_queue::{CommitQueue, CommitTask};
use crate::issue_ports::{ChangeBroadcaster, ChangeNotification, IssueRepository};


/// Mutation pipeline orchestrator.
///
/// For every accepted mutation, in fixed order: apply it to the issue
/// store and take the authoritative post-mutation snapshot, broadcast
/// that snapshot to observers, then build the mutation event from the
/// same snapshot and enqueue its commit task. The caller's response
/// never waits for the queued work; the audit trail is eventually
/// consistent with the store.
pub struct TrackerService {
    repository: Arc<dyn IssueRepository>,
    broadcaster: Arc<dyn ChangeBroadcaster>,
    queue: Arc<CommitQueue>,
    clock: LogicalClock,
}

impl TrackerService {
    /// Creates the service over its collaborator ports.
    #[must_use]
    pub fn new(
        repository: Arc<dyn IssueRepository>,
        broadcaster: Arc<dyn ChangeBroadcaster>,
        queue: Arc<CommitQueue>,
    ) -> Self {
        Self {
            repository,
            broadcaster,
            queue,
            clock: LogicalClock::new(),
        }
    }

    /// Creates an issue, broadcasts it, and queues its audit entry.
    pub async fn create_issue(&self, input: NewIssue) -> AppResult<Issue> {
        let issue = self.repository.create(input).await?;

        self.broadcaster
            .publish(ChangeNotification {
                event: "issue.created".to_owned(),
                payload: json!({ "issue": issue }),
            })
            .await;

        self.enqueue_audit(MutationChange::Created {
            issue: issue.clone(),
        });

        Ok(issue)
    }

    /// Updates an issue, broadcasts the new snapshot, and queues its
    /// audit entry.
    pub async fn update_issue(&self, issue_id: IssueId, update: IssueUpdate) -> AppResult<Issue> {
        update.validate()?;
        let change = self.repository.update(issue_id, update).await?;

        self.broadcaster
            .publish(ChangeNotification {
                event: "issue.updated".to_owned(),
                payload: json!({
                    "issue": change.after,
                    "previous_status": change.before.status,
                }),
            })
            .await;

        let after = change.after.clone();
        self.enqueue_audit(MutationChange::Updated {
            before: change.before,
            after: change.after,
        });

        Ok(after)
    }

    /// Adds a comment, broadcasts it, and queues its audit entry.
    pub async fn add_comment(
        &self,
        issue_id: IssueId,
        comment: NewComment,
    ) -> AppResult<Comment> {
        let (issue, comment) = self.repository.add_comment(issue_id, comment).await?;

        self.broadcaster
            .publish(ChangeNotification {
                event: "comment.added".to_owned(),
                payload: json!({ "issue": issue, "comment": comment }),
            })
            .await;

        self.enqueue_audit(MutationChange::Commented {
            issue,
            comment: comment.clone(),
        });

        Ok(comment)
    }

    /// Looks up one issue.
    pub async fn get_issue(&self, issue_id: IssueId) -> AppResult<Option<Issue>> {
        self.repository.find(issue_id).await
    }

    /// Lists all issues.
    pub async fn list_issues(&self) -> AppResult<Vec<Issue>> {
        self.repository.list().await
    }

    /// Builds and enqueues the audit task for one applied mutation.
    ///
    /// The mutation already succeeded, so a failure here is logged and
    /// swallowed instead of surfacing to the caller.
    fn enqueue_audit(&self, change: MutationChange) {
        let event = MutationEvent::new(self.clock.now(), change);

        match AuditRecord::from_event(&event) {
            Ok(record) => self.queue.enqueue(CommitTask { record }),
            Err(error) => warn!(
                issue = %event.issue_id(),
                kind = event.kind().as_str(),
                error = %error,
                "failed to build audit record; mutation will not be audited"
            ),
        }
    }
}
