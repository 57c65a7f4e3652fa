use async_trait::async_trait;
use issuetrail_core::{AppResult, IssueId};
use issuetrail_domain::{Comment, Issue, IssueUpdate, NewComment, NewIssue};
use serde_json::Value;

/// Before/after snapshot pair returned by an issue update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueChange {
    /// Snapshot before the update was applied.
    pub before: Issue,
    /// Snapshot after the update was applied.
    pub after: Issue,
}

/// Port over the external issue store.
///
/// Every mutation returns the authoritative post-mutation snapshot
/// observed at the moment the mutation was applied; the orchestrator
/// feeds that snapshot, never a stale read, into the audit record.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Creates an issue and returns it as stored.
    async fn create(&self, input: NewIssue) -> AppResult<Issue>;

    /// Applies a partial update and returns the before/after snapshots.
    async fn update(&self, issue_id: IssueId, update: IssueUpdate) -> AppResult<IssueChange>;

    /// Adds a comment and returns the refreshed issue with the comment.
    async fn add_comment(
        &self,
        issue_id: IssueId,
        comment: NewComment,
    ) -> AppResult<(Issue, Comment)>;

    /// Looks up one issue.
    async fn find(&self, issue_id: IssueId) -> AppResult<Option<Issue>>;

    /// Lists all issues ordered by issue number.
    async fn list(&self) -> AppResult<Vec<Issue>>;
}

/// One fire-and-forget notification to connected observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    /// Event name, e.g. `issue.created`.
    pub event: String,
    /// JSON payload describing the change.
    pub payload: Value,
}

/// Port for broadcasting change notifications to subscribers.
///
/// No delivery or acknowledgement guarantee is consumed; publishing to
/// zero subscribers is not an error.
#[async_trait]
pub trait ChangeBroadcaster: Send + Sync {
    /// Publishes one notification.
    async fn publish(&self, notification: ChangeNotification);
}
