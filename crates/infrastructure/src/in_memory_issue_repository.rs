use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use issuetrail_application::{IssueChange, IssueRepository};
use issuetrail_core::{AppError, AppResult, CommentId, IssueId};
use issuetrail_domain::{Comment, Issue, IssueStatus, IssueUpdate, NewComment, NewIssue};
use tokio::sync::RwLock;

#[derive(Debug)]
struct RepositoryState {
    next_issue_number: u64,
    issues: HashMap<IssueId, Issue>,
    comments: HashMap<IssueId, Vec<Comment>>,
}

/// In-memory issue repository implementation.
///
/// One lock guards the whole state, so every mutation hands back a
/// point-in-time consistent snapshot.
#[derive(Debug)]
pub struct InMemoryIssueRepository {
    state: RwLock<RepositoryState>,
}

impl InMemoryIssueRepository {
    /// Creates an empty repository numbering issues from 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an empty repository numbering issues from the given
    /// first issue number.
    #[must_use]
    pub fn starting_at(first_issue_number: u64) -> Self {
        Self {
            state: RwLock::new(RepositoryState {
                next_issue_number: first_issue_number,
                issues: HashMap::new(),
                comments: HashMap::new(),
            }),
        }
    }

    /// Lists the comments of one issue in insertion order.
    pub async fn comments(&self, issue_id: IssueId) -> Vec<Comment> {
        self.state
            .read()
            .await
            .comments
            .get(&issue_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryIssueRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueRepository for InMemoryIssueRepository {
    async fn create(&self, input: NewIssue) -> AppResult<Issue> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let issue = Issue {
            id: IssueId::new(state.next_issue_number),
            title: input.title,
            description: input.description,
            status: IssueStatus::Open,
            created_at: now,
            updated_at: now,
        };

        state.next_issue_number += 1;
        state.issues.insert(issue.id, issue.clone());

        Ok(issue)
    }

    async fn update(&self, issue_id: IssueId, update: IssueUpdate) -> AppResult<IssueChange> {
        let mut state = self.state.write().await;
        let Some(issue) = state.issues.get_mut(&issue_id) else {
            return Err(AppError::NotFound(format!("issue #{issue_id}")));
        };

        let before = issue.clone();
        if let Some(title) = update.title {
            issue.title = title;
        }
        if let Some(description) = update.description {
            issue.description = Some(description);
        }
        if let Some(status) = update.status {
            issue.status = status;
        }
        issue.updated_at = Utc::now();

        Ok(IssueChange {
            before,
            after: issue.clone(),
        })
    }

    async fn add_comment(
        &self,
        issue_id: IssueId,
        comment: NewComment,
    ) -> AppResult<(Issue, Comment)> {
        let mut state = self.state.write().await;
        let Some(issue) = state.issues.get_mut(&issue_id) else {
            return Err(AppError::NotFound(format!("issue #{issue_id}")));
        };

        issue.updated_at = Utc::now();
        let snapshot = issue.clone();

        let comment = Comment {
            id: CommentId::new(),
            issue_id,
            author: comment.author,
            body: comment.body,
            created_at: snapshot.updated_at,
        };
        state
            .comments
            .entry(issue_id)
            .or_default()
            .push(comment.clone());

        Ok((snapshot, comment))
    }

    async fn find(&self, issue_id: IssueId) -> AppResult<Option<Issue>> {
        Ok(self.state.read().await.issues.get(&issue_id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Issue>> {
        let state = self.state.read().await;
        let mut issues: Vec<Issue> = state.issues.values().cloned().collect();
        issues.sort_by_key(|issue| issue.id);

        Ok(issues)
    }
}
