use chrono::{DateTime, Utc};
use issuetrail_core::{AppError, AppResult, CommentId, IssueId, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Newly reported, not yet picked up.
    Open,
    /// Actively being worked on.
    InProgress,
    /// Resolved or discarded.
    Closed,
}

impl IssueStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

/// One tracked issue as persisted by the issue store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Sequential issue number.
    pub id: IssueId,
    /// Short summary line.
    pub title: NonEmptyString,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Current lifecycle state.
    pub status: IssueStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// One comment attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Issue the comment belongs to.
    pub issue_id: IssueId,
    /// Display name of the comment author.
    pub author: NonEmptyString,
    /// Comment text.
    pub body: NonEmptyString,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    /// Short summary line.
    pub title: NonEmptyString,
    /// Optional long-form description.
    pub description: Option<String>,
}

impl NewIssue {
    /// Creates a validated issue input.
    pub fn new(title: impl Into<String>, description: Option<String>) -> AppResult<Self> {
        Ok(Self {
            title: NonEmptyString::new(title)?,
            description,
        })
    }
}

/// Validated partial update for an issue. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    /// Replacement title, when present.
    pub title: Option<NonEmptyString>,
    /// Replacement description, when present.
    pub description: Option<String>,
    /// Replacement status, when present.
    pub status: Option<IssueStatus>,
}

impl IssueUpdate {
    /// Validates that the update changes at least one field.
    pub fn validate(&self) -> AppResult<()> {
        if self.title.is_none() && self.description.is_none() && self.status.is_none() {
            return Err(AppError::Validation(
                "issue update must change at least one field".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Validated input for adding a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Display name of the comment author.
    pub author: NonEmptyString,
    /// Comment text.
    pub body: NonEmptyString,
}

impl NewComment {
    /// Creates a validated comment input.
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            author: NonEmptyString::new(author)?,
            body: NonEmptyString::new(body)?,
        })
    }
}
