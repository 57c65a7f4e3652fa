use chrono::{DateTime, Utc};
use issuetrail_core::IssueId;

use crate::issue::{Comment, Issue};

/// Kind of state change recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// An issue was created.
    Create,
    /// An existing issue was updated.
    Update,
    /// A comment was added to an issue.
    Comment,
}

impl MutationKind {
    /// Returns the stable action value used in entry names and record bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Comment => "comment",
        }
    }
}

/// Kind-specific payload of a mutation, captured from the authoritative
/// post-mutation snapshot the issue store returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationChange {
    /// A new issue, as stored.
    Created {
        /// The created issue.
        issue: Issue,
    },
    /// An issue update with its before/after snapshots.
    Updated {
        /// Snapshot before the update was applied.
        before: Issue,
        /// Snapshot after the update was applied.
        after: Issue,
    },
    /// A new comment together with its issue.
    Commented {
        /// The commented issue.
        issue: Issue,
        /// The added comment.
        comment: Comment,
    },
}

/// One state change needing an audit trail entry.
///
/// Built by the orchestrator at the moment a mutation is accepted and
/// immutable afterwards; owned by its commit task until executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    /// Logical timestamp, strictly monotonic per process. Drives the
    /// audit entry name and thereby its ordering key.
    pub occurred_at: DateTime<Utc>,
    /// Kind-specific payload.
    pub change: MutationChange,
}

impl MutationEvent {
    /// Creates an event from a logical timestamp and a change payload.
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>, change: MutationChange) -> Self {
        Self {
            occurred_at,
            change,
        }
    }

    /// Returns the mutation kind.
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self.change {
            MutationChange::Created { .. } => MutationKind::Create,
            MutationChange::Updated { .. } => MutationKind::Update,
            MutationChange::Commented { .. } => MutationKind::Comment,
        }
    }

    /// Returns the affected issue identifier.
    #[must_use]
    pub fn issue_id(&self) -> IssueId {
        match &self.change {
            MutationChange::Created { issue }
            | MutationChange::Commented { issue, .. } => issue.id,
            MutationChange::Updated { after, .. } => after.id,
        }
    }
}
