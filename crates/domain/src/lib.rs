//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod clock;
mod issue;
mod mutation;

pub use audit::AuditRecord;
pub use clock::LogicalClock;
pub use issue::{Comment, Issue, IssueStatus, IssueUpdate, NewComment, NewIssue};
pub use mutation::{MutationChange, MutationEvent, MutationKind};
