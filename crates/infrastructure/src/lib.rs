//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod broadcast_notifier;
mod fs_audit_log_writer;
mod git_version_control;
mod in_memory_issue_repository;

pub use broadcast_notifier::BroadcastNotifier;
pub use fs_audit_log_writer::FsAuditLogWriter;
pub use git_version_control::GitVersionControl;
pub use in_memory_issue_repository::InMemoryIssueRepository;
