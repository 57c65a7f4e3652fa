//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod commit_queue;
mod issue_ports;
mod tracker_service;

pub use audit_ports::{AuditLogWriter, CommitError, CommitId, VersionControl, WriteError};
pub use commit_queue::{CommitFailure, CommitQueue, CommitTask};
pub use issue_ports::{ChangeBroadcaster, ChangeNotification, IssueChange, IssueRepository};
pub use tracker_service::TrackerService;
