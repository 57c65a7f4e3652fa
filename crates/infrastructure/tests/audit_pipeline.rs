//! End-to-end pipeline test over the real adapters: in-memory issue
//! store, broadcast notifier, filesystem log writer, and git committer.

use std::path::Path;
use std::sync::Arc;

use issuetrail_application::{
    AuditLogWriter, ChangeBroadcaster, CommitQueue, IssueRepository, TrackerService,
    VersionControl,
};
use issuetrail_core::IssueId;
use issuetrail_domain::{IssueStatus, IssueUpdate, NewComment, NewIssue};
use issuetrail_infrastructure::{
    BroadcastNotifier, FsAuditLogWriter, GitVersionControl, InMemoryIssueRepository,
};
use tokio::process::Command;

async fn init_repo(root: &Path) {
    for args in [
        vec!["init", "--initial-branch=main"],
        vec!["config", "user.email", "audit@example.test"],
        vec!["config", "user.name", "Audit Test"],
    ] {
        let output = Command::new("git")
            .args(&args)
            .current_dir(root)
            .output()
            .await;
        assert!(output.is_ok());
        assert!(output.unwrap_or_else(|_| unreachable!()).status.success());
    }
}

async fn commit_subjects(root: &Path) -> Vec<String> {
    let output = Command::new("git")
        .args(["log", "--format=%s", "--reverse"])
        .current_dir(root)
        .output()
        .await;
    assert!(output.is_ok());
    let output = output.unwrap_or_else(|_| unreachable!());
    assert!(output.status.success());

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[tokio::test]
async fn every_mutation_lands_as_one_entry_and_one_commit_in_order() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    init_repo(root.path()).await;
    let log_dir = root.path().join("audit-log");

    let repository = Arc::new(InMemoryIssueRepository::starting_at(42));
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let mut observer = notifier.subscribe();
    let writer = Arc::new(FsAuditLogWriter::new(&log_dir));
    let version_control = Arc::new(GitVersionControl::new(root.path()));
    let queue = CommitQueue::spawn(
        Arc::clone(&writer) as Arc<dyn AuditLogWriter>,
        Arc::clone(&version_control) as Arc<dyn VersionControl>,
    );
    let service = TrackerService::new(
        Arc::clone(&repository) as Arc<dyn IssueRepository>,
        Arc::clone(&notifier) as Arc<dyn ChangeBroadcaster>,
        Arc::clone(&queue),
    );

    let created = service
        .create_issue(NewIssue::new("x", None).unwrap_or_else(|_| unreachable!()))
        .await;
    assert!(created.is_ok());
    let issue_id = created.unwrap_or_else(|_| unreachable!()).id;
    assert_eq!(issue_id, IssueId::new(42));

    let updated = service
        .update_issue(
            issue_id,
            IssueUpdate {
                status: Some(IssueStatus::InProgress),
                ..IssueUpdate::default()
            },
        )
        .await;
    assert!(updated.is_ok());

    let commented = service
        .add_comment(
            issue_id,
            NewComment::new("ada", "same here").unwrap_or_else(|_| unreachable!()),
        )
        .await;
    assert!(commented.is_ok());

    queue.wait_until_idle().await;

    // One log entry per mutation, named by kind and issue number.
    let mut entry_names: Vec<String> = std::fs::read_dir(&log_dir)
        .map(|reader| {
            reader
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    entry_names.sort();
    assert_eq!(entry_names.len(), 3);
    assert!(entry_names[0].starts_with("comment-42-"));
    assert!(entry_names[1].starts_with("create-42-"));
    assert!(entry_names[2].starts_with("update-42-"));

    // One commit per mutation, in enqueue order.
    assert_eq!(
        commit_subjects(root.path()).await,
        vec![
            "Create issue #42: x".to_owned(),
            "Update issue #42 (status: in_progress)".to_owned(),
            "Comment on issue #42".to_owned(),
        ],
    );

    // Observers saw each change as it was applied.
    let mut events = Vec::new();
    for _ in 0..3 {
        let received = observer.recv().await;
        assert!(received.is_ok());
        events.push(received.unwrap_or_else(|_| unreachable!()).event);
    }
    assert_eq!(events, vec!["issue.created", "issue.updated", "comment.added"]);
}
