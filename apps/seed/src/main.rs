//! Issuetrail dev seed runtime.
//!
//! Wires the full audit-commit pipeline against a real git repository
//! and drives a burst of concurrent seed mutations through it: create,
//! update, and comment per issue. Useful for demos and for eyeballing
//! the audit trail the pipeline produces.

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use issuetrail_application::{
    AuditLogWriter, ChangeBroadcaster, CommitQueue, IssueRepository, TrackerService,
    VersionControl,
};
use issuetrail_core::{AppError, AppResult};
use issuetrail_domain::{IssueStatus, IssueUpdate, NewComment, NewIssue};
use issuetrail_infrastructure::{
    BroadcastNotifier, FsAuditLogWriter, GitVersionControl, InMemoryIssueRepository,
};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct SeedConfig {
    repo_root: PathBuf,
    log_dir: PathBuf,
    issue_count: usize,
}

impl SeedConfig {
    fn load() -> AppResult<Self> {
        let repo_root = PathBuf::from(
            env::var("ISSUETRAIL_REPO_ROOT").unwrap_or_else(|_| ".".to_owned()),
        );
        let log_dir = env::var("ISSUETRAIL_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| repo_root.join("audit-log"));
        let issue_count = parse_env_usize("SEED_ISSUE_COUNT", 3)?;

        if issue_count == 0 {
            return Err(AppError::Validation(
                "SEED_ISSUE_COUNT must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            repo_root,
            log_dir,
            issue_count,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SeedConfig::load()?;
    info!(
        repo_root = %config.repo_root.display(),
        log_dir = %config.log_dir.display(),
        issue_count = config.issue_count,
        "issuetrail-seed started"
    );

    let repository = Arc::new(InMemoryIssueRepository::new());
    let notifier = Arc::new(BroadcastNotifier::new(64));
    let writer = Arc::new(FsAuditLogWriter::new(config.log_dir.clone()));
    let version_control = Arc::new(GitVersionControl::new(config.repo_root.clone()));
    let queue = CommitQueue::spawn(
        Arc::clone(&writer) as Arc<dyn AuditLogWriter>,
        Arc::clone(&version_control) as Arc<dyn VersionControl>,
    );
    let service = Arc::new(TrackerService::new(
        Arc::clone(&repository) as Arc<dyn IssueRepository>,
        Arc::clone(&notifier) as Arc<dyn ChangeBroadcaster>,
        Arc::clone(&queue),
    ));

    let mut observer = notifier.subscribe();
    let observer_task = tokio::spawn(async move {
        while let Ok(notification) = observer.recv().await {
            info!(event = %notification.event, "change broadcast received");
        }
    });

    let mut seeders = Vec::new();
    for index in 0..config.issue_count {
        let service = Arc::clone(&service);
        seeders.push(tokio::spawn(async move { seed_issue(&service, index).await }));
    }

    let mut failed = 0_usize;
    for seeder in seeders {
        match seeder.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                failed += 1;
                warn!(error = %error, "seed mutation failed");
            }
            Err(error) => {
                failed += 1;
                warn!(error = %error, "seed task panicked");
            }
        }
    }

    info!(pending = queue.pending(), "waiting for the commit queue to drain");
    queue.wait_until_idle().await;
    observer_task.abort();

    let issues = service.list_issues().await?;
    info!(
        issues = issues.len(),
        failed_seeders = failed,
        "seed run finished; audit trail is in the log directory and git history"
    );

    Ok(())
}

/// Runs one issue through the whole mutation surface: create, move to
/// in-progress, then comment.
async fn seed_issue(service: &TrackerService, index: usize) -> AppResult<()> {
    let issue = service
        .create_issue(NewIssue::new(
            format!("seeded issue {index}"),
            Some(format!("generated by issuetrail-seed run, slot {index}")),
        )?)
        .await?;

    service
        .update_issue(
            issue.id,
            IssueUpdate {
                status: Some(IssueStatus::InProgress),
                ..IssueUpdate::default()
            },
        )
        .await?;

    service
        .add_comment(issue.id, NewComment::new("seed-bot", "picked up for triage")?)
        .await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
