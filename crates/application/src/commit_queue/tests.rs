use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};

use issuetrail_domain::AuditRecord;

use crate::audit_ports::{AuditLogWriter, CommitError, CommitId, VersionControl, WriteError};

use super::{CommitQueue, CommitTask};

type EventLog = Arc<Mutex<Vec<String>>>;

/// Writer fake that records write begin/end events and can delay or
/// fail specific entries.
#[derive(Default)]
struct RecordingWriter {
    events: EventLog,
    delays: HashMap<String, Duration>,
    failing_entries: Vec<String>,
    entries: Mutex<HashMap<String, Value>>,
}

impl RecordingWriter {
    fn new(events: EventLog) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    fn with_delay(mut self, entry_name: &str, delay: Duration) -> Self {
        self.delays.insert(entry_name.to_owned(), delay);
        self
    }

    fn failing_on(mut self, entry_name: &str) -> Self {
        self.failing_entries.push(entry_name.to_owned());
        self
    }

    async fn written_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl AuditLogWriter for RecordingWriter {
    async fn write(&self, entry_name: &str, body: &Value) -> Result<PathBuf, WriteError> {
        self.events.lock().await.push(format!("write:begin:{entry_name}"));

        if let Some(delay) = self.delays.get(entry_name) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing_entries.iter().any(|name| name == entry_name) {
            self.events.lock().await.push(format!("write:fail:{entry_name}"));
            return Err(WriteError::Io {
                entry_name: entry_name.to_owned(),
                source: std::io::Error::other("disk full"),
            });
        }

        let mut entries = self.entries.lock().await;
        if entries.contains_key(entry_name) {
            return Err(WriteError::AlreadyExists(entry_name.to_owned()));
        }
        entries.insert(entry_name.to_owned(), body.clone());
        drop(entries);

        self.events.lock().await.push(format!("write:end:{entry_name}"));
        Ok(PathBuf::from(format!("/audit/{entry_name}")))
    }
}

/// Version-control fake that records stage/commit calls.
struct RecordingVersionControl {
    events: EventLog,
    nothing_to_commit_messages: Vec<String>,
}

impl RecordingVersionControl {
    fn new(events: EventLog) -> Self {
        Self {
            events,
            nothing_to_commit_messages: Vec::new(),
        }
    }

    fn nothing_to_commit_for(mut self, message: &str) -> Self {
        self.nothing_to_commit_messages.push(message.to_owned());
        self
    }
}

#[async_trait]
impl VersionControl for RecordingVersionControl {
    async fn stage(&self, path: &Path) -> Result<(), CommitError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.events.lock().await.push(format!("stage:{name}"));
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitId, CommitError> {
        let mut events = self.events.lock().await;
        events.push(format!("commit:{message}"));
        let sequence = events.len();
        drop(events);

        if self
            .nothing_to_commit_messages
            .iter()
            .any(|skipped| skipped == message)
        {
            return Err(CommitError::NothingToCommit);
        }

        Ok(CommitId::new(format!("sha-{sequence}")))
    }
}

fn task(entry_name: &str) -> CommitTask {
    CommitTask {
        record: AuditRecord {
            entry_name: entry_name.to_owned(),
            body: json!({ "action": "create" }),
            message: format!("commit {entry_name}"),
        },
    }
}

fn successful_task_events(entry_name: &str) -> [String; 4] {
    [
        format!("write:begin:{entry_name}"),
        format!("write:end:{entry_name}"),
        format!("stage:{entry_name}"),
        format!("commit:commit {entry_name}"),
    ]
}

#[tokio::test]
async fn tasks_complete_in_enqueue_order_not_latency_order() {
    let events: EventLog = Arc::default();
    // The first task is the slowest; completion order must still be
    // enqueue order.
    let writer = Arc::new(
        RecordingWriter::new(Arc::clone(&events))
            .with_delay("a", Duration::from_millis(40))
            .with_delay("b", Duration::from_millis(30))
            .with_delay("c", Duration::from_millis(20))
            .with_delay("d", Duration::from_millis(10)),
    );
    let version_control = Arc::new(RecordingVersionControl::new(Arc::clone(&events)));
    let queue = CommitQueue::spawn(writer, version_control);

    for name in ["a", "b", "c", "d"] {
        queue.enqueue(task(name));
    }
    queue.wait_until_idle().await;

    let mut expected = Vec::new();
    for name in ["a", "b", "c", "d"] {
        expected.extend(successful_task_events(name));
    }
    assert_eq!(*events.lock().await, expected);
}

#[tokio::test]
async fn concurrently_enqueued_tasks_never_overlap() {
    let events: EventLog = Arc::default();
    let mut writer = RecordingWriter::new(Arc::clone(&events));
    for index in 0..8 {
        writer = writer.with_delay(&format!("entry-{index}"), Duration::from_millis(5));
    }
    let writer = Arc::new(writer);
    let version_control = Arc::new(RecordingVersionControl::new(Arc::clone(&events)));
    let queue = CommitQueue::spawn(writer, version_control);

    let mut producers = Vec::new();
    for index in 0..8 {
        let queue = Arc::clone(&queue);
        producers.push(tokio::spawn(async move {
            queue.enqueue(task(&format!("entry-{index}")));
        }));
    }
    for producer in producers {
        assert!(producer.await.is_ok());
    }
    queue.wait_until_idle().await;

    // With a single worker every task's four events form one contiguous
    // block; any interleaving means two tasks executed at once.
    let events = events.lock().await;
    assert_eq!(events.len(), 8 * 4);
    for block in events.chunks(4) {
        let Some(name) = block[0].strip_prefix("write:begin:") else {
            panic!("block does not start with a write: {block:?}");
        };
        assert_eq!(block, successful_task_events(name));
    }
}

#[tokio::test]
async fn tasks_enqueued_after_drain_run_on_the_same_single_worker() {
    let events: EventLog = Arc::default();
    let writer = Arc::new(RecordingWriter::new(Arc::clone(&events)));
    let version_control = Arc::new(RecordingVersionControl::new(Arc::clone(&events)));
    let queue = CommitQueue::spawn(writer, version_control);

    // First batch, drain to idle, then a second batch: the same worker
    // must pick the late tasks up and serialize them too.
    for name in ["a", "b"] {
        queue.enqueue(task(name));
    }
    queue.wait_until_idle().await;
    assert_eq!(queue.pending(), 0);

    for name in ["c", "d"] {
        queue.enqueue(task(name));
    }
    queue.wait_until_idle().await;
    assert_eq!(queue.pending(), 0);

    let mut expected = Vec::new();
    for name in ["a", "b", "c", "d"] {
        expected.extend(successful_task_events(name));
    }
    assert_eq!(*events.lock().await, expected);
}

#[tokio::test]
async fn failed_task_does_not_block_later_tasks() {
    let events: EventLog = Arc::default();
    let writer = Arc::new(RecordingWriter::new(Arc::clone(&events)).failing_on("t1"));
    let version_control = Arc::new(RecordingVersionControl::new(Arc::clone(&events)));
    let (failure_sender, mut failures) = mpsc::unbounded_channel();
    let queue = CommitQueue::spawn_with_observer(
        Arc::clone(&writer) as Arc<dyn AuditLogWriter>,
        version_control,
        Some(failure_sender),
    );

    for name in ["t1", "t2", "t3"] {
        queue.enqueue(task(name));
    }
    queue.wait_until_idle().await;

    assert_eq!(queue.pending(), 0);
    assert_eq!(writer.written_entries().await, vec!["t2", "t3"]);

    let failure = failures.try_recv();
    assert!(failure.is_ok());
    let failure = failure.unwrap_or_else(|_| unreachable!());
    assert_eq!(failure.entry_name, "t1");
    assert_eq!(failure.message, "commit t1");
    assert!(failure.error.contains("disk full"));
    assert!(failures.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_entry_name_is_reported_not_overwritten() {
    let events: EventLog = Arc::default();
    let writer = Arc::new(RecordingWriter::new(Arc::clone(&events)));
    let version_control = Arc::new(RecordingVersionControl::new(Arc::clone(&events)));
    let (failure_sender, mut failures) = mpsc::unbounded_channel();
    let queue = CommitQueue::spawn_with_observer(
        Arc::clone(&writer) as Arc<dyn AuditLogWriter>,
        version_control,
        Some(failure_sender),
    );

    queue.enqueue(task("same-name"));
    queue.enqueue(task("same-name"));
    queue.wait_until_idle().await;

    assert_eq!(writer.written_entries().await, vec!["same-name"]);
    let failure = failures.try_recv();
    assert!(failure.is_ok());
    assert!(
        failure
            .unwrap_or_else(|_| unreachable!())
            .error
            .contains("already exists")
    );
}

#[tokio::test]
async fn nothing_to_commit_is_logged_not_reported() {
    let events: EventLog = Arc::default();
    let writer = Arc::new(RecordingWriter::new(Arc::clone(&events)));
    let version_control = Arc::new(
        RecordingVersionControl::new(Arc::clone(&events)).nothing_to_commit_for("commit noop"),
    );
    let (failure_sender, mut failures) = mpsc::unbounded_channel();
    let queue = CommitQueue::spawn_with_observer(
        Arc::clone(&writer) as Arc<dyn AuditLogWriter>,
        version_control,
        Some(failure_sender),
    );

    queue.enqueue(task("noop"));
    queue.enqueue(task("after"));
    queue.wait_until_idle().await;

    // The no-op commit is non-fatal and does not count as a failure;
    // the following task still commits normally.
    assert!(failures.try_recv().is_err());
    assert_eq!(writer.written_entries().await, vec!["after", "noop"]);
}

#[tokio::test]
async fn wait_until_idle_returns_immediately_when_empty() {
    let events: EventLog = Arc::default();
    let writer = Arc::new(RecordingWriter::new(Arc::clone(&events)));
    let version_control = Arc::new(RecordingVersionControl::new(Arc::clone(&events)));
    let queue = CommitQueue::spawn(writer, version_control);

    let waited =
        tokio::time::timeout(Duration::from_millis(50), queue.wait_until_idle()).await;
    assert!(waited.is_ok());
}
