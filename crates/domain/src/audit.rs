use issuetrail_core::{AppError, AppResult};
use serde_json::{Value, json};

use crate::mutation::{MutationChange, MutationEvent};

/// Timestamp layout for entry names: ISO-8601 UTC with the colons and
/// dots removed, millisecond resolution.
const ENTRY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S%3fZ";

/// Audit-trail artifact derived from one mutation event: a unique entry
/// name, a JSON record body, and a one-line commit message.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    /// Unique log entry name, `{kind}-{issue}-{timestamp}.json`.
    pub entry_name: String,
    /// JSON record body, `{"action": <kind>, ...kind-specific fields}`.
    pub body: Value,
    /// One-line commit message summarizing the change.
    pub message: String,
}

impl AuditRecord {
    /// Builds the audit record for one mutation event.
    ///
    /// Pure transformation, no I/O. The entry name embeds the event's
    /// logical timestamp at millisecond resolution, so records built
    /// from a strictly monotonic clock never collide even for the same
    /// issue and kind within one second.
    pub fn from_event(event: &MutationEvent) -> AppResult<Self> {
        let kind = event.kind();
        let entry_name = format!(
            "{}-{}-{}.json",
            kind.as_str(),
            event.issue_id(),
            event.occurred_at.format(ENTRY_TIMESTAMP_FORMAT),
        );

        let body = match &event.change {
            MutationChange::Created { issue } => json!({
                "action": kind.as_str(),
                "issue": issue,
            }),
            MutationChange::Updated { before, after } => json!({
                "action": kind.as_str(),
                "issue": after,
                "previous_status": before.status,
            }),
            MutationChange::Commented { issue, comment } => json!({
                "action": kind.as_str(),
                "issue": issue,
                "comment": comment,
            }),
        };

        let raw_message = match &event.change {
            MutationChange::Created { issue } => {
                format!("Create issue #{}: {}", issue.id, issue.title)
            }
            MutationChange::Updated { before, after } => {
                if before.status == after.status {
                    format!("Update issue #{}", after.id)
                } else {
                    format!(
                        "Update issue #{} (status: {})",
                        after.id,
                        after.status.as_str()
                    )
                }
            }
            MutationChange::Commented { issue, .. } => {
                format!("Comment on issue #{}", issue.id)
            }
        };

        let message = single_line_message(&raw_message)?;

        Ok(Self {
            entry_name,
            body,
            message,
        })
    }
}

/// Collapses newlines and escapes double quotes so the message is safe
/// as a single-line commit message.
fn single_line_message(raw: &str) -> AppResult<String> {
    let message = raw
        .replace(['\r', '\n'], " ")
        .replace('"', "\\\"")
        .trim()
        .to_owned();

    if message.is_empty() {
        return Err(AppError::Validation(
            "mutation event produced an empty commit message".to_owned(),
        ));
    }

    Ok(message)
}
