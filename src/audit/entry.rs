//! Audit entry data structure
//!
//! One immutable entry per logged action: which table, who did it, what the
//! records looked like before and (for updates) what was written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FieldValue, TaskType};

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier
    pub id: String,

    /// Table the action targeted
    pub table_name: String,

    /// Record state before the action; for creates, the created records; for
    /// reads, the read criteria
    pub prior_payload: FieldValue,

    /// Values written by an update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_payload: Option<FieldValue>,

    /// Kind of action performed
    pub action: TaskType,

    /// User the action ran on behalf of
    pub actor_id: String,

    /// When the action was logged (UTC)
    pub logged_at: DateTime<Utc>,

    /// Human-readable diff summary, for single-record updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    /// A fresh entry stamped with a new id and the current time
    pub fn new(
        action: TaskType,
        table_name: impl Into<String>,
        actor_id: impl Into<String>,
        prior_payload: FieldValue,
        new_payload: Option<FieldValue>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            table_name: table_name.into(),
            prior_payload,
            new_payload,
            action,
            actor_id: actor_id.into(),
            logged_at: Utc::now(),
            diff_summary: None,
        }
    }

    pub fn with_diff(mut self, diff_summary: Option<String>) -> Self {
        self.diff_summary = diff_summary;
        self
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} by {}",
            self.logged_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.action,
            self.table_name,
            self.actor_id
        );

        match &self.prior_payload {
            FieldValue::List(items) => output.push_str(&format!(" ({} records)", items.len())),
            FieldValue::Record(_) => output.push_str(" (1 record)"),
            _ => {}
        }

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn test_new_entry() {
        let prior = FieldValue::from(vec![record! {"id" => "g1", "name" => "services"}]);
        let entry = AuditEntry::new(TaskType::Delete, "groups", "u-1", prior, None);

        assert_eq!(entry.action, TaskType::Delete);
        assert_eq!(entry.table_name, "groups");
        assert!(entry.new_payload.is_none());
        assert!(Uuid::parse_str(&entry.id).is_ok());
    }

    #[test]
    fn test_serialization() {
        let entry = AuditEntry::new(
            TaskType::Update,
            "groups",
            "u-1",
            FieldValue::from(vec![record! {"id" => "g1"}]),
            Some(FieldValue::from(record! {"name" => "new"})),
        )
        .with_diff(Some("name: \"old\" -> \"new\"".into()));

        let json = serde_json::to_string(&entry).unwrap();
        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_human_readable_format() {
        let entry = AuditEntry::new(
            TaskType::Create,
            "groups",
            "u-1",
            FieldValue::from(vec![record! {"id" => "a"}, record! {"id" => "b"}]),
            None,
        );

        let formatted = entry.format_human_readable();
        assert!(formatted.contains("CREATE"));
        assert!(formatted.contains("groups"));
        assert!(formatted.contains("by u-1"));
        assert!(formatted.contains("(2 records)"));
    }
}
