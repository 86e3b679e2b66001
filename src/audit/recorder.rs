//! Audit recorder
//!
//! Validates and persists one audit entry per logged action. A call either
//! writes exactly one entry or writes nothing.

use tracing::debug;

use crate::crud::response::{ResponseMessage, ResponseValue};
use crate::error::CrudError;
use crate::models::{FieldValue, Record, TaskType};
use crate::storage::AuditStore;

use super::diff::generate_diff;
use super::entry::AuditEntry;

/// Writes audit entries into one audit table of an [`AuditStore`]
pub struct AuditRecorder<'a> {
    store: &'a dyn AuditStore,
    audit_table: &'a str,
}

impl<'a> AuditRecorder<'a> {
    pub fn new(store: &'a dyn AuditStore, audit_table: &'a str) -> Self {
        Self { store, audit_table }
    }

    pub fn audit_table(&self) -> &str {
        self.audit_table
    }

    /// Validate and append one entry
    ///
    /// Returns `Count(1)` on success, a params error listing every missing
    /// field, or a log error carrying the store's message.
    pub fn record(
        &self,
        action: TaskType,
        actor_id: &str,
        table_name: &str,
        prior_payload: Option<FieldValue>,
        new_payload: Option<FieldValue>,
    ) -> ResponseMessage {
        self.record_with_diff(action, actor_id, table_name, prior_payload, new_payload, None)
    }

    fn record_with_diff(
        &self,
        action: TaskType,
        actor_id: &str,
        table_name: &str,
        prior_payload: Option<FieldValue>,
        new_payload: Option<FieldValue>,
        diff_summary: Option<String>,
    ) -> ResponseMessage {
        let prior_payload = prior_payload.filter(|p| !p.is_null());
        let new_payload = new_payload.filter(|p| !p.is_null());

        let mut problems = Vec::new();
        if actor_id.trim().is_empty() {
            problems.push("actor id is required");
        }
        if table_name.trim().is_empty() {
            problems.push("table name is required");
        }
        if prior_payload.is_none() {
            problems.push("prior payload is required");
        }
        if action == TaskType::Update && new_payload.is_none() {
            problems.push("new payload is required for update");
        }

        let prior_payload = match prior_payload {
            Some(payload) if problems.is_empty() => payload,
            _ => return CrudError::Params(problems.join(" | ")).into(),
        };

        let entry = AuditEntry::new(action, table_name, actor_id, prior_payload, new_payload)
            .with_diff(diff_summary);

        match self.store.append(self.audit_table, &entry) {
            Ok(written) => {
                debug!(audit_table = self.audit_table, action = %action, table = table_name, "audit entry written");
                ResponseMessage::success(
                    format!("{} audit entry recorded", action),
                    ResponseValue::Count(written),
                )
            }
            Err(err) => CrudError::Log(err.to_string()).into(),
        }
    }

    pub fn log_create(&self, actor_id: &str, table_name: &str, created: &[Record]) -> ResponseMessage {
        self.record(TaskType::Create, actor_id, table_name, Some(records_payload(created)), None)
    }

    /// Log an update
    ///
    /// A single change set is logged as a record, several as a list. One prior
    /// record with one change set also gets a diff summary.
    pub fn log_update(
        &self,
        actor_id: &str,
        table_name: &str,
        prior: &[Record],
        changes: &[Record],
    ) -> ResponseMessage {
        let new_payload = match changes {
            [change] => FieldValue::Record(change.clone()),
            _ => records_payload(changes),
        };
        let diff = match (prior, changes) {
            ([single], [change]) => generate_diff(single, &single.merged_with(change)),
            _ => None,
        };
        self.record_with_diff(
            TaskType::Update,
            actor_id,
            table_name,
            Some(records_payload(prior)),
            Some(new_payload),
            diff,
        )
    }

    /// Log a read; the payload describes the read criteria
    pub fn log_read(&self, actor_id: &str, table_name: &str, criteria: Record) -> ResponseMessage {
        self.record(TaskType::Read, actor_id, table_name, Some(FieldValue::Record(criteria)), None)
    }

    pub fn log_delete(&self, actor_id: &str, table_name: &str, prior: &[Record]) -> ResponseMessage {
        self.record(TaskType::Delete, actor_id, table_name, Some(records_payload(prior)), None)
    }

    pub fn log_login(&self, actor_id: &str, table_name: &str, session: Record) -> ResponseMessage {
        self.record(TaskType::Login, actor_id, table_name, Some(FieldValue::Record(session)), None)
    }

    pub fn log_logout(&self, actor_id: &str, table_name: &str, session: Record) -> ResponseMessage {
        self.record(TaskType::Logout, actor_id, table_name, Some(FieldValue::Record(session)), None)
    }
}

fn records_payload(records: &[Record]) -> FieldValue {
    FieldValue::List(records.iter().cloned().map(FieldValue::Record).collect())
}
