//! Role-based access gate backed by the access and role tables
//!
//! Access table rows: `user_id`, `role_id`, `is_admin`, `is_active`.
//! Role table rows: `role_id`, `table_name`, `can_read`, `can_create`,
//! `can_update`, `can_delete`.

use std::collections::HashMap;

use tracing::debug;

use crate::config::CrudOptions;
use crate::crud::TaskContext;
use crate::error::{CrudError, CrudResult};
use crate::models::{FieldValue, Record, TaskType};
use crate::query::{compile_params, CompiledFilter, QueryParam};
use crate::storage::{RecordStore, SelectQuery};

use super::{AccessDecision, AccessGate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Capabilities {
    read: bool,
    create: bool,
    update: bool,
    delete: bool,
}

impl Capabilities {
    fn from_row(row: &Record) -> Self {
        let flag = |name: &str| row.get(name).and_then(FieldValue::as_flag).unwrap_or(false);
        Self {
            read: flag("can_read"),
            create: flag("can_create"),
            update: flag("can_update"),
            delete: flag("can_delete"),
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            read: self.read || other.read,
            create: self.create || other.create,
            update: self.update || other.update,
            delete: self.delete || other.delete,
        }
    }

    fn allows(self, task: TaskType) -> bool {
        match task {
            TaskType::Read => self.read,
            TaskType::Create => self.create,
            TaskType::Update => self.update,
            TaskType::Delete => self.delete,
            TaskType::Login | TaskType::Logout => true,
        }
    }
}

/// Access rules of one user, loaded once and checked per task
#[derive(Debug, Clone)]
pub struct RoleAccessGate {
    user_id: String,
    is_admin: bool,
    is_active: bool,
    tables: HashMap<String, Capabilities>,
}

impl RoleAccessGate {
    /// Load the access rules of `user_id`
    ///
    /// A user without any access row is treated as inactive.
    pub fn load(store: &dyn RecordStore, options: &CrudOptions, user_id: &str) -> CrudResult<Self> {
        let access_rows = select_where(store, &options.access_table, QueryParam::new().with("userId", user_id))?;

        let active_rows: Vec<&Record> = access_rows
            .iter()
            .filter(|row| row.get("is_active").and_then(FieldValue::as_flag).unwrap_or(true))
            .collect();
        let is_admin = active_rows
            .iter()
            .any(|row| row.get("is_admin").and_then(FieldValue::as_flag).unwrap_or(false));

        let role_ids: Vec<FieldValue> = active_rows
            .iter()
            .filter_map(|row| row.get("role_id"))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();

        let mut tables: HashMap<String, Capabilities> = HashMap::new();
        if !role_ids.is_empty() {
            let role_rows = select_where(
                store,
                &options.role_table,
                QueryParam::new().with("roleId", FieldValue::List(role_ids)),
            )?;
            for row in &role_rows {
                if let Some(table) = row.get("table_name").and_then(FieldValue::as_str) {
                    let caps = Capabilities::from_row(row);
                    let entry = tables.entry(table.to_string()).or_default();
                    *entry = entry.union(caps);
                }
            }
        }

        debug!(
            user_id,
            is_admin,
            roles = active_rows.len(),
            tables = tables.len(),
            "access rules loaded"
        );

        Ok(Self {
            user_id: user_id.to_string(),
            is_admin,
            is_active: !active_rows.is_empty(),
            tables,
        })
    }
}

fn select_where(store: &dyn RecordStore, table: &str, query: QueryParam) -> CrudResult<Vec<Record>> {
    let columns = store
        .columns(table)
        .map_err(|e| CrudError::Read(e.to_string()))?;
    let predicate: CompiledFilter = compile_params(&query, &columns)?;
    store
        .select(table, &SelectQuery::filtered(predicate))
        .map_err(|e| CrudError::Read(e.to_string()))
}

impl AccessGate for RoleAccessGate {
    fn check(&self, task: TaskType, ctx: &TaskContext) -> AccessDecision {
        if ctx.user.user_id != self.user_id {
            return AccessDecision::Deny(format!(
                "access rules were loaded for a different user than {}",
                ctx.user.user_id
            ));
        }
        if !self.is_active {
            return AccessDecision::Deny(format!("user {} has no active access", self.user_id));
        }
        if self.is_admin {
            return AccessDecision::Allow;
        }

        let allowed = self
            .tables
            .get(&ctx.table)
            .copied()
            .unwrap_or_default()
            .allows(task);

        if allowed {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(format!(
                "user {} may not {} records of table {}",
                self.user_id,
                task.as_str(),
                ctx.table
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserInfo;
    use crate::record;
    use crate::storage::SqliteStore;

    fn setup() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE accesses (id TEXT PRIMARY KEY, user_id TEXT, role_id TEXT, is_admin INTEGER, is_active INTEGER);
                 CREATE TABLE roles (id TEXT PRIMARY KEY, role_id TEXT, table_name TEXT,
                     can_read INTEGER, can_create INTEGER, can_update INTEGER, can_delete INTEGER);",
            )
            .unwrap();
        store
            .insert(
                "accesses",
                &[
                    record! {"id" => "a1", "user_id" => "reader", "role_id" => "r-read", "is_admin" => false, "is_active" => true},
                    record! {"id" => "a2", "user_id" => "root", "role_id" => "r-none", "is_admin" => true, "is_active" => true},
                    record! {"id" => "a3", "user_id" => "gone", "role_id" => "r-read", "is_admin" => false, "is_active" => false},
                ],
                10,
            )
            .unwrap();
        store
            .insert(
                "roles",
                &[record! {
                    "id" => "p1", "role_id" => "r-read", "table_name" => "groups",
                    "can_read" => true, "can_create" => false, "can_update" => false, "can_delete" => false
                }],
                10,
            )
            .unwrap();
        store
    }

    fn ctx(user: &str, table: &str) -> TaskContext {
        TaskContext::builder(table, UserInfo::with_id(user)).build(&CrudOptions::default())
    }

    #[test]
    fn test_capability_flags_decide() {
        let store = setup();
        let gate = RoleAccessGate::load(&store, &CrudOptions::default(), "reader").unwrap();

        assert!(gate.check(TaskType::Read, &ctx("reader", "groups")).is_allowed());
        assert!(!gate.check(TaskType::Delete, &ctx("reader", "groups")).is_allowed());
        assert!(!gate.check(TaskType::Read, &ctx("reader", "users")).is_allowed());
        assert!(gate.check(TaskType::Login, &ctx("reader", "users")).is_allowed());
    }

    #[test]
    fn test_admin_allowed_everywhere() {
        let store = setup();
        let gate = RoleAccessGate::load(&store, &CrudOptions::default(), "root").unwrap();
        assert!(gate.check(TaskType::Delete, &ctx("root", "anything")).is_allowed());
    }

    #[test]
    fn test_inactive_and_unknown_users_denied() {
        let store = setup();
        let options = CrudOptions::default();

        let gate = RoleAccessGate::load(&store, &options, "gone").unwrap();
        match gate.check(TaskType::Read, &ctx("gone", "groups")) {
            AccessDecision::Deny(reason) => assert!(reason.contains("no active access")),
            AccessDecision::Allow => panic!("inactive user allowed"),
        }

        let gate = RoleAccessGate::load(&store, &options, "stranger").unwrap();
        assert!(!gate.check(TaskType::Read, &ctx("stranger", "groups")).is_allowed());
    }

    #[test]
    fn test_deactivated_admin_row_grants_nothing() {
        let store = setup();
        store
            .insert(
                "accesses",
                &[
                    record! {"id" => "a4", "user_id" => "demoted", "role_id" => "r-none", "is_admin" => true, "is_active" => false},
                    record! {"id" => "a5", "user_id" => "demoted", "role_id" => "r-read", "is_admin" => false, "is_active" => true},
                ],
                10,
            )
            .unwrap();

        let gate = RoleAccessGate::load(&store, &CrudOptions::default(), "demoted").unwrap();
        assert!(!gate.check(TaskType::Delete, &ctx("demoted", "groups")).is_allowed());
        assert!(!gate.check(TaskType::Read, &ctx("demoted", "users")).is_allowed());
        assert!(gate.check(TaskType::Read, &ctx("demoted", "groups")).is_allowed());
    }

    #[test]
    fn test_rules_bound_to_loaded_user() {
        let store = setup();
        let gate = RoleAccessGate::load(&store, &CrudOptions::default(), "root").unwrap();
        assert!(!gate.check(TaskType::Read, &ctx("reader", "groups")).is_allowed());
    }

    #[test]
    fn test_missing_access_table_is_read_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = RoleAccessGate::load(&store, &CrudOptions::default(), "reader").unwrap_err();
        assert!(matches!(err, CrudError::Read(_)));
    }
}
