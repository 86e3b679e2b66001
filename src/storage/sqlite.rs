//! SQLite-backed record and audit store
//!
//! Identifiers are always quoted and every value is bound positionally; no
//! caller-supplied value is ever spliced into SQL text.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

use crate::audit::AuditEntry;
use crate::models::{FieldValue, Record, TaskType};
use crate::query::{quote_ident, CompiledFilter};

use super::{AuditStore, RecordStore, SelectQuery, StoreError};

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            FieldValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            FieldValue::Float(x) => ToSqlOutput::Owned(Value::Real(*x)),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Timestamp(t) => ToSqlOutput::Owned(Value::Text(t.to_rfc3339())),
            FieldValue::List(_) | FieldValue::Record(_) => {
                ToSqlOutput::Owned(Value::Text(self.to_json().to_string()))
            }
        };
        Ok(out)
    }
}

fn value_from_sql(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => FieldValue::Int(i),
        ValueRef::Real(x) => FieldValue::Float(x),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Host parameter limit of the bundled SQLite
const MAX_BOUND_PARAMS: usize = 32_766;

const AUDIT_COLUMNS: &str =
    "id, table_name, prior_payload, new_payload, action, actor_id, logged_at, diff_summary";

/// Store over a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Run a batch of schema statements
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// The most recent `limit` audit entries of an audit table, oldest first
    pub fn recent_audit_entries(
        &self,
        audit_table: &str,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.lock()?;
        create_audit_table(&conn, audit_table)?;

        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid DESC LIMIT ?",
            AUDIT_COLUMNS,
            quote_ident(audit_table)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(AuditRow {
                id: row.get(0)?,
                table_name: row.get(1)?,
                prior_payload: row.get(2)?,
                new_payload: row.get(3)?,
                action: row.get(4)?,
                actor_id: row.get(5)?,
                logged_at: row.get(6)?,
                diff_summary: row.get(7)?,
            })
        })?;

        let mut entries = rows
            .map(|row| row.map_err(StoreError::from).and_then(AuditRow::into_entry))
            .collect::<Result<Vec<_>, _>>()?;
        entries.reverse();
        Ok(entries)
    }

    /// Number of rows in an audit table, creating it if missing
    pub fn audit_entry_count(&self, audit_table: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        create_audit_table(&conn, audit_table)?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(audit_table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn create_audit_table(conn: &Connection, audit_table: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            table_name TEXT NOT NULL,
            prior_payload TEXT NOT NULL,
            new_payload TEXT,
            action TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            logged_at TEXT NOT NULL,
            diff_summary TEXT
        );",
        quote_ident(audit_table)
    ))?;
    Ok(())
}

/// Raw audit row as stored
struct AuditRow {
    id: String,
    table_name: String,
    prior_payload: String,
    new_payload: Option<String>,
    action: String,
    actor_id: String,
    logged_at: String,
    diff_summary: Option<String>,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry, StoreError> {
        let action = TaskType::parse(&self.action)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown action {:?}", self.action)))?;
        let logged_at = DateTime::parse_from_rfc3339(&self.logged_at)
            .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", self.logged_at, e)))?
            .with_timezone(&Utc);
        let new_payload = match self.new_payload {
            Some(text) => Some(serde_json::from_str(&text)?),
            None => None,
        };

        Ok(AuditEntry {
            id: self.id,
            table_name: self.table_name,
            prior_payload: serde_json::from_str(&self.prior_payload)?,
            new_payload,
            action,
            actor_id: self.actor_id,
            logged_at,
            diff_summary: self.diff_summary,
        })
    }
}

fn where_clause<'p>(predicate: Option<&'p CompiledFilter>, sql: &mut String, bound: &mut Vec<&'p FieldValue>) {
    if let Some(p) = predicate.filter(|p| !p.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(&p.fragment);
        bound.extend(p.params.iter());
    }
}

impl RecordStore for SqliteStore {
    fn columns(&self, table: &str) -> Result<BTreeSet<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<BTreeSet<_>, _>>()?;

        if names.is_empty() {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        Ok(names)
    }

    fn insert(&self, table: &str, records: &[Record], batch_size: usize) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0u64;

        for batch in records.chunks(batch_size.max(1)) {
            for run in runs_by_columns(batch) {
                let columns: Vec<&String> = run[0].keys().collect();
                if columns.is_empty() {
                    for _ in run {
                        inserted += tx.execute(
                            &format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)),
                            [],
                        )? as u64;
                    }
                    continue;
                }

                let row = format!("({})", vec!["?"; columns.len()].join(", "));
                let column_list = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
                let rows_per_statement = (MAX_BOUND_PARAMS / columns.len()).max(1);

                for chunk in run.chunks(rows_per_statement) {
                    let sql = format!(
                        "INSERT INTO {} ({}) VALUES {}",
                        quote_ident(table),
                        column_list,
                        vec![row.as_str(); chunk.len()].join(", ")
                    );
                    let bound: Vec<&FieldValue> =
                        chunk.iter().flat_map(|r| r.iter().map(|(_, v)| v)).collect();
                    inserted += tx.execute(&sql, params_from_iter(bound))? as u64;
                }
            }
        }

        tx.commit()?;
        debug!(table, inserted, "inserted records");
        Ok(inserted)
    }

    fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Record>, StoreError> {
        let projection = match &query.columns {
            Some(columns) => columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            None => "*".to_string(),
        };
        let mut sql = format!("SELECT {} FROM {}", projection, quote_ident(table));
        let mut bound = Vec::new();
        where_clause(query.predicate.as_ref(), &mut sql, &mut bound);

        if !query.order_by.is_empty() {
            let order: Vec<String> = query.order_by.iter().map(|c| c.to_sql()).collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }
        match query.limit {
            Some(limit) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, query.offset)),
            None if query.offset > 0 => sql.push_str(&format!(" LIMIT -1 OFFSET {}", query.offset)),
            None => {}
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            let mut record = Record::new();
            for (i, name) in names.iter().enumerate() {
                record.insert(name.clone(), value_from_sql(row.get_ref(i)?));
            }
            Ok(record)
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count(&self, table: &str, predicate: Option<&CompiledFilter>) -> Result<u64, StoreError> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let mut bound = Vec::new();
        where_clause(predicate, &mut sql, &mut bound);

        let conn = self.lock()?;
        let total: i64 = conn.query_row(&sql, params_from_iter(bound), |row| row.get(0))?;
        Ok(total.max(0) as u64)
    }

    fn update(&self, table: &str, changes: &Record, predicate: &CompiledFilter) -> Result<u64, StoreError> {
        if predicate.is_empty() {
            return Err(StoreError::Unrestricted("update", table.to_string()));
        }
        if changes.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = changes.keys().map(|k| format!("{} = ?", quote_ident(k))).collect();
        let mut sql = format!("UPDATE {} SET {}", quote_ident(table), assignments.join(", "));
        let mut bound: Vec<&FieldValue> = changes.iter().map(|(_, v)| v).collect();
        where_clause(Some(predicate), &mut sql, &mut bound);

        let conn = self.lock()?;
        Ok(conn.execute(&sql, params_from_iter(bound))? as u64)
    }

    fn delete(&self, table: &str, predicate: &CompiledFilter) -> Result<u64, StoreError> {
        if predicate.is_empty() {
            return Err(StoreError::Unrestricted("delete", table.to_string()));
        }

        let mut sql = format!("DELETE FROM {}", quote_ident(table));
        let mut bound = Vec::new();
        where_clause(Some(predicate), &mut sql, &mut bound);

        let conn = self.lock()?;
        Ok(conn.execute(&sql, params_from_iter(bound))? as u64)
    }
}

impl AuditStore for SqliteStore {
    fn append(&self, audit_table: &str, entry: &AuditEntry) -> Result<u64, StoreError> {
        let prior = serde_json::to_string(&entry.prior_payload)?;
        let new = entry.new_payload.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self.lock()?;
        create_audit_table(&conn, audit_table)?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            quote_ident(audit_table),
            AUDIT_COLUMNS
        );
        let written = conn.execute(
            &sql,
            params![
                entry.id,
                entry.table_name,
                prior,
                new,
                entry.action.as_str(),
                entry.actor_id,
                entry.logged_at.to_rfc3339(),
                entry.diff_summary,
            ],
        )?;
        Ok(written as u64)
    }
}

/// Split a batch into consecutive runs of records sharing the same fields
fn runs_by_columns(batch: &[Record]) -> Vec<&[Record]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=batch.len() {
        let boundary = i == batch.len() || !batch[i].keys().eq(batch[start].keys());
        if boundary {
            runs.push(&batch[start..i]);
            start = i;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SortClause, SortDirection};
    use crate::record;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE groups (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    kind TEXT,
                    member_count INTEGER
                );",
            )
            .unwrap();
        store
    }

    fn seed(store: &SqliteStore) {
        let records = vec![
            record! {"id" => "g1", "name" => "alpha", "kind" => "team", "member_count" => 3},
            record! {"id" => "g2", "name" => "beta", "kind" => "team", "member_count" => 5},
            record! {"id" => "g3", "name" => "gamma", "kind" => "org", "member_count" => 8},
        ];
        assert_eq!(store.insert("groups", &records, 2).unwrap(), 3);
    }

    #[test]
    fn test_columns() {
        let store = test_store();
        let columns = store.columns("groups").unwrap();
        assert!(columns.contains("member_count"));
        assert_eq!(columns.len(), 4);

        assert!(matches!(
            store.columns("missing").unwrap_err(),
            StoreError::UnknownTable(_)
        ));
    }

    #[test]
    fn test_insert_mixed_shapes_in_one_batch() {
        let store = test_store();
        let records = vec![
            record! {"id" => "a", "name" => "one"},
            record! {"id" => "b", "name" => "two", "kind" => "org"},
            record! {"id" => "c", "name" => "three"},
        ];
        assert_eq!(store.insert("groups", &records, 10).unwrap(), 3);
        assert_eq!(store.count("groups", None).unwrap(), 3);
    }

    #[test]
    fn test_insert_is_all_or_nothing() {
        let store = test_store();
        let records = vec![
            record! {"id" => "a", "name" => "one"},
            record! {"id" => "a", "name" => "duplicate"},
        ];
        assert!(store.insert("groups", &records, 1).is_err());
        assert_eq!(store.count("groups", None).unwrap(), 0);
    }

    #[test]
    fn test_select_filter_order_page() {
        let store = test_store();
        seed(&store);

        let query = SelectQuery {
            predicate: Some(CompiledFilter {
                fragment: r#""kind" = ?"#.into(),
                fields: vec!["kind".into()],
                params: vec![FieldValue::from("team")],
            }),
            columns: Some(vec!["id".into(), "member_count".into()]),
            order_by: vec![SortClause {
                column: "member_count".into(),
                direction: SortDirection::Desc,
            }],
            limit: Some(1),
            offset: 0,
        };
        let rows = store.select("groups", &query).unwrap();
        assert_eq!(rows, vec![record! {"id" => "g2", "member_count" => 5}]);

        let skipped = SelectQuery {
            offset: 2,
            ..SelectQuery::default()
        };
        assert_eq!(store.select("groups", &skipped).unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let store = test_store();
        seed(&store);

        let changed = store
            .update("groups", &record! {"kind" => "club"}, &CompiledFilter::by_ids(&["g1".to_string(), "g3".to_string()]))
            .unwrap();
        assert_eq!(changed, 2);

        let rows = store
            .select("groups", &SelectQuery::filtered(CompiledFilter::by_id("g3")))
            .unwrap();
        assert_eq!(rows[0].get("kind"), Some(&FieldValue::from("club")));

        assert_eq!(store.delete("groups", &CompiledFilter::by_id("g1")).unwrap(), 1);
        assert_eq!(store.delete("groups", &CompiledFilter::by_id("g1")).unwrap(), 0);
        assert_eq!(store.count("groups", None).unwrap(), 2);
    }

    #[test]
    fn test_unrestricted_mutations_refused() {
        let store = test_store();
        seed(&store);

        let empty = CompiledFilter::default();
        assert!(matches!(
            store.delete("groups", &empty).unwrap_err(),
            StoreError::Unrestricted("delete", _)
        ));
        assert!(matches!(
            store.update("groups", &record! {"kind" => "x"}, &empty).unwrap_err(),
            StoreError::Unrestricted("update", _)
        ));
        assert_eq!(store.count("groups", None).unwrap(), 3);
    }

    #[test]
    fn test_structured_values_stored_as_json() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .execute_batch("CREATE TABLE docs (id TEXT PRIMARY KEY, body TEXT, active INTEGER);")
            .unwrap();
        store
            .insert(
                "docs",
                &[record! {"id" => "d1", "body" => record! {"a" => 1}, "active" => true}],
                10,
            )
            .unwrap();

        let rows = store.select("docs", &SelectQuery::default()).unwrap();
        assert_eq!(rows[0].get("body"), Some(&FieldValue::from(r#"{"a":1}"#)));
        assert_eq!(rows[0].get("active"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_audit_append_and_recent() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..4 {
            let entry = AuditEntry::new(
                TaskType::Update,
                "groups",
                "u-1",
                FieldValue::from(vec![record! {"id" => format!("g{}", i)}]),
                Some(FieldValue::from(record! {"name" => "x"})),
            );
            assert_eq!(store.append("audits", &entry).unwrap(), 1);
        }

        let recent = store.recent_audit_entries("audits", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(
            recent[1].prior_payload,
            FieldValue::from(vec![record! {"id" => "g3"}])
        );
        assert_eq!(recent[0].action, TaskType::Update);
        assert!(recent[0].new_payload.is_some());
    }
}
