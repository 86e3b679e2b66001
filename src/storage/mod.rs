//! Storage layer for crud-audit
//!
//! The engine talks to storage only through the [`RecordStore`] and
//! [`AuditStore`] traits. [`SqliteStore`] implements both; the JSONL audit
//! file backend in `audit::logger` implements only the latter.

pub mod file_io;
pub mod sqlite;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::audit::AuditEntry;
use crate::models::Record;
use crate::query::{CompiledFilter, SortClause};

pub use file_io::{read_json, write_json_atomic};
pub use sqlite::SqliteStore;

/// Failure reported by a storage collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to acquire connection lock: {0}")]
    Lock(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("corrupt stored row: {0}")]
    Corrupt(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Update or delete without a predicate
    #[error("refusing unrestricted {0} on table {1}")]
    Unrestricted(&'static str, String),
}

/// Parameters of one select
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// `None` selects every row
    pub predicate: Option<CompiledFilter>,
    /// `None` selects every column
    pub columns: Option<Vec<String>>,
    pub order_by: Vec<SortClause>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl SelectQuery {
    pub fn filtered(predicate: CompiledFilter) -> Self {
        Self {
            predicate: Some(predicate),
            ..Self::default()
        }
    }
}

/// Record persistence used by the CRUD engine
///
/// Records crossing this boundary always use internal field names.
pub trait RecordStore: Send + Sync {
    /// Legal column names of a table
    fn columns(&self, table: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Insert records in batches of `batch_size`, all or nothing
    fn insert(&self, table: &str, records: &[Record], batch_size: usize) -> Result<u64, StoreError>;

    fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Record>, StoreError>;

    fn count(&self, table: &str, predicate: Option<&CompiledFilter>) -> Result<u64, StoreError>;

    /// Apply `changes` to every row matching `predicate`; returns rows affected
    fn update(&self, table: &str, changes: &Record, predicate: &CompiledFilter) -> Result<u64, StoreError>;

    /// Hard-delete every row matching `predicate`; returns rows affected
    fn delete(&self, table: &str, predicate: &CompiledFilter) -> Result<u64, StoreError>;
}

/// Append-only persistence for audit entries
pub trait AuditStore: Send + Sync {
    fn append(&self, audit_table: &str, entry: &AuditEntry) -> Result<u64, StoreError>;
}
