//! Audit logging system for crud-audit
//!
//! Records every logged action with the affected table, the actor, and the
//! before/after state in an append-only store.
//!
//! # Architecture
//!
//! - `AuditEntry`: a single immutable audit entry.
//! - `AuditRecorder`: validates an entry and appends it through an
//!   [`AuditStore`](crate::storage::AuditStore), reporting the outcome as a
//!   result envelope instead of an error.
//! - `JsonlAuditStore`: file-backed store writing line-delimited JSON.
//! - `generate_diff`: human-readable diff between record states.
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_audit::audit::AuditRecorder;
//! use crud_audit::storage::SqliteStore;
//!
//! let store = SqliteStore::open(paths.database_file())?;
//! let recorder = AuditRecorder::new(&store, "audits");
//!
//! let res = recorder.log_delete("u-1", "groups", &deleted_records);
//! if !res.is_success() {
//!     eprintln!("audit degraded: {}", res.message);
//! }
//! ```

mod diff;
mod entry;
mod logger;
mod recorder;

pub use diff::generate_diff;
pub use entry::AuditEntry;
pub use logger::JsonlAuditStore;
pub use recorder::AuditRecorder;
