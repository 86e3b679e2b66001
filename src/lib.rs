//! crud-audit - Generic record access with mandatory audit logging
//!
//! This library resolves generic task parameters (table, payload, record
//! ids, filters, user) into one concrete create, read, update or delete
//! against a relational store, and records a structured audit entry for
//! every logged action.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Error types and status codes
//! - `models`: Generic records, field values, task kinds and users
//! - `mapper`: External/internal field name translation
//! - `query`: Filters, sort and projection specs and their compilation
//! - `storage`: Store traits and the SQLite implementation
//! - `audit`: Audit entries, recorder and the JSONL file sink
//! - `access`: Access gates
//! - `cache`: Optional read cache
//! - `crud`: The engine and its result envelope
//! - `cli`: Command handlers for the `crud-audit` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_audit::{CrudEngine, CrudOptions, SqliteStore, TaskContext, UserInfo};
//!
//! let store = SqliteStore::open("records.db")?;
//! let options = CrudOptions::default();
//! let engine = CrudEngine::new(&store, &store, &options);
//!
//! let ctx = TaskContext::builder("groups", UserInfo::with_id("u-1"))
//!     .id("g1")
//!     .build(&options);
//! let res = engine.get_by_id(&ctx);
//! ```

pub mod access;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod crud;
pub mod error;
pub mod mapper;
pub mod models;
pub mod query;
pub mod storage;

pub use access::{AccessDecision, AccessGate, AllowAll, DenyAll, RoleAccessGate};
pub use audit::{AuditEntry, AuditRecorder, JsonlAuditStore};
pub use cache::QueryCache;
pub use config::{AuditBackend, CrudOptions, CrudPaths};
pub use crud::{CrudEngine, GetResult, ResponseMessage, ResponseValue, TaskContext, WriteResult};
pub use error::{CrudError, CrudResult, ResCode};
pub use models::{FieldValue, Record, TaskType, UserInfo};
pub use query::{Filter, FilterGroup, GroupOperator, ProjectionSpec, QueryParam, SortSpec};
pub use storage::{AuditStore, RecordStore, SqliteStore, StoreError};
