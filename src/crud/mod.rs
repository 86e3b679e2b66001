//! CRUD engine
//!
//! Resolves a [`TaskContext`] into one concrete storage operation, runs the
//! optional access check, captures pre-images, writes the audit entry and
//! assembles a [`ResponseMessage`]. Every public operation returns an
//! envelope; failures never escape as panics or bare errors.
//!
//! Within one call the pre-image read precedes the mutation and the audit
//! write follows it. An audit failure is reported in the envelope's
//! `log_res` and never undoes the mutation.

pub mod classify;
pub mod context;
mod delete;
mod read;
pub mod response;
mod save;

use std::collections::BTreeSet;

use tracing::warn;

pub use classify::{classify_save, select_target, SavePlan, Selection};
pub use context::{TaskContext, TaskContextBuilder};
pub use response::{GetResult, GetStats, ResponseMessage, ResponseValue, WriteResult};

use crate::access::{AccessDecision, AccessGate};
use crate::audit::AuditRecorder;
use crate::cache::QueryCache;
use crate::config::CrudOptions;
use crate::error::{CrudError, CrudResult};
use crate::mapper;
use crate::models::{Record, TaskType, UserInfo, ID_FIELD};
use crate::query::{compile_filter, CompiledFilter};
use crate::storage::{AuditStore, RecordStore, SelectQuery};

/// Generic record-access engine
pub struct CrudEngine<'a> {
    store: &'a dyn RecordStore,
    recorder: AuditRecorder<'a>,
    options: &'a CrudOptions,
    gate: Option<&'a dyn AccessGate>,
    cache: Option<&'a QueryCache>,
}

impl<'a> CrudEngine<'a> {
    /// Create an engine over a record store and an audit store
    pub fn new(
        store: &'a dyn RecordStore,
        audit_store: &'a dyn AuditStore,
        options: &'a CrudOptions,
    ) -> Self {
        Self {
            store,
            recorder: AuditRecorder::new(audit_store, &options.audit_table),
            options,
            gate: None,
            cache: None,
        }
    }

    /// Gate consulted for every task when `check_access` is on
    pub fn with_access_gate(mut self, gate: &'a dyn AccessGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Cache consulted by reads and invalidated by mutations
    pub fn with_cache(mut self, cache: &'a QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &CrudOptions {
        self.options
    }

    /// Record a login of `user`
    pub fn log_login(&self, user: &UserInfo, session: Record) -> ResponseMessage {
        self.log_session(TaskType::Login, user, session)
    }

    /// Record a logout of `user`
    pub fn log_logout(&self, user: &UserInfo, session: Record) -> ResponseMessage {
        self.log_session(TaskType::Logout, user, session)
    }

    fn log_session(&self, task: TaskType, user: &UserInfo, session: Record) -> ResponseMessage {
        if !self.options.logs(task) {
            return ResponseMessage::success(
                format!("{} logging is disabled", task.as_str()),
                ResponseValue::None,
            );
        }
        let table = &self.options.user_table;
        let res = match task {
            TaskType::Logout => self.recorder.log_logout(&user.user_id, table, session),
            _ => self.recorder.log_login(&user.user_id, table, session),
        };
        if !res.is_success() {
            warn!(user = %user.user_id, task = %task, error = %res.message, "session audit failed");
        }
        res
    }

    /// Common checks run before any mapping or storage access
    fn prepare(&self, task: TaskType, ctx: &TaskContext) -> CrudResult<()> {
        if ctx.table.trim().is_empty() {
            return Err(CrudError::Params("table is required".into()));
        }
        if self.options.logs(task) && ctx.user.user_id.trim().is_empty() {
            return Err(CrudError::Params(format!(
                "userId is required for audited {} tasks",
                task.as_str()
            )));
        }
        self.authorize(task, ctx)
    }

    fn authorize(&self, task: TaskType, ctx: &TaskContext) -> CrudResult<()> {
        if !self.options.check_access {
            return Ok(());
        }
        let decision = match self.gate {
            Some(gate) => gate.check(task, ctx),
            None => AccessDecision::Deny(
                "access checking is enabled but no access gate is configured".into(),
            ),
        };
        match decision {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => {
                warn!(table = %ctx.table, user = %ctx.user.user_id, task = %task, %reason, "access denied");
                Err(CrudError::Unauthorized(reason))
            }
        }
    }

    /// Legal internal columns of the context's table
    fn columns(&self, ctx: &TaskContext) -> CrudResult<BTreeSet<String>> {
        let mut columns = match &ctx.model {
            Some(model) => model.columns()?,
            None => self
                .store
                .columns(&ctx.table)
                .map_err(|e| CrudError::Read(e.to_string()))?,
        };
        columns.insert(ID_FIELD.to_string());
        Ok(columns)
    }

    /// Predicate for a selection; `None` selects every row
    fn predicate_for(
        &self,
        ctx: &TaskContext,
        selection: &Selection,
        columns: &BTreeSet<String>,
    ) -> CrudResult<Option<CompiledFilter>> {
        let predicate = match selection {
            Selection::ById(id) => CompiledFilter::by_id(id),
            Selection::ByIds(ids) => CompiledFilter::by_ids(ids),
            Selection::ByFilter => compile_filter(&ctx.filter, columns)?,
            Selection::All => return Ok(None),
        };
        if predicate.is_empty() {
            return Err(CrudError::Params(
                "filter compiled to an empty predicate".into(),
            ));
        }
        Ok(Some(predicate))
    }

    /// Current state of the rows matching `predicate`, in external naming
    ///
    /// Used for pre-images; never logs a read.
    fn snapshot(&self, table: &str, predicate: &CompiledFilter) -> CrudResult<Vec<Record>> {
        let rows = self
            .store
            .select(table, &SelectQuery::filtered(predicate.clone()))
            .map_err(|e| CrudError::Read(e.to_string()))?;
        Ok(rows.iter().map(mapper::to_external).collect())
    }

    fn invalidate(&self, table: &str) {
        if let Some(cache) = self.cache {
            cache.invalidate_table(table);
        }
    }

    /// Run the recorder only when logging is on for `task`
    fn audit(&self, task: TaskType, log: impl FnOnce(&AuditRecorder<'a>) -> ResponseMessage) -> Option<Box<ResponseMessage>> {
        if !self.options.logs(task) {
            return None;
        }
        let res = log(&self.recorder);
        if !res.is_success() {
            warn!(task = %task, code = %res.code, error = %res.message, "audit coverage degraded");
        }
        Some(Box::new(res))
    }
}

/// Ids of records in external naming, skipping records without one
fn ids_of(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.id().ok().flatten().map(str::to_string))
        .collect()
}

/// Wrap an operation outcome in an envelope
fn envelope<T>(
    result: CrudResult<T>,
    message: impl FnOnce(&T) -> String,
    value: impl FnOnce(T) -> ResponseValue,
) -> ResponseMessage {
    match result {
        Ok(payload) => {
            let msg = message(&payload);
            ResponseMessage::success(msg, value(payload))
        }
        Err(err) => {
            tracing::debug!(code = %err.code(), error = %err.message(), "task failed");
            err.into()
        }
    }
}
