//! Create and update operations

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::error::{CrudError, CrudResult};
use crate::mapper;
use crate::models::{Record, TaskType, ID_FIELD};
use crate::query::CompiledFilter;

use super::{
    classify_save, envelope, ids_of, CrudEngine, ResponseMessage, ResponseValue, SavePlan,
    Selection, TaskContext, WriteResult,
};

impl<'a> CrudEngine<'a> {
    /// Create or update, depending on the shape of the action payload
    pub fn save_record(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = classify_save(ctx).and_then(|plan| match plan {
            SavePlan::Create => self.create(ctx),
            SavePlan::UpdateById(id) => self.update_selected(ctx, Selection::ById(id)),
            SavePlan::UpdateByIds(ids) => self.update_selected(ctx, Selection::ByIds(ids)),
            SavePlan::UpdateByFilter => self.update_selected(ctx, Selection::ByFilter),
            SavePlan::UpdateBatch => self.update_each(ctx),
        });
        write_envelope(result)
    }

    /// Insert every action record, generating ids where missing
    pub fn create_record(&self, ctx: &TaskContext) -> ResponseMessage {
        write_envelope(self.create(ctx))
    }

    /// Apply the single action record to one row
    ///
    /// The target id comes from the context, or from the record itself.
    pub fn update_by_id(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = single_change(ctx).and_then(|change| {
            let id = match ctx.record_ids.as_slice() {
                [id] => id.clone(),
                [] => change
                    .id()?
                    .map(str::to_string)
                    .ok_or_else(|| CrudError::Params("a record id is required".into()))?,
                _ => return Err(CrudError::Params("exactly one record id is required".into())),
            };
            self.update_selected(ctx, Selection::ById(id))
        });
        write_envelope(result)
    }

    /// Apply the single action record to every row named by the context's ids
    pub fn update_by_ids(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = if ctx.record_ids.is_empty() {
            Err(CrudError::Params("recordIds are required".into()))
        } else {
            single_change(ctx)
                .and_then(|_| self.update_selected(ctx, Selection::ByIds(ctx.record_ids.clone())))
        };
        write_envelope(result)
    }

    /// Apply the single action record to every row matching the filter
    pub fn update_by_filter(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = if ctx.filter.is_empty() {
            Err(CrudError::Params(
                "a non-empty filter is required to update by filter".into(),
            ))
        } else {
            single_change(ctx).and_then(|_| self.update_selected(ctx, Selection::ByFilter))
        };
        write_envelope(result)
    }

    /// Update each action record by its own id
    pub fn update_batch(&self, ctx: &TaskContext) -> ResponseMessage {
        write_envelope(self.update_each(ctx))
    }

    fn create(&self, ctx: &TaskContext) -> CrudResult<WriteResult> {
        self.prepare(TaskType::Create, ctx)?;
        if ctx.action_params.is_empty() {
            return Err(CrudError::Params("actionParams are required to create records".into()));
        }

        let columns = self.columns(ctx)?;
        let mut created = Vec::with_capacity(ctx.action_params.len());
        let mut rows = Vec::with_capacity(ctx.action_params.len());
        for record in &ctx.action_params {
            let mut record = record.clone();
            if record.id()?.is_none() {
                record.insert(ID_FIELD, uuid::Uuid::new_v4().to_string());
            }
            let row = mapper::to_internal(&record)?;
            mapper::ensure_known_fields(row.keys(), &columns, &ctx.table)?;
            created.push(mapper::to_external(&row));
            rows.push(row);
        }

        let inserted = self
            .store
            .insert(&ctx.table, &rows, ctx.batch_size)
            .map_err(|e| CrudError::Insert(e.to_string()))?;
        self.invalidate(&ctx.table);
        info!(table = %ctx.table, inserted, "records created");

        let mut result = WriteResult::new(TaskType::Create, ids_of(&created), inserted);
        result.log_res = self.audit(TaskType::Create, |recorder| {
            recorder.log_create(&ctx.user.user_id, &ctx.table, &created)
        });
        Ok(result)
    }

    /// One update statement over the selected rows
    fn update_selected(&self, ctx: &TaskContext, selection: Selection) -> CrudResult<WriteResult> {
        self.prepare(TaskType::Update, ctx)?;
        let change = single_change(ctx)?;

        let columns = self.columns(ctx)?;
        let changes = write_set(change, &columns, &ctx.table)?;
        let predicate = self.predicate_for(ctx, &selection, &columns)?.ok_or_else(|| {
            CrudError::Params("an update requires recordIds or a non-empty filter".into())
        })?;

        let prior = self.pre_image(TaskType::Update, &ctx.table, &predicate)?;

        let updated = self
            .store
            .update(&ctx.table, &changes, &predicate)
            .map_err(|e| CrudError::Update(e.to_string()))?;
        self.invalidate(&ctx.table);
        info!(table = %ctx.table, updated, ?selection, "records updated");

        let record_ids = match selection {
            Selection::ById(id) => vec![id],
            Selection::ByIds(ids) => ids,
            Selection::ByFilter | Selection::All => ids_of(&prior),
        };

        let mut result = WriteResult::new(TaskType::Update, record_ids, updated);
        result.log_res = self.audit(TaskType::Update, |recorder| {
            recorder.log_update(
                &ctx.user.user_id,
                &ctx.table,
                &prior,
                &[mapper::to_external(&changes)],
            )
        });
        Ok(result)
    }

    /// Best-effort multi-record update
    ///
    /// Records that fail mapping or validation are skipped. The first storage
    /// failure aborts; updates already applied stay committed.
    fn update_each(&self, ctx: &TaskContext) -> CrudResult<WriteResult> {
        self.prepare(TaskType::Update, ctx)?;
        if ctx.action_params.is_empty() {
            return Err(CrudError::Params("actionParams are required to update records".into()));
        }

        let columns = self.columns(ctx)?;
        let mut prior = Vec::new();
        let mut applied = Vec::new();
        let mut record_ids = Vec::new();
        let mut updated = 0u64;
        let mut skipped = 0u64;
        let mut first_skip: Option<CrudError> = None;

        for (index, record) in ctx.action_params.iter().enumerate() {
            let prepared = record.id().and_then(|id| {
                let id = id.ok_or_else(|| CrudError::Params("record has no id".into()))?;
                Ok((id.to_string(), write_set(record, &columns, &ctx.table)?))
            });
            let (id, changes) = match prepared {
                Ok(prepared) => prepared,
                Err(err) => {
                    warn!(table = %ctx.table, index, error = %err, "skipping record in batch update");
                    skipped += 1;
                    first_skip.get_or_insert(err);
                    continue;
                }
            };

            let predicate = CompiledFilter::by_id(&id);
            let outcome = self
                .pre_image(TaskType::Update, &ctx.table, &predicate)
                .and_then(|before| {
                    let count = self
                        .store
                        .update(&ctx.table, &changes, &predicate)
                        .map_err(|e| CrudError::Update(e.to_string()))?;
                    Ok((before, count))
                });
            let (before, count) = match outcome {
                Ok(done) => done,
                Err(err) => {
                    if updated > 0 {
                        self.invalidate(&ctx.table);
                    }
                    return Err(err);
                }
            };

            prior.extend(before);
            updated += count;
            let mut change = mapper::to_external(&changes);
            change.insert(ID_FIELD, id.clone());
            applied.push(change);
            record_ids.push(id);
        }

        if applied.is_empty() {
            if let Some(err) = first_skip {
                return Err(err);
            }
        }

        self.invalidate(&ctx.table);
        info!(table = %ctx.table, updated, skipped, "batch update finished");

        let mut result = WriteResult::new(TaskType::Update, record_ids, updated);
        result.skipped_count = skipped;
        result.log_res = self.audit(TaskType::Update, |recorder| {
            recorder.log_update(&ctx.user.user_id, &ctx.table, &prior, &applied)
        });
        Ok(result)
    }

    /// Pre-image of the selected rows when `task` is logged; empty otherwise
    pub(super) fn pre_image(
        &self,
        task: TaskType,
        table: &str,
        predicate: &CompiledFilter,
    ) -> CrudResult<Vec<Record>> {
        if self.options.logs(task) {
            self.snapshot(table, predicate)
        } else {
            Ok(Vec::new())
        }
    }
}

fn single_change(ctx: &TaskContext) -> CrudResult<&Record> {
    match ctx.action_params.as_slice() {
        [change] => Ok(change),
        [] => Err(CrudError::Params("actionParams are required to update records".into())),
        _ => Err(CrudError::Params(
            "exactly one change record is required for this update".into(),
        )),
    }
}

/// Internal-named columns to write, without the id
fn write_set(record: &Record, columns: &BTreeSet<String>, table: &str) -> CrudResult<Record> {
    let mut changes = mapper::to_internal(record)?;
    changes.remove(ID_FIELD);
    if changes.is_empty() {
        return Err(CrudError::Params("no fields to update".into()));
    }
    mapper::ensure_known_fields(changes.keys(), columns, table)?;
    Ok(changes)
}

fn write_envelope(result: CrudResult<WriteResult>) -> ResponseMessage {
    envelope(
        result,
        |write| {
            let verb = match write.task_type {
                TaskType::Create => "created",
                _ => "updated",
            };
            if write.skipped_count > 0 {
                format!(
                    "{} record(s) {}, {} skipped",
                    write.records_count, verb, write.skipped_count
                )
            } else {
                format!("{} record(s) {}", write.records_count, verb)
            }
        },
        ResponseValue::Write,
    )
}
