//! Hard delete operations

use tracing::info;

use crate::error::{CrudError, CrudResult};
use crate::models::TaskType;

use super::{
    envelope, ids_of, select_target, CrudEngine, ResponseMessage, ResponseValue, Selection,
    TaskContext, WriteResult,
};

impl<'a> CrudEngine<'a> {
    /// Delete by single id, id set or filter; never every row
    pub fn delete_record(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = select_target(ctx, TaskType::Delete).and_then(|selection| self.delete(ctx, selection));
        delete_envelope(result)
    }

    pub fn delete_by_id(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = match ctx.record_ids.as_slice() {
            [id] => self.delete(ctx, Selection::ById(id.clone())),
            _ => Err(CrudError::Params("exactly one record id is required".into())),
        };
        delete_envelope(result)
    }

    pub fn delete_by_ids(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = if ctx.record_ids.is_empty() {
            Err(CrudError::Params("recordIds are required".into()))
        } else {
            self.delete(ctx, Selection::ByIds(ctx.record_ids.clone()))
        };
        delete_envelope(result)
    }

    pub fn delete_by_filter(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = if ctx.filter.is_empty() {
            Err(CrudError::Params(
                "a non-empty filter is required to delete by filter".into(),
            ))
        } else {
            self.delete(ctx, Selection::ByFilter)
        };
        delete_envelope(result)
    }

    fn delete(&self, ctx: &TaskContext, selection: Selection) -> CrudResult<WriteResult> {
        self.prepare(TaskType::Delete, ctx)?;

        let columns = self.columns(ctx)?;
        let predicate = self
            .predicate_for(ctx, &selection, &columns)?
            .ok_or_else(|| CrudError::Params("deleting every row is not allowed".into()))?;

        let prior = self.pre_image(TaskType::Delete, &ctx.table, &predicate)?;

        let deleted = self
            .store
            .delete(&ctx.table, &predicate)
            .map_err(|e| CrudError::Delete(e.to_string()))?;
        self.invalidate(&ctx.table);
        info!(table = %ctx.table, deleted, ?selection, "records deleted");

        let record_ids = match selection {
            Selection::ById(id) => vec![id],
            Selection::ByIds(ids) => ids,
            Selection::ByFilter | Selection::All => ids_of(&prior),
        };

        let mut result = WriteResult::new(TaskType::Delete, record_ids, deleted);
        result.log_res = self.audit(TaskType::Delete, |recorder| {
            recorder.log_delete(&ctx.user.user_id, &ctx.table, &prior)
        });
        Ok(result)
    }
}

fn delete_envelope(result: CrudResult<WriteResult>) -> ResponseMessage {
    envelope(
        result,
        |write| format!("{} record(s) deleted", write.records_count),
        ResponseValue::Write,
    )
}

#[cfg(test)]
mod tests {
    use crate::access::DenyAll;
    use crate::crud::tests::Fixture;
    use crate::crud::ResponseValue;
    use crate::error::ResCode;
    use crate::models::{FieldValue, TaskType};
    use crate::query::QueryParam;

    fn deleted(res: &crate::crud::ResponseMessage) -> u64 {
        match &res.value {
            ResponseValue::Write(write) => write.records_count,
            other => panic!("expected write result, got {:?}: {}", other, res.message),
        }
    }

    #[test]
    fn test_delete_ids_with_one_missing() {
        let fx = Fixture::seeded();
        let ctx = fx.ctx().ids(["g1", "missing"]).build(&fx.options);

        let res = fx.engine().delete_record(&ctx);
        assert_eq!(res.code, ResCode::Success);
        assert_eq!(deleted(&res), 1);
        assert_eq!(fx.row_count(), 3);

        let entries = fx.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, TaskType::Delete);
        match &entries[0].prior_payload {
            FieldValue::List(items) => assert_eq!(items.len(), 1),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_delete_twice_succeeds_with_zero() {
        let fx = Fixture::seeded();
        let ctx = fx.ctx().id("g2").build(&fx.options);
        let engine = fx.engine();

        assert_eq!(deleted(&engine.delete_by_id(&ctx)), 1);
        let second = engine.delete_by_id(&ctx);
        assert_eq!(second.code, ResCode::Success);
        assert_eq!(deleted(&second), 0);
        assert_eq!(fx.audit_entries().len(), 2);
    }

    #[test]
    fn test_delete_by_filter() {
        let fx = Fixture::seeded();
        let ctx = fx
            .ctx()
            .filter(QueryParam::new().with("kind", "team"))
            .build(&fx.options);

        let res = fx.engine().delete_by_filter(&ctx);
        assert_eq!(deleted(&res), 2);
        assert_eq!(fx.row_count(), 2);
    }

    #[test]
    fn test_unrestricted_delete_refused() {
        let fx = Fixture::seeded();
        let ctx = fx.ctx().build(&fx.options);

        assert_eq!(fx.engine().delete_record(&ctx).code, ResCode::ParamsError);
        assert_eq!(fx.engine().delete_by_filter(&ctx).code, ResCode::ParamsError);
        assert_eq!(fx.row_count(), 4);
    }

    #[test]
    fn test_denied_delete_touches_nothing() {
        let fx = Fixture::seeded_with(|o| o.check_access = true);
        let gate = DenyAll::new("read-only user");
        let engine = fx.engine().with_access_gate(&gate);
        let ctx = fx.ctx().id("g1").build(&fx.options);

        let res = engine.delete_by_id(&ctx);
        assert_eq!(res.code, ResCode::Unauthorized);
        assert!(res.message.contains("read-only user"));
        assert_eq!(fx.row_count(), 4);
        assert!(fx.audit_entries().is_empty());
    }

    #[test]
    fn test_delete_invalidates_cache() {
        let fx = Fixture::seeded();
        let cache = crate::cache::QueryCache::from_seconds(60);
        let engine = fx.engine().with_cache(&cache);

        engine.get_all(&fx.ctx().build(&fx.options));
        assert_eq!(cache.len(), 1);

        engine.delete_by_id(&fx.ctx().id("g3").build(&fx.options));
        assert!(cache.is_empty());
    }
}
