//! Read operations

use tracing::debug;

use crate::error::{CrudError, CrudResult};
use crate::mapper;
use crate::models::{FieldValue, Record, TaskType};
use crate::query::{compile_projection, compile_sort};
use crate::record;
use crate::storage::SelectQuery;

use super::{envelope, select_target, CrudEngine, GetResult, GetStats, ResponseMessage, ResponseValue, Selection, TaskContext};

impl<'a> CrudEngine<'a> {
    /// Read with the shared selection order: single id, id set, filter, all
    pub fn get_record(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = select_target(ctx, TaskType::Read).and_then(|selection| self.read(ctx, selection));
        read_envelope(result)
    }

    /// Read the single record named by the context's one id
    pub fn get_by_id(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = match ctx.record_ids.as_slice() {
            [id] => self.read(ctx, Selection::ById(id.clone())),
            _ => Err(CrudError::Params("exactly one record id is required".into())),
        };
        read_envelope(result)
    }

    /// Read the records named by the context's ids
    pub fn get_by_ids(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = if ctx.record_ids.is_empty() {
            Err(CrudError::Params("recordIds are required".into()))
        } else {
            self.read(ctx, Selection::ByIds(ctx.record_ids.clone()))
        };
        read_envelope(result)
    }

    /// Read the records matching the context's filter
    pub fn get_by_filter(&self, ctx: &TaskContext) -> ResponseMessage {
        let result = if ctx.filter.is_empty() {
            Err(CrudError::Params("a non-empty filter is required".into()))
        } else {
            self.read(ctx, Selection::ByFilter)
        };
        read_envelope(result)
    }

    /// Read one page of every record in the table
    pub fn get_all(&self, ctx: &TaskContext) -> ResponseMessage {
        read_envelope(self.read(ctx, Selection::All))
    }

    fn read(&self, ctx: &TaskContext, selection: Selection) -> CrudResult<GetResult> {
        self.prepare(TaskType::Read, ctx)?;

        let columns = self.columns(ctx)?;
        let predicate = self.predicate_for(ctx, &selection, &columns)?;
        let order_by = compile_sort(&ctx.sort, &columns)?;
        let projection = compile_projection(&ctx.projection, &columns)?;

        let cache_key = ctx.cache_key();
        let cached = self.cache.and_then(|cache| cache.get(&cache_key));

        let (records, total) = match cached {
            Some(hit) => {
                debug!(table = %ctx.table, "read served from cache");
                hit
            }
            None => {
                let query = SelectQuery {
                    predicate: predicate.clone(),
                    columns: projection,
                    order_by,
                    limit: Some(ctx.limit),
                    offset: ctx.skip,
                };
                let rows = self
                    .store
                    .select(&ctx.table, &query)
                    .map_err(|e| CrudError::Read(e.to_string()))?;
                let total = self
                    .store
                    .count(&ctx.table, predicate.as_ref())
                    .map_err(|e| CrudError::Read(e.to_string()))?;

                let records: Vec<Record> = rows.iter().map(mapper::to_external).collect();
                if let Some(cache) = self.cache {
                    cache.put(cache_key, &ctx.table, records.clone(), total);
                }
                (records, total)
            }
        };

        let log_res = self.audit(TaskType::Read, |recorder| {
            recorder.log_read(&ctx.user.user_id, &ctx.table, read_criteria(ctx, &selection))
        });

        let stats = GetStats {
            skip: ctx.skip,
            limit: ctx.limit,
            records_count: records.len() as u64,
            total_records_count: total,
            filter: (selection == Selection::ByFilter).then(|| ctx.filter.clone()),
            record_ids: match &selection {
                Selection::ById(id) => vec![id.clone()],
                Selection::ByIds(ids) => ids.clone(),
                _ => Vec::new(),
            },
        };

        debug!(table = %ctx.table, returned = stats.records_count, total, "read completed");

        Ok(GetResult {
            records,
            stats,
            task_type: TaskType::Read,
            log_res,
        })
    }
}

/// What a read audit entry records in place of a pre-image
fn read_criteria(ctx: &TaskContext, selection: &Selection) -> Record {
    match selection {
        Selection::ById(id) => record! {"recordIds" => vec![id.clone()]},
        Selection::ByIds(ids) => record! {"recordIds" => ids.clone()},
        Selection::ByFilter => {
            let filter = serde_json::to_value(&ctx.filter)
                .ok()
                .and_then(|v| FieldValue::from_json(v).ok())
                .unwrap_or(FieldValue::Null);
            record! {"queryParams" => filter}
        }
        Selection::All => record! {
            "getType" => "All Records",
            "skip" => ctx.skip as i64,
            "limit" => ctx.limit as i64,
        },
    }
}

fn read_envelope(result: CrudResult<GetResult>) -> ResponseMessage {
    envelope(
        result,
        |get| format!("{} of {} record(s) returned", get.stats.records_count, get.stats.total_records_count),
        ResponseValue::Records,
    )
}

#[cfg(test)]
mod tests {
    use crate::crud::tests::Fixture;
    use crate::crud::ResponseValue;
    use crate::error::ResCode;
    use crate::models::{FieldValue, TaskType};
    use crate::query::{FilterGroup, GroupOperator, ProjectionSpec, QueryParam, SortSpec};

    fn records(res: &crate::crud::ResponseMessage) -> &crate::crud::GetResult {
        match &res.value {
            ResponseValue::Records(get) => get,
            other => panic!("expected records, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_page_reports_stats() {
        let fx = Fixture::seeded();
        let ctx = fx
            .ctx()
            .filter(QueryParam::new().with("name", "services"))
            .limit(10)
            .skip(0)
            .build(&fx.options);

        let res = fx.engine().get_record(&ctx);
        assert_eq!(res.code, ResCode::Success);
        let get = records(&res);
        assert_eq!(get.stats.skip, 0);
        assert_eq!(get.stats.limit, 10);
        assert!(get.stats.total_records_count >= get.stats.records_count);
        assert_eq!(get.records.len(), 1);
        assert_eq!(get.records[0].get("memberCount"), Some(&FieldValue::Int(3)));
    }

    #[test]
    fn test_get_all_paginates_and_counts() {
        let fx = Fixture::seeded();
        let ctx = fx
            .ctx()
            .sort(SortSpec::new().by("memberCount", -1))
            .limit(2)
            .skip(1)
            .build(&fx.options);

        let res = fx.engine().get_all(&ctx);
        let get = records(&res);
        assert_eq!(get.records.len(), 2);
        assert_eq!(get.stats.total_records_count, 4);
        assert_eq!(get.records[0].get("id"), Some(&FieldValue::from("g2")));
    }

    #[test]
    fn test_grouped_filter() {
        let fx = Fixture::seeded();
        let groups = vec![
            FilterGroup::new(QueryParam::new().with("name", "services"), 1, Some(GroupOperator::Or)),
            FilterGroup::new(QueryParam::new().with("kind", "org"), 2, None),
        ];
        let ctx = fx.ctx().filter(groups).build(&fx.options);

        let get_res = fx.engine().get_by_filter(&ctx);
        assert_eq!(records(&get_res).stats.total_records_count, 2);
    }

    #[test]
    fn test_projection_limits_fields() {
        let fx = Fixture::seeded();
        let ctx = fx
            .ctx()
            .id("g1")
            .projection(ProjectionSpec::new().with("name", true))
            .build(&fx.options);

        let res = fx.engine().get_by_id(&ctx);
        let record = &records(&res).records[0];
        assert_eq!(record.len(), 2);
        assert!(record.contains_key("id"));
        assert!(record.contains_key("name"));
    }

    #[test]
    fn test_unknown_filter_field_rejected_before_read() {
        let fx = Fixture::seeded();
        let ctx = fx.ctx().filter(QueryParam::new().with("password", "x")).build(&fx.options);
        let res = fx.engine().get_record(&ctx);
        assert_eq!(res.code, ResCode::ParamsError);
    }

    #[test]
    fn test_model_template_restricts_fields() {
        let fx = Fixture::seeded();
        let model = crate::mapper::ModelTemplate::from_fields(["name", "kind"]);

        let ctx = fx
            .ctx()
            .model(model.clone())
            .filter(QueryParam::new().with("memberCount", 3))
            .build(&fx.options);
        assert_eq!(fx.engine().get_by_filter(&ctx).code, ResCode::ParamsError);

        let ctx = fx
            .ctx()
            .model(model)
            .filter(QueryParam::new().with("kind", "team"))
            .projection(ProjectionSpec::new().with("kind", true))
            .build(&fx.options);
        let res = fx.engine().get_by_filter(&ctx);
        assert_eq!(records(&res).stats.total_records_count, 2);
    }

    #[test]
    fn test_shape_checks() {
        let fx = Fixture::seeded();
        let engine = fx.engine();
        assert_eq!(engine.get_by_id(&fx.ctx().build(&fx.options)).code, ResCode::ParamsError);
        assert_eq!(engine.get_by_ids(&fx.ctx().build(&fx.options)).code, ResCode::ParamsError);
        assert_eq!(engine.get_by_filter(&fx.ctx().build(&fx.options)).code, ResCode::ParamsError);
    }

    #[test]
    fn test_read_logging_respects_flag() {
        let fx = Fixture::seeded();
        let ctx = fx.ctx().ids(["g1", "g2"]).build(&fx.options);

        let res = fx.engine().get_by_ids(&ctx);
        assert!(records(&res).log_res.is_none());
        assert_eq!(fx.audit_count(), 0);

        let fx = Fixture::seeded_with(|o| o.log_read = true);
        let ctx = fx.ctx().ids(["g1", "g2"]).build(&fx.options);
        let res = fx.engine().get_by_ids(&ctx);
        assert!(records(&res).log_res.as_ref().unwrap().is_success());

        let entries = fx.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, TaskType::Read);
        let criteria = entries[0].prior_payload.as_record().unwrap();
        assert!(criteria.contains_key("recordIds"));
    }

    #[test]
    fn test_cache_serves_repeat_reads() {
        let fx = Fixture::seeded();
        let cache = crate::cache::QueryCache::from_seconds(60);
        let engine = fx.engine().with_cache(&cache);
        let ctx = fx.ctx().build(&fx.options);

        let first = engine.get_all(&ctx);
        assert_eq!(records(&first).stats.total_records_count, 4);
        assert_eq!(cache.len(), 1);

        // A write behind the engine's back is not seen until the page expires
        fx.store
            .execute_batch("INSERT INTO groups (id, name) VALUES ('g9', 'hidden');")
            .unwrap();
        let second = engine.get_all(&ctx);
        assert_eq!(records(&second).stats.total_records_count, 4);
    }
}
