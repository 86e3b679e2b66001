//! Task classification and target selection

use tracing::debug;

use crate::error::{CrudError, CrudResult};
use crate::models::TaskType;

use super::context::TaskContext;

/// How a save call will be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavePlan {
    Create,
    UpdateById(String),
    UpdateByIds(Vec<String>),
    UpdateByFilter,
    /// Each record updated independently by its own id
    UpdateBatch,
}

/// Which rows a read, update or delete targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    ById(String),
    ByIds(Vec<String>),
    ByFilter,
    /// Every row; reads only
    All,
}

/// Resolve the target rows: single id, then id set, then filter, then
/// (reads only) every row
pub fn select_target(ctx: &TaskContext, task: TaskType) -> CrudResult<Selection> {
    let selection = match ctx.record_ids.as_slice() {
        [id] => Selection::ById(id.clone()),
        [_, _, ..] => Selection::ByIds(ctx.record_ids.clone()),
        [] if !ctx.filter.is_empty() => Selection::ByFilter,
        [] if task == TaskType::Read => Selection::All,
        [] => {
            return Err(CrudError::Params(format!(
                "{} on table {} requires recordIds or a non-empty filter",
                task.as_str(),
                ctx.table
            )))
        }
    };
    debug!(table = %ctx.table, task = %task, ?selection, "target selected");
    Ok(selection)
}

/// Classify a save call as a create or one of the update shapes
pub fn classify_save(ctx: &TaskContext) -> CrudResult<SavePlan> {
    if ctx.action_params.is_empty() {
        return Err(CrudError::Params("actionParams are required to save records".into()));
    }

    let mut with_id = Vec::new();
    let mut without_id = 0usize;
    for record in &ctx.action_params {
        match record.id()? {
            Some(id) => with_id.push(id.to_string()),
            None => without_id += 1,
        }
    }

    if !with_id.is_empty() && without_id > 0 {
        return Err(CrudError::Save(
            "a save call must either create or update records, not both".into(),
        ));
    }

    let single = ctx.action_params.len() == 1;
    let has_selector = !ctx.record_ids.is_empty() || !ctx.filter.is_empty();

    let plan = if single && has_selector {
        match select_target(ctx, TaskType::Update)? {
            Selection::ById(id) => SavePlan::UpdateById(id),
            Selection::ByIds(ids) => SavePlan::UpdateByIds(ids),
            Selection::ByFilter | Selection::All => SavePlan::UpdateByFilter,
        }
    } else if without_id > 0 {
        SavePlan::Create
    } else if single {
        SavePlan::UpdateById(with_id.remove(0))
    } else {
        SavePlan::UpdateBatch
    };

    debug!(table = %ctx.table, ?plan, records = ctx.action_params.len(), "save classified");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrudOptions;
    use crate::models::{FieldValue, UserInfo};
    use crate::query::QueryParam;
    use crate::record;

    fn builder() -> crate::crud::context::TaskContextBuilder {
        TaskContext::builder("groups", UserInfo::with_id("u-1"))
    }

    fn build(b: crate::crud::context::TaskContextBuilder) -> TaskContext {
        b.build(&CrudOptions::default())
    }

    #[test]
    fn test_records_without_ids_create() {
        let ctx = build(builder().records([record! {"name" => "a"}, record! {"name" => "b", "id" => ""}]));
        assert_eq!(classify_save(&ctx).unwrap(), SavePlan::Create);
    }

    #[test]
    fn test_records_with_ids_update() {
        let ctx = build(builder().record(record! {"id" => "g1", "name" => "a"}));
        assert_eq!(classify_save(&ctx).unwrap(), SavePlan::UpdateById("g1".into()));

        let ctx = build(builder().records([record! {"id" => "g1"}, record! {"id" => "g2"}]));
        assert_eq!(classify_save(&ctx).unwrap(), SavePlan::UpdateBatch);
    }

    #[test]
    fn test_mixed_shapes_are_save_error() {
        let ctx = build(builder().records([record! {"id" => "g1"}, record! {"name" => "new"}]));
        assert!(matches!(classify_save(&ctx).unwrap_err(), CrudError::Save(_)));
    }

    #[test]
    fn test_non_text_id_is_params_error() {
        let ctx = build(builder().record(record! {"id" => 7}));
        assert!(classify_save(&ctx).unwrap_err().is_params());
    }

    #[test]
    fn test_single_record_with_context_selectors() {
        let ctx = build(builder().record(record! {"name" => "x"}).ids(["g1", "g2"]));
        assert_eq!(
            classify_save(&ctx).unwrap(),
            SavePlan::UpdateByIds(vec!["g1".into(), "g2".into()])
        );

        let ctx = build(builder().record(record! {"name" => "x"}).filter(QueryParam::new().with("kind", "team")));
        assert_eq!(classify_save(&ctx).unwrap(), SavePlan::UpdateByFilter);
    }

    #[test]
    fn test_empty_payload_is_params_error() {
        assert!(classify_save(&build(builder())).unwrap_err().is_params());
    }

    #[test]
    fn test_selection_precedence() {
        let filter = QueryParam::new().with("name", FieldValue::from("x"));

        let ctx = build(builder().id("a").filter(filter.clone()));
        assert_eq!(select_target(&ctx, TaskType::Delete).unwrap(), Selection::ById("a".into()));

        let ctx = build(builder().ids(["a", "b"]).filter(filter.clone()));
        assert!(matches!(select_target(&ctx, TaskType::Read).unwrap(), Selection::ByIds(_)));

        let ctx = build(builder().filter(filter));
        assert_eq!(select_target(&ctx, TaskType::Update).unwrap(), Selection::ByFilter);

        let ctx = build(builder());
        assert_eq!(select_target(&ctx, TaskType::Read).unwrap(), Selection::All);
        assert!(select_target(&ctx, TaskType::Update).unwrap_err().is_params());
        assert!(select_target(&ctx, TaskType::Delete).unwrap_err().is_params());
    }
}
