//! Record CLI commands
//!
//! `get`, `save` and `delete` build a task context from flags and hand it to
//! the engine. The engine's envelope is returned as-is for printing.

use clap::Args;

use crate::crud::{CrudEngine, ResponseMessage, TaskContext, TaskContextBuilder};
use crate::error::{CrudError, CrudResult};
use crate::models::{Record, UserInfo};
use crate::query::{Filter, ProjectionSpec, SortSpec};

/// Flags shared by every record command
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Table to operate on
    #[arg(short, long)]
    pub table: String,
    /// Acting user id
    #[arg(short, long, env = "CRUD_AUDIT_USER", default_value = "")]
    pub user: String,
    /// Record id (repeatable)
    #[arg(long = "id")]
    pub ids: Vec<String>,
    /// Filter as JSON: an object of field values, or an array of groups
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments of `get`
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    /// Sort directive `field=asc|desc` (repeatable, in precedence order)
    #[arg(short, long)]
    pub sort: Vec<String>,
    /// Only return these fields (repeatable)
    #[arg(short, long = "project")]
    pub project: Vec<String>,
    /// Return every field except these (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,
    /// Rows to skip
    #[arg(long, default_value = "0")]
    pub skip: u64,
    /// Page size; 0 or anything above the configured maximum uses the maximum
    #[arg(short, long, default_value = "0")]
    pub limit: u64,
}

/// Arguments of `save`
#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    /// Record or array of records as JSON
    pub records: String,
    /// Insert batch size; 0 uses the configured default
    #[arg(long, default_value = "0")]
    pub batch_size: usize,
}

/// Arguments of `delete`
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Run `get`
pub fn handle_get(engine: &CrudEngine<'_>, args: GetArgs) -> CrudResult<ResponseMessage> {
    let mut sort = SortSpec::new();
    for directive in &args.sort {
        let (field, direction) = parse_sort(directive)?;
        sort = sort.by(field, direction);
    }

    let mut projection = ProjectionSpec::new();
    for field in args.project {
        projection = projection.with(field, true);
    }
    for field in args.exclude {
        projection = projection.with(field, false);
    }

    let ctx = selection_builder(args.selection)?
        .sort(sort)
        .projection(projection)
        .skip(args.skip)
        .limit(args.limit)
        .build(engine.options());
    Ok(engine.get_record(&ctx))
}

/// Run `save`
pub fn handle_save(engine: &CrudEngine<'_>, args: SaveArgs) -> CrudResult<ResponseMessage> {
    let payload: serde_json::Value = serde_json::from_str(&args.records)
        .map_err(|e| CrudError::Params(format!("Invalid records JSON: {}", e)))?;
    let records = Record::many_from_json(payload)?;

    let ctx = selection_builder(args.selection)?
        .records(records)
        .batch_size(args.batch_size)
        .build(engine.options());
    Ok(engine.save_record(&ctx))
}

/// Run `delete`
pub fn handle_delete(engine: &CrudEngine<'_>, args: DeleteArgs) -> CrudResult<ResponseMessage> {
    let ctx = selection_builder(args.selection)?.build(engine.options());
    Ok(engine.delete_record(&ctx))
}

fn selection_builder(args: SelectionArgs) -> CrudResult<TaskContextBuilder> {
    let mut builder = TaskContext::builder(args.table, UserInfo::with_id(args.user)).ids(args.ids);
    if let Some(filter) = args.filter {
        builder = builder.filter(parse_filter(&filter)?);
    }
    Ok(builder)
}

/// Parse a filter argument
pub fn parse_filter(s: &str) -> CrudResult<Filter> {
    serde_json::from_str(s).map_err(|e| CrudError::Params(format!("Invalid filter JSON: {}", e)))
}

/// Parse `field=asc|desc|1|-1`; a bare field sorts ascending
pub fn parse_sort(s: &str) -> CrudResult<(String, i64)> {
    let (field, direction) = match s.split_once('=') {
        Some((field, direction)) => (field.trim(), direction.trim()),
        None => (s.trim(), "asc"),
    };
    if field.is_empty() {
        return Err(CrudError::Params(format!("Invalid sort directive: '{}'", s)));
    }
    let flag = match direction.to_lowercase().as_str() {
        "asc" | "1" => 1,
        "desc" | "-1" => -1,
        other => {
            return Err(CrudError::Params(format!(
                "Invalid sort direction '{}'. Valid directions: asc, desc",
                other
            )))
        }
    };
    Ok((field.to_string(), flag))
}
