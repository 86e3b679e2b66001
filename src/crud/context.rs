//! Per-call task context
//!
//! Owned by exactly one engine invocation; built fresh for every call.

use crate::config::CrudOptions;
use crate::mapper::ModelTemplate;
use crate::models::{Record, UserInfo};
use crate::query::{Filter, ProjectionSpec, SortSpec};

/// Table, identity, payload, selectors and pagination of one task
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub table: String,
    pub user: UserInfo,
    /// Action payload in external naming
    pub action_params: Vec<Record>,
    pub record_ids: Vec<String>,
    pub filter: Filter,
    pub sort: SortSpec,
    pub projection: ProjectionSpec,
    pub skip: u64,
    /// Already clamped to `1..=max_query_limit`
    pub limit: u64,
    pub batch_size: usize,
    pub model: Option<ModelTemplate>,
}

impl TaskContext {
    pub fn builder(table: impl Into<String>, user: UserInfo) -> TaskContextBuilder {
        TaskContextBuilder {
            table: table.into(),
            user,
            action_params: Vec::new(),
            record_ids: Vec::new(),
            filter: Filter::default(),
            sort: SortSpec::default(),
            projection: ProjectionSpec::default(),
            skip: 0,
            limit: 0,
            batch_size: 0,
            model: None,
        }
    }

    /// Key identifying the shape of a read for the query cache
    pub fn cache_key(&self) -> String {
        let shape = (
            &self.table,
            &self.filter,
            &self.sort,
            &self.projection,
            &self.record_ids,
            self.skip,
            self.limit,
        );
        serde_json::to_string(&shape).unwrap_or_default()
    }
}

/// Builder for [`TaskContext`]
#[derive(Debug, Clone)]
pub struct TaskContextBuilder {
    table: String,
    user: UserInfo,
    action_params: Vec<Record>,
    record_ids: Vec<String>,
    filter: Filter,
    sort: SortSpec,
    projection: ProjectionSpec,
    skip: u64,
    limit: u64,
    batch_size: usize,
    model: Option<ModelTemplate>,
}

impl TaskContextBuilder {
    pub fn record(mut self, record: Record) -> Self {
        self.action_params.push(record);
        self
    }

    pub fn records(mut self, records: impl IntoIterator<Item = Record>) -> Self {
        self.action_params.extend(records);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.record_ids.push(id.into());
        self
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn projection(mut self, projection: ProjectionSpec) -> Self {
        self.projection = projection;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn model(mut self, model: ModelTemplate) -> Self {
        self.model = Some(model);
        self
    }

    /// Resolve defaults and limits against the engine options
    pub fn build(self, options: &CrudOptions) -> TaskContext {
        let mut record_ids: Vec<String> = Vec::with_capacity(self.record_ids.len());
        for id in self.record_ids {
            let id = id.trim().to_string();
            if !id.is_empty() && !record_ids.contains(&id) {
                record_ids.push(id);
            }
        }

        let limit = if self.limit == 0 || self.limit > options.max_query_limit {
            options.max_query_limit
        } else {
            self.limit
        };

        let batch_size = if self.batch_size == 0 {
            options.batch_size
        } else {
            self.batch_size
        };

        TaskContext {
            table: self.table,
            user: self.user,
            action_params: self.action_params,
            record_ids,
            filter: self.filter,
            sort: self.sort,
            projection: self.projection,
            skip: self.skip,
            limit,
            batch_size,
            model: self.model,
        }
    }
}
