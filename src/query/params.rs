//! Typed query parameters: filters, filter groups, sort and projection specs
//!
//! Field names in filters, sorts and projections are external (mixed-case)
//! names; compilation maps them to internal columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::FieldValue;

/// Flat filter: field -> scalar (equality) or list (inclusion), AND-combined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParam(BTreeMap<String, FieldValue>);

impl QueryParam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

/// Boolean combinator linking a filter group to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupOperator {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

impl GroupOperator {
    pub fn as_sql(self) -> &'static str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }
}

/// One group of an ordered filter-group list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub query: QueryParam,
    #[serde(default)]
    pub order: i32,
    /// Relationship to the next group; ignored on the last group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<GroupOperator>,
}

impl FilterGroup {
    pub fn new(query: QueryParam, order: i32, operator: Option<GroupOperator>) -> Self {
        Self {
            query,
            order,
            operator,
        }
    }
}

/// Target-selection filter of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Flat(QueryParam),
    Grouped(Vec<FilterGroup>),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Flat(QueryParam::default())
    }
}

impl Filter {
    /// True when the filter contains no predicate at all
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Flat(q) => q.is_empty(),
            Filter::Grouped(groups) => groups.iter().all(|g| g.query.is_empty()),
        }
    }
}

impl From<QueryParam> for Filter {
    fn from(q: QueryParam) -> Self {
        Filter::Flat(q)
    }
}

impl From<Vec<FilterGroup>> for Filter {
    fn from(groups: Vec<FilterGroup>) -> Self {
        Filter::Grouped(groups)
    }
}

/// Sort directives in precedence order: 1 ascending, -1 descending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<(String, i64)>);

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(mut self, field: impl Into<String>, direction: i64) -> Self {
        self.0.push((field.into(), direction));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, i64)> {
        self.0.iter()
    }
}

/// Field -> inclusion flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionSpec(BTreeMap<String, bool>);

impl ProjectionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, include: bool) -> Self {
        self.0.insert(field.into(), include);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &bool)> {
        self.0.iter()
    }
}
