//! Filter, sort and projection compilation
//!
//! Produces a positional-parameter SQL fragment plus the bound values in
//! order. Every field name is mapped to internal form and checked against the
//! legal columns of the target table before it is quoted into the fragment.

use std::collections::BTreeSet;

use crate::error::{CrudError, CrudResult};
use crate::mapper;
use crate::models::{FieldValue, ID_FIELD};

use super::params::{Filter, FilterGroup, GroupOperator, ProjectionSpec, QueryParam, SortSpec};

/// Quote an identifier for use in SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A compiled predicate: `fragment` uses `?` placeholders bound from `params`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub fragment: String,
    /// Internal field names referenced, in order of appearance
    pub fields: Vec<String>,
    pub params: Vec<FieldValue>,
}

impl CompiledFilter {
    /// `id = ?`
    pub fn by_id(id: &str) -> Self {
        Self {
            fragment: format!("{} = ?", quote_ident(ID_FIELD)),
            fields: vec![ID_FIELD.to_string()],
            params: vec![FieldValue::from(id)],
        }
    }

    /// `id IN (?, ...)`; an empty set matches nothing
    pub fn by_ids(ids: &[String]) -> Self {
        let mut compiled = Self {
            fields: vec![ID_FIELD.to_string()],
            ..Self::default()
        };
        compiled.fragment = inclusion(ID_FIELD, ids.len());
        compiled.params = ids.iter().map(|id| FieldValue::from(id.as_str())).collect();
        compiled
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }
}

/// Sort direction of one order-by clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_flag(flag: i64) -> CrudResult<Self> {
        match flag {
            1 => Ok(SortDirection::Asc),
            -1 => Ok(SortDirection::Desc),
            other => Err(CrudError::Params(format!(
                "Invalid sort direction {} (expected 1 or -1)",
                other
            ))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One compiled order-by clause over an internal column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub column: String,
    pub direction: SortDirection,
}

impl SortClause {
    pub fn to_sql(&self) -> String {
        format!("{} {}", quote_ident(&self.column), self.direction.as_sql())
    }
}

fn inclusion(column: &str, len: usize) -> String {
    if len == 0 {
        return "0 = 1".to_string();
    }
    let placeholders = vec!["?"; len].join(", ");
    format!("{} IN ({})", quote_ident(column), placeholders)
}

fn internal_column(name: &str, columns: &BTreeSet<String>) -> CrudResult<String> {
    let column = mapper::field_to_internal(name).map_err(|e| CrudError::Params(e.message().to_string()))?;
    if !columns.contains(&column) {
        return Err(CrudError::Params(format!("Unknown field: {}", name)));
    }
    Ok(column)
}

/// Compile a flat filter into an AND-combined predicate
pub fn compile_params(query: &QueryParam, columns: &BTreeSet<String>) -> CrudResult<CompiledFilter> {
    let mut compiled = CompiledFilter::default();
    let mut conditions = Vec::with_capacity(query.len());

    for (name, value) in query.iter() {
        let column = internal_column(name, columns)?;
        match value {
            FieldValue::Null => {
                conditions.push(format!("{} IS NULL", quote_ident(&column)));
            }
            FieldValue::List(items) => {
                if let Some(bad) = items
                    .iter()
                    .find(|v| matches!(v, FieldValue::List(_) | FieldValue::Record(_) | FieldValue::Null))
                {
                    return Err(CrudError::Params(format!(
                        "Field {} lists a {} value; only scalars may be listed",
                        name,
                        bad.kind()
                    )));
                }
                conditions.push(inclusion(&column, items.len()));
                compiled.params.extend(items.iter().cloned());
            }
            FieldValue::Record(_) => {
                return Err(CrudError::Params(format!(
                    "Field {} holds a record; filters compare scalars or lists only",
                    name
                )));
            }
            scalar => {
                conditions.push(format!("{} = ?", quote_ident(&column)));
                compiled.params.push(scalar.clone());
            }
        }
        compiled.fields.push(column);
    }

    compiled.fragment = conditions.join(" AND ");
    Ok(compiled)
}

/// Compile ordered filter groups
///
/// Groups are applied in ascending `order`; each group's operator links it to
/// the next one. Empty groups are skipped.
pub fn compile_groups(groups: &[FilterGroup], columns: &BTreeSet<String>) -> CrudResult<CompiledFilter> {
    let mut ordered: Vec<&FilterGroup> = groups.iter().filter(|g| !g.query.is_empty()).collect();
    ordered.sort_by_key(|g| g.order);

    let mut compiled = CompiledFilter::default();
    let mut link: Option<GroupOperator> = None;

    for group in ordered {
        let part = compile_params(&group.query, columns)?;
        if let Some(op) = link {
            compiled.fragment.push_str(&format!(" {} ", op.as_sql()));
        }
        compiled.fragment.push_str(&format!("({})", part.fragment));
        compiled.fields.extend(part.fields);
        compiled.params.extend(part.params);
        link = Some(group.operator.unwrap_or_default());
    }

    Ok(compiled)
}

/// Compile either filter shape
pub fn compile_filter(filter: &Filter, columns: &BTreeSet<String>) -> CrudResult<CompiledFilter> {
    match filter {
        Filter::Flat(query) => compile_params(query, columns),
        Filter::Grouped(groups) => compile_groups(groups, columns),
    }
}

/// Compile sort directives in precedence order
pub fn compile_sort(sort: &SortSpec, columns: &BTreeSet<String>) -> CrudResult<Vec<SortClause>> {
    sort.iter()
        .map(|(name, flag)| {
            Ok(SortClause {
                column: internal_column(name, columns)?,
                direction: SortDirection::from_flag(*flag)?,
            })
        })
        .collect()
}

/// Resolve a projection to the internal columns to select
///
/// `None` selects every column. Inclusion flags select exactly those fields
/// plus `id`; a projection holding only exclusions selects all remaining columns.
pub fn compile_projection(
    projection: &ProjectionSpec,
    columns: &BTreeSet<String>,
) -> CrudResult<Option<Vec<String>>> {
    if projection.is_empty() {
        return Ok(None);
    }

    let mut included = BTreeSet::new();
    let mut excluded = BTreeSet::new();
    for (name, include) in projection.iter() {
        let column = internal_column(name, columns)?;
        if *include {
            included.insert(column);
        } else {
            excluded.insert(column);
        }
    }

    let selected: Vec<String> = if included.is_empty() {
        columns.iter().filter(|c| !excluded.contains(*c)).cloned().collect()
    } else {
        if columns.contains(ID_FIELD) {
            included.insert(ID_FIELD.to_string());
        }
        included.into_iter().collect()
    };

    if selected.is_empty() {
        return Err(CrudError::Params("Projection excludes every field".into()));
    }
    Ok(Some(selected))
}
