//! Query parameter model
//!
//! Typed filters, filter groups, sort and projection specs, and their
//! compilation into parameterized SQL fragments.

pub mod compile;
pub mod params;

pub use compile::{
    compile_filter, compile_groups, compile_params, compile_projection, compile_sort, quote_ident,
    CompiledFilter, SortClause, SortDirection,
};
pub use params::{Filter, FilterGroup, GroupOperator, ProjectionSpec, QueryParam, SortSpec};
