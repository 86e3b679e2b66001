//! Field mapper
//!
//! The only translator between the external (mixed-case) and internal
//! (underscore-case) views of a [`Record`]. Also extracts field names and
//! checks them against the legal columns of a table before they reach the
//! storage layer.

mod case;

use std::collections::BTreeSet;

pub use case::{camel_to_snake, is_well_formed, snake_to_camel};

use crate::error::{CrudError, CrudResult};
use crate::models::{FieldValue, Record};

/// Convert one external field name to its internal form
pub fn field_to_internal(name: &str) -> CrudResult<String> {
    if !is_well_formed(name) {
        return Err(CrudError::Mapping(format!("malformed field name: {:?}", name)));
    }
    Ok(camel_to_snake(name))
}

/// Rewrite every top-level field name of an external record to internal form
///
/// Nested values are carried over untouched. Two external names that collapse
/// onto the same internal name are rejected.
pub fn to_internal(record: &Record) -> CrudResult<Record> {
    let mut internal = Record::new();
    for (name, value) in record.iter() {
        let mapped = field_to_internal(name)?;
        if internal.contains_key(&mapped) {
            return Err(CrudError::Mapping(format!(
                "more than one field maps to `{}`",
                mapped
            )));
        }
        internal.insert(mapped, value.clone());
    }
    Ok(internal)
}

/// Rewrite every top-level field name of an internal record to external form
pub fn to_external(record: &Record) -> Record {
    record
        .iter()
        .map(|(name, value)| (snake_to_camel(name), value.clone()))
        .collect()
}

/// Field names of a record, in order
pub fn fields_of(record: &Record) -> BTreeSet<String> {
    record.keys().cloned().collect()
}

/// Fail with a params error naming every field not in `columns`
pub fn ensure_known_fields<'f, I>(fields: I, columns: &BTreeSet<String>, table: &str) -> CrudResult<()>
where
    I: IntoIterator<Item = &'f String>,
{
    let unknown: Vec<&str> = fields
        .into_iter()
        .filter(|f| !columns.contains(*f))
        .map(String::as_str)
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CrudError::Params(format!(
            "Unknown field(s) for table {}: {}",
            table,
            unknown.join(", ")
        )))
    }
}

/// The field layout of a table, declared in external naming
///
/// Used to validate filter, sort, projection and payload field names without
/// asking the storage layer for its columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTemplate {
    fields: Record,
}

impl ModelTemplate {
    /// Template from a sample record (values are ignored)
    pub fn new(fields: Record) -> Self {
        Self { fields }
    }

    /// Template from a list of external field names
    pub fn from_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: names
                .into_iter()
                .map(|n| (n.into(), FieldValue::Null))
                .collect(),
        }
    }

    /// Legal internal column names
    pub fn columns(&self) -> CrudResult<BTreeSet<String>> {
        Ok(fields_of(&to_internal(&self.fields)?))
    }
}
