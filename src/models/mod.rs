//! Core data models for crud-audit
//!
//! Generic records and field values, task kinds and caller identity.

pub mod task;
pub mod value;

pub use task::{TaskType, UserInfo};
pub use value::{FieldValue, Record, ID_FIELD};
