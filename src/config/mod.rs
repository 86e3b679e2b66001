//! Configuration module for crud-audit
//!
//! - Path resolution for the settings file, database and audit directory
//! - Engine options with documented defaults

pub mod paths;
pub mod settings;

pub use paths::CrudPaths;
pub use settings::{AuditBackend, CrudOptions};
