//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the CRUD engine.

pub mod audit;
pub mod record;

pub use audit::{handle_audit_command, AuditCommands, AuditOutput, AuditSource};
pub use record::{handle_delete, handle_get, handle_save, DeleteArgs, GetArgs, SaveArgs, SelectionArgs};
