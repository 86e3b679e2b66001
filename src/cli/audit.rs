//! Audit CLI commands
//!
//! Shows recent audit entries from whichever backend is configured, and
//! records login/logout sessions through the engine.

use clap::Subcommand;

use crate::audit::{AuditEntry, JsonlAuditStore};
use crate::crud::{CrudEngine, ResponseMessage};
use crate::error::{CrudError, CrudResult};
use crate::models::{Record, UserInfo};
use crate::storage::SqliteStore;

/// Audit subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AuditCommands {
    /// Show the most recent audit entries
    Recent {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
        /// Print entries as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Count the entries of the audit trail
    Count,
    /// Record a login
    Login {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Session details as a JSON object
        #[arg(short, long, default_value = "{}")]
        session: String,
    },
    /// Record a logout
    Logout {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Session details as a JSON object
        #[arg(short, long, default_value = "{}")]
        session: String,
    },
}

/// Where audit entries are read back from
pub enum AuditSource<'a> {
    Database(&'a SqliteStore),
    File(&'a JsonlAuditStore),
}

impl AuditSource<'_> {
    /// The last `count` entries of an audit table, oldest first
    pub fn recent(&self, audit_table: &str, count: usize) -> CrudResult<Vec<AuditEntry>> {
        match self {
            AuditSource::Database(store) => store
                .recent_audit_entries(audit_table, count)
                .map_err(|e| CrudError::Read(e.to_string())),
            AuditSource::File(store) => store.read_recent(audit_table, count),
        }
    }

    pub fn count(&self, audit_table: &str) -> CrudResult<usize> {
        match self {
            AuditSource::Database(store) => store
                .audit_entry_count(audit_table)
                .map_err(|e| CrudError::Read(e.to_string())),
            AuditSource::File(store) => store.entry_count(audit_table),
        }
    }
}

/// What an audit command produced
pub enum AuditOutput {
    /// Lines to print as-is
    Lines(Vec<String>),
    /// An engine envelope
    Envelope(ResponseMessage),
}

/// Handle an audit command
pub fn handle_audit_command(
    engine: &CrudEngine<'_>,
    source: &AuditSource<'_>,
    cmd: AuditCommands,
) -> CrudResult<AuditOutput> {
    match cmd {
        AuditCommands::Recent { count, json } => {
            let entries = source.recent(&engine.options().audit_table, count)?;
            if entries.is_empty() {
                return Ok(AuditOutput::Lines(vec!["No audit entries found.".to_string()]));
            }
            let lines = entries
                .iter()
                .map(|entry| {
                    if json {
                        serde_json::to_string(entry).map_err(CrudError::from)
                    } else {
                        Ok(entry.format_human_readable())
                    }
                })
                .collect::<CrudResult<Vec<_>>>()?;
            Ok(AuditOutput::Lines(lines))
        }
        AuditCommands::Count => {
            let audit_table = &engine.options().audit_table;
            let count = source.count(audit_table)?;
            Ok(AuditOutput::Lines(vec![format!("{} entries in {}", count, audit_table)]))
        }
        AuditCommands::Login { user, session } => {
            let session = parse_session(&session)?;
            Ok(AuditOutput::Envelope(engine.log_login(&UserInfo::with_id(user), session)))
        }
        AuditCommands::Logout { user, session } => {
            let session = parse_session(&session)?;
            Ok(AuditOutput::Envelope(engine.log_logout(&UserInfo::with_id(user), session)))
        }
    }
}

fn parse_session(s: &str) -> CrudResult<Record> {
    let value: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| CrudError::Params(format!("Invalid session JSON: {}", e)))?;
    Record::from_json(value)
}
