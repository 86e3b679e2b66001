//! Engine options for crud-audit
//!
//! Holds query limits, cache expiry, per-task audit toggles, the access-check
//! switch and the names of the service tables. Every field has a documented
//! default so a missing or partial `config.json` still yields usable options.

use serde::{Deserialize, Serialize};

use super::paths::CrudPaths;
use crate::error::CrudError;
use crate::models::TaskType;
use crate::storage::file_io::{read_json, write_json_atomic};

/// Where audit entries are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
    /// Audit table inside the record database (default)
    #[default]
    Database,
    /// One JSON-lines file per audit table
    File,
}

/// Options recognized by the CRUD engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudOptions {
    /// Upper bound applied to every read page
    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: u64,

    /// Lifetime of cached read pages, in seconds
    #[serde(default = "default_cache_expire_seconds")]
    pub cache_expire_seconds: u64,

    /// Rows per insert batch when creating records
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_true")]
    pub log_create: bool,

    #[serde(default)]
    pub log_read: bool,

    #[serde(default = "default_true")]
    pub log_update: bool,

    #[serde(default = "default_true")]
    pub log_delete: bool,

    #[serde(default = "default_true")]
    pub log_login: bool,

    #[serde(default = "default_true")]
    pub log_logout: bool,

    /// Route every task through the access gate
    #[serde(default)]
    pub check_access: bool,

    #[serde(default = "default_audit_table")]
    pub audit_table: String,

    #[serde(default = "default_access_table")]
    pub access_table: String,

    #[serde(default = "default_role_table")]
    pub role_table: String,

    #[serde(default = "default_user_table")]
    pub user_table: String,

    #[serde(default = "default_profile_table")]
    pub profile_table: String,

    #[serde(default = "default_service_table")]
    pub service_table: String,

    #[serde(default)]
    pub audit_backend: AuditBackend,
}

fn default_max_query_limit() -> u64 {
    10_000
}

fn default_cache_expire_seconds() -> u64 {
    300
}

fn default_batch_size() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_audit_table() -> String {
    "audits".to_string()
}

fn default_access_table() -> String {
    "accesses".to_string()
}

fn default_role_table() -> String {
    "roles".to_string()
}

fn default_user_table() -> String {
    "users".to_string()
}

fn default_profile_table() -> String {
    "profiles".to_string()
}

fn default_service_table() -> String {
    "services".to_string()
}

impl Default for CrudOptions {
    fn default() -> Self {
        Self {
            max_query_limit: default_max_query_limit(),
            cache_expire_seconds: default_cache_expire_seconds(),
            batch_size: default_batch_size(),
            log_create: true,
            log_read: false,
            log_update: true,
            log_delete: true,
            log_login: true,
            log_logout: true,
            check_access: false,
            audit_table: default_audit_table(),
            access_table: default_access_table(),
            role_table: default_role_table(),
            user_table: default_user_table(),
            profile_table: default_profile_table(),
            service_table: default_service_table(),
            audit_backend: AuditBackend::default(),
        }
    }
}

impl CrudOptions {
    /// Whether audit logging is switched on for a task kind
    pub fn logs(&self, task: TaskType) -> bool {
        match task {
            TaskType::Create => self.log_create,
            TaskType::Read => self.log_read,
            TaskType::Update => self.log_update,
            TaskType::Delete => self.log_delete,
            TaskType::Login => self.log_login,
            TaskType::Logout => self.log_logout,
        }
    }

    /// Enable or disable every audit toggle at once
    pub fn with_all_logging(mut self, enabled: bool) -> Self {
        self.log_create = enabled;
        self.log_read = enabled;
        self.log_update = enabled;
        self.log_delete = enabled;
        self.log_login = enabled;
        self.log_logout = enabled;
        self
    }

    /// Reject option values the engine cannot work with
    pub fn validate(&self) -> Result<(), CrudError> {
        if self.max_query_limit == 0 {
            return Err(CrudError::Config("maxQueryLimit must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(CrudError::Config("batchSize must be positive".into()));
        }
        let tables = [
            ("auditTable", &self.audit_table),
            ("accessTable", &self.access_table),
            ("roleTable", &self.role_table),
            ("userTable", &self.user_table),
            ("profileTable", &self.profile_table),
            ("serviceTable", &self.service_table),
        ];
        for (key, name) in tables {
            if name.trim().is_empty() {
                return Err(CrudError::Config(format!("{} cannot be empty", key)));
            }
        }
        Ok(())
    }

    /// Load options from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &CrudPaths) -> Result<Self, CrudError> {
        match read_json::<CrudOptions, _>(paths.settings_file())? {
            Some(options) => {
                options.validate()?;
                Ok(options)
            }
            None => Ok(CrudOptions::default()),
        }
    }

    /// Save options to disk
    pub fn save(&self, paths: &CrudPaths) -> Result<(), CrudError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_options() {
        let options = CrudOptions::default();
        assert_eq!(options.max_query_limit, 10_000);
        assert_eq!(options.cache_expire_seconds, 300);
        assert_eq!(options.audit_table, "audits");
        assert_eq!(options.service_table, "services");
        assert!(options.logs(TaskType::Update));
        assert!(!options.logs(TaskType::Read));
        assert!(!options.check_access);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let options: CrudOptions =
            serde_json::from_str(r#"{"maxQueryLimit": 50, "logRead": true}"#).unwrap();
        assert_eq!(options.max_query_limit, 50);
        assert!(options.log_read);
        assert!(options.log_delete);
        assert_eq!(options.role_table, "roles");
        assert_eq!(options.audit_backend, AuditBackend::Database);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CrudPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut options = CrudOptions::default();
        options.audit_table = "trail".into();
        options.audit_backend = AuditBackend::File;
        options.save(&paths).unwrap();

        let loaded = CrudOptions::load_or_create(&paths).unwrap();
        assert_eq!(loaded.audit_table, "trail");
        assert_eq!(loaded.audit_backend, AuditBackend::File);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CrudPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        std::fs::write(paths.settings_file(), r#"{"maxQueryLimit": 0}"#).unwrap();

        let err = CrudOptions::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, CrudError::Config(_)));
    }

    #[test]
    fn test_with_all_logging() {
        let options = CrudOptions::default().with_all_logging(false);
        for task in TaskType::ALL {
            assert!(!options.logs(task));
        }
    }
}
