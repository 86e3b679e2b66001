//! Locations of the settings file, the record database and the audit directory
//!
//! The root is taken from `CRUD_AUDIT_DATA_DIR` when set, otherwise from the
//! platform configuration directory (`~/.config/crud-audit` on Linux).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::CrudError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "CRUD_AUDIT_DATA_DIR";

const SETTINGS_FILE: &str = "config.json";
const DATABASE_FILE: &str = "records.db";
const AUDIT_DIR: &str = "audit";

#[derive(Debug, Clone)]
pub struct CrudPaths {
    root: PathBuf,
}

impl CrudPaths {
    /// Resolve the root from the environment or the platform directories
    pub fn new() -> Result<Self, CrudError> {
        let root = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "crud-audit")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    CrudError::Config(format!(
                        "no configuration directory available; set {}",
                        DATA_DIR_ENV
                    ))
                })?,
        };
        Ok(Self { root })
    }

    pub fn with_base_dir(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// SQLite file holding application tables and the audit table
    pub fn database_file(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// JSONL files of the file audit backend, one per audit table
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join(AUDIT_DIR)
    }

    pub fn ensure_directories(&self) -> Result<(), CrudError> {
        for dir in [self.root.clone(), self.audit_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| CrudError::Io(format!("cannot create {}: {}", dir.display(), e)))?;
        }
        Ok(())
    }
}
