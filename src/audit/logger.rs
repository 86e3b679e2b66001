//! File-backed audit store
//!
//! Writes audit entries as line-delimited JSON (JSONL), one file per audit
//! table under a base directory. Each entry is flushed immediately.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{CrudError, CrudResult};
use crate::storage::{AuditStore, StoreError};

use super::entry::AuditEntry;

/// Audit store appending entries to `<dir>/<audit_table>.jsonl`
pub struct JsonlAuditStore {
    dir: PathBuf,
    /// Serializes appends from concurrent engine calls
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    /// Create a store writing under `dir`
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the log file for an audit table
    pub fn log_path(&self, audit_table: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", audit_table))
    }

    /// Read all entries of an audit table, oldest first
    pub fn read_all(&self, audit_table: &str) -> CrudResult<Vec<AuditEntry>> {
        let path = self.log_path(audit_table);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)
            .map_err(|e| CrudError::Io(format!("Failed to open audit log: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                CrudError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                CrudError::Io(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Read the most recent `count` entries, oldest first
    pub fn read_recent(&self, audit_table: &str, count: usize) -> CrudResult<Vec<AuditEntry>> {
        let mut all_entries = self.read_all(audit_table)?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries.split_off(start))
    }

    /// Number of entries in an audit table's log
    pub fn entry_count(&self, audit_table: &str) -> CrudResult<usize> {
        let path = self.log_path(audit_table);
        if !path.exists() {
            return Ok(0);
        }

        let file = File::open(&path)
            .map_err(|e| CrudError::Io(format!("Failed to open audit log: {}", e)))?;

        let count = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|l| !l.trim().is_empty())
            .count();

        Ok(count)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AuditStore for JsonlAuditStore {
    fn append(&self, audit_table: &str, entry: &AuditEntry) -> Result<u64, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;

        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string(entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(audit_table))?;

        writeln!(file, "{}", json)?;
        file.flush()?;

        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, TaskType};
    use crate::record;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonlAuditStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlAuditStore::new(temp_dir.path().join("audit"));
        (store, temp_dir)
    }

    fn entry(i: usize) -> AuditEntry {
        AuditEntry::new(
            TaskType::Create,
            "groups",
            "u-1",
            FieldValue::from(vec![record! {"id" => format!("g{}", i)}]),
            None,
        )
    }

    #[test]
    fn test_append_and_read() {
        let (store, _temp) = create_test_store();

        assert_eq!(store.append("audits", &entry(0)).unwrap(), 1);

        let entries = store.read_all("audits").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, TaskType::Create);
        assert_eq!(entries[0].table_name, "groups");
    }

    #[test]
    fn test_one_file_per_audit_table() {
        let (store, _temp) = create_test_store();

        store.append("audits", &entry(0)).unwrap();
        store.append("trail", &entry(1)).unwrap();
        store.append("trail", &entry(2)).unwrap();

        assert_eq!(store.entry_count("audits").unwrap(), 1);
        assert_eq!(store.entry_count("trail").unwrap(), 2);
        assert!(store.log_path("trail").exists());
    }

    #[test]
    fn test_read_recent() {
        let (store, _temp) = create_test_store();
        let written: Vec<AuditEntry> = (0..10).map(entry).collect();
        for e in &written {
            store.append("audits", e).unwrap();
        }

        let recent = store.read_recent("audits", 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, written[7].id);
        assert_eq!(recent[2].id, written[9].id);
    }

    #[test]
    fn test_empty_log() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.entry_count("audits").unwrap(), 0);
        assert!(store.read_all("audits").unwrap().is_empty());
    }

    #[test]
    fn test_survives_restart() {
        let (store, temp) = create_test_store();
        store.append("audits", &entry(0)).unwrap();

        let reopened = JsonlAuditStore::new(temp.path().join("audit"));
        assert_eq!(reopened.read_all("audits").unwrap().len(), 1);
    }
}
