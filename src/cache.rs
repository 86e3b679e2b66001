//! Optional read cache
//!
//! Pages are keyed by the shape of the read and expire after a fixed TTL.
//! The cache is never authoritative: any successful mutation of a table drops
//! every cached page of that table.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::CrudOptions;
use crate::models::Record;

#[derive(Debug, Clone)]
struct CachedPage {
    table: String,
    stored_at: Instant,
    records: Vec<Record>,
    total: u64,
}

/// Time-limited cache of read pages
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedPage>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }

    /// Cache expiring after `cache_expire_seconds`; zero disables it
    pub fn from_options(options: &CrudOptions) -> Self {
        Self::from_seconds(options.cache_expire_seconds)
    }

    /// A fresh cached page and its total count
    pub fn get(&self, key: &str) -> Option<(Vec<Record>, u64)> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(page) if page.stored_at.elapsed() < self.ttl => {
                Some((page.records.clone(), page.total))
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, table: &str, records: Vec<Record>, total: u64) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, page| page.stored_at.elapsed() < ttl);
            entries.insert(
                key,
                CachedPage {
                    table: table.to_string(),
                    stored_at: Instant::now(),
                    records,
                    total,
                },
            );
        }
    }

    /// Drop every cached page of a table
    pub fn invalidate_table(&self, table: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            let before = entries.len();
            entries.retain(|_, page| page.table != table);
            debug!(table, dropped = before - entries.len(), "cache invalidated");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
