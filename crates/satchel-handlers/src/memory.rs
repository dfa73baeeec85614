//! In-process session handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use satchel::{Handler, Result};
use tracing::debug;

#[derive(Debug, Clone)]
struct Record {
    data: Vec<u8>,
    written_at: Instant,
}

impl Record {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            written_at: Instant::now(),
        }
    }
}

/// Keeps session blobs in memory.
///
/// Clones share the same records, so a second manager built on a clone
/// sees what the first one saved. With a TTL, records older than the TTL
/// read as empty even before GC removes them.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandler {
    records: Arc<RwLock<HashMap<String, Record>>>,
    ttl: Option<Duration>,
}

impl MemoryHandler {
    /// Create an empty handler with no TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty handler whose records expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if there are no stored records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    fn is_expired(&self, record: &Record) -> bool {
        self.ttl
            .is_some_and(|ttl| record.written_at.elapsed() > ttl)
    }
}

impl Handler for MemoryHandler {
    fn init(&self, id: &str) -> Result<()> {
        self.records
            .write()
            .entry(id.to_string())
            .or_insert_with(|| Record::new(Vec::new()));
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        let records = self.records.read();
        Ok(records
            .get(id)
            .filter(|record| !self.is_expired(record))
            .map(|record| record.data.clone())
            .unwrap_or_default())
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        self.records
            .write()
            .insert(id.to_string(), Record::new(data.to_vec()));
        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<()> {
        self.records.write().remove(id);
        Ok(())
    }

    fn gc(&self, max_lifetime: Duration) -> Result<()> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.written_at.elapsed() < max_lifetime);

        let removed = before - records.len();
        if removed > 0 {
            debug!(count = removed, "Removed expired in-memory sessions");
        }
        Ok(())
    }
}
