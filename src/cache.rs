use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::debug;

use crate::config::DEFAULT_CACHE_TTL_SECS;
use crate::loader::{load, LoadOptions};
use crate::source::InputSource;
use crate::table::RecordTable;

struct CachedTable {
    table: Arc<RecordTable>,
    loaded_at: Instant,
}

fn cache_key(source: &InputSource, options: &LoadOptions) -> String {
    format!(
        "{}|sep={}|compression={:?}|format={:?}|header={}",
        source.identity(),
        options.separator_for(&source.extension_path()) as char,
        options.compression,
        options.format,
        options.has_header
    )
}

fn evict_expired(entries: &mut HashMap<String, CachedTable>, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.loaded_at.elapsed() < ttl);
    before - entries.len()
}

/// Loaded tables keyed by source identity and parse options, reused until their TTL elapses.
///
/// The cache hands out shared immutable tables; nothing downstream mutates them.
pub struct TableCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedTable>>,
}

impl Default for TableCache {
    fn default() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached table for `source`, loading it when absent or expired.
    /// The same source read with a different separator, compression, format or
    /// header setting is a separate entry. Expired entries are dropped before a
    /// new one is stored. A failed load leaves the cache unchanged.
    pub fn get_or_load(
        &self,
        source: &InputSource,
        options: &LoadOptions,
    ) -> Result<Arc<RecordTable>> {
        let key = cache_key(source, options);
        {
            let entries = self.entries.lock().map_err(|_| eyre!("table cache poisoned"))?;
            if let Some(entry) = entries.get(&key) {
                if entry.loaded_at.elapsed() < self.ttl {
                    debug!(key = %key, "table cache hit");
                    return Ok(Arc::clone(&entry.table));
                }
            }
        }

        debug!(key = %key, "table cache miss");
        let table = Arc::new(load(source, options)?);
        let mut entries = self.entries.lock().map_err(|_| eyre!("table cache poisoned"))?;
        let evicted = evict_expired(&mut entries, self.ttl);
        if evicted > 0 {
            debug!(evicted, "dropped expired tables");
        }
        entries.insert(
            key,
            CachedTable {
                table: Arc::clone(&table),
                loaded_at: Instant::now(),
            },
        );
        Ok(table)
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn invalidate_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        evict_expired(&mut entries, self.ttl)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
