// series::mod.rs
// > Series Table Store
//
// series name -> { latest part number, last update timestamp }, persisted as
// one JSON file. Every mutation rewrites the whole table through
// comm_fs::safe_replace; every read runs comm_fs::recover_replaced first.
//
// Keys are opaque here, normalization is done by the caller
// (naming::normalize_series_key).
pub mod display;

use crate::comm::{get_sn_now_epoch_f64, SnEpochF64, SnRst};
use crate::comm_fs;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    // last-used part number
    pub number: u64,
    // epoch seconds of the last write, only used for display ordering
    pub timestamp: SnEpochF64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesTable {
    entries: BTreeMap<String, SeriesEntry>,
}

impl SeriesTable {
    pub fn get(&self, key: &str) -> Option<&SeriesEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: &str, entry: SeriesEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn into_entries(self) -> Vec<(String, SeriesEntry)> {
        self.entries.into_iter().collect()
    }

    fn to_bytes(&self) -> SnRst<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| Error::ParsingFailed(format!("failed to serialize series table, e={}", e)))
    }
}

/// Handle on the persisted series table.
///
/// Mutating operations take `&mut self`, and the handle is not `Clone`, so a
/// handle has one writer. Nothing stops a second handle on the same file:
/// callers keep one per file, across processes too.
#[derive(Debug)]
pub struct SeriesStore {
    series_path: PathBuf,
}

impl SeriesStore {
    pub fn new<P: Into<PathBuf>>(series_path: P) -> Self {
        SeriesStore {
            series_path: series_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.series_path
    }

    /// Writes an empty table at `series_path` unless a file (or an
    /// interrupted-replace backup) is already there. Returns `true` when a
    /// new file was created.
    pub fn create<P: Into<PathBuf>>(series_path: P) -> SnRst<(Self, bool)> {
        let store = SeriesStore::new(series_path);

        comm_fs::recover_replaced(&store.series_path)?;

        if store.series_path.exists() {
            return Ok((store, false));
        }

        if let Some(parent) = store.series_path.parent() {
            if !parent.as_os_str().is_empty() {
                comm_fs::create_dir_sync(&parent)?;
            }
        }

        comm_fs::create_new_file(&store.series_path, &SeriesTable::default().to_bytes()?)?;

        log::info!(
            "[SeriesStore::create] created empty series table, path={}",
            store.series_path.display()
        );

        Ok((store, true))
    }

    //
    // read
    //

    pub fn load_table(&self) -> SnRst<SeriesTable> {
        comm_fs::recover_replaced(&self.series_path)?;

        let bytes = std::fs::read(&self.series_path).map_err(|e| {
            Error::StoreUnavailable(format!(
                "failed to read series table, path={}, e={}",
                self.series_path.display(),
                e
            ))
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::StoreUnavailable(format!(
                "failed to parse series table, path={}, e={}",
                self.series_path.display(),
                e
            ))
        })
    }

    /// Every entry currently persisted.
    pub fn get_series(&self) -> SnRst<Vec<(String, SeriesEntry)>> {
        Ok(self.load_table()?.into_entries())
    }

    /// Never seeds a missing key.
    pub fn lookup(&self, key: &str) -> SnRst<Option<SeriesEntry>> {
        Ok(self.load_table()?.get(key).copied())
    }

    //
    // write
    //

    fn persist(&mut self, table: &SeriesTable) -> SnRst<()> {
        comm_fs::safe_replace(&self.series_path, &table.to_bytes()?)
    }

    /// Get-or-insert. Returns the latest number of `key`; when `key` is
    /// absent it is inserted with number 0 and the table is persisted.
    pub fn ensure(&mut self, key: &str) -> SnRst<u64> {
        let mut table = self.load_table()?;

        if let Some(entry) = table.get(key) {
            return Ok(entry.number);
        }

        table.insert(
            key,
            SeriesEntry {
                number: 0,
                timestamp: get_sn_now_epoch_f64(),
            },
        );
        self.persist(&table)?;

        log::info!("[SeriesStore::ensure] seeded new series, key={}", key);

        Ok(0)
    }

    /// Same as [`SeriesStore::ensure`]: a miss seeds the key and writes.
    pub fn get_latest(&mut self, key: &str) -> SnRst<u64> {
        self.ensure(key)
    }

    /// Overwrites (or creates) `key`. No ordering check against the previous
    /// number.
    pub fn set_latest(&mut self, key: &str, number: u64, timestamp: SnEpochF64) -> SnRst<()> {
        let mut table = self.load_table()?;

        table.insert(key, SeriesEntry { number, timestamp });
        self.persist(&table)?;

        log::debug!(
            "[SeriesStore::set_latest] key={}, number={}, timestamp={}",
            key,
            number,
            timestamp
        );

        Ok(())
    }
}
