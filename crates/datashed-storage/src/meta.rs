//! Index bookkeeping (`index_meta` table).
//!
//! A flat key/value map owned by the background indexer: `last_full_index`
//! records the last complete rebuild, `last_sync` the last pass of any kind.
//! Keys are overwritten in place and never deleted.

use datashed_core::CatalogResult;
use rusqlite::OptionalExtension;

use crate::connection::{IndexStore, storage_error};

pub const META_LAST_FULL_INDEX: &str = "last_full_index";
pub const META_LAST_SYNC: &str = "last_sync";

impl IndexStore {
    pub fn set_meta(&self, key: &str, value: &str) -> CatalogResult<()> {
        self.lock_conn()
            .execute(
                "INSERT INTO index_meta (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )
            .map_err(storage_error("set_meta"))?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> CatalogResult<Option<String>> {
        self.lock_conn()
            .query_row("SELECT value FROM index_meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_error("get_meta"))
    }

    /// Unix seconds of the last successful full reindex, when recorded.
    /// A value that does not parse as a timestamp reads as absent.
    pub fn last_full_index(&self) -> CatalogResult<Option<i64>> {
        self.meta_timestamp(META_LAST_FULL_INDEX)
    }

    pub fn set_last_full_index(&self, unix_seconds: i64) -> CatalogResult<()> {
        self.set_meta(META_LAST_FULL_INDEX, &unix_seconds.to_string())
    }

    /// Unix seconds of the last successful indexing pass of any kind.
    pub fn last_sync(&self) -> CatalogResult<Option<i64>> {
        self.meta_timestamp(META_LAST_SYNC)
    }

    pub fn set_last_sync(&self, unix_seconds: i64) -> CatalogResult<()> {
        self.set_meta(META_LAST_SYNC, &unix_seconds.to_string())
    }

    fn meta_timestamp(&self, key: &str) -> CatalogResult<Option<i64>> {
        let Some(raw) = self.get_meta(key)? else {
            return Ok(None);
        };
        match raw.parse::<i64>() {
            Ok(ts) => Ok(Some(ts)),
            Err(_) => {
                tracing::warn!(
                    target: "datashed::storage",
                    key,
                    value = %raw,
                    "non-numeric bookkeeping timestamp, treating as absent"
                );
                Ok(None)
            }
        }
    }
}
