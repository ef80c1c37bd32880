//! Filter usage counters (`suggestion_usage` table).
//!
//! Each (field, value) pair a search actually filters on gets its count
//! bumped and its `last_used_at` refreshed. The counters only bias
//! autocomplete ranking; the search path never reads them.

use datashed_core::CatalogResult;
use datashed_core::query::FilterField;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::connection::{IndexStore, storage_error};

/// One usage counter row for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRow {
    /// Normalized (lowercased, trimmed) filter value.
    pub value: String,
    pub count: u64,
    pub last_used_at: i64,
}

impl IndexStore {
    /// Records one use of a filter value. Values are keyed case-insensitively
    /// so "NetCDF" and "netcdf" accumulate into one counter.
    pub fn record_usage(&self, field: FilterField, value: &str) -> CatalogResult<()> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Ok(());
        }

        let now = self.now();
        self.lock_conn()
            .execute(
                "INSERT INTO suggestion_usage (field, value, count, last_used_at) \
                 VALUES (?1, ?2, 1, ?3) \
                 ON CONFLICT(field, value) DO UPDATE SET \
                 count = count + 1, last_used_at = excluded.last_used_at",
                params![field.as_str(), normalized, now],
            )
            .map_err(storage_error("record_usage"))?;

        tracing::trace!(
            target: "datashed::storage",
            op = "record_usage",
            field = field.as_str(),
            value = %normalized,
            "usage counter updated"
        );

        Ok(())
    }

    /// All usage counters for one field, most-used first.
    pub fn usage_for_field(&self, field: FilterField) -> CatalogResult<Vec<UsageRow>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare(
                "SELECT value, count, last_used_at FROM suggestion_usage \
                 WHERE field = ?1 ORDER BY count DESC, value ASC",
            )
            .map_err(storage_error("usage_for_field"))?;
        let rows = stmt
            .query_map([field.as_str()], |row| {
                Ok(UsageRow {
                    value: row.get(0)?,
                    count: row.get::<_, i64>(1).map(|v| u64::try_from(v).unwrap_or(0))?,
                    last_used_at: row.get(2)?,
                })
            })
            .map_err(storage_error("usage_for_field"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(storage_error("usage_for_field"))?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use datashed_core::clock::ManualClock;

    use super::*;
    use crate::connection::{IndexStore, StoreConfig};

    fn store_at(seconds: i64) -> (IndexStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(seconds));
        let store = IndexStore::open_with_clock(StoreConfig::in_memory(), clock.clone())
            .expect("open in-memory store");
        (store, clock)
    }

    #[test]
    fn usage_counts_accumulate_per_field_value() {
        let (store, clock) = store_at(1_000);
        store.record_usage(FilterField::Tags, "ocean").unwrap();
        clock.advance(10);
        store.record_usage(FilterField::Tags, "ocean").unwrap();
        store.record_usage(FilterField::Tags, "wind").unwrap();
        store.record_usage(FilterField::Format, "ocean").unwrap();

        let tags = store.usage_for_field(FilterField::Tags).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].value, "ocean");
        assert_eq!(tags[0].count, 2);
        assert_eq!(tags[0].last_used_at, 1_010);
        assert_eq!(tags[1].value, "wind");
        assert_eq!(tags[1].count, 1);

        let formats = store.usage_for_field(FilterField::Format).unwrap();
        assert_eq!(formats.len(), 1, "fields keep independent counters");
    }

    #[test]
    fn values_are_keyed_case_insensitively() {
        let (store, _clock) = store_at(0);
        store.record_usage(FilterField::Format, "NetCDF").unwrap();
        store.record_usage(FilterField::Format, "netcdf").unwrap();
        store.record_usage(FilterField::Format, " NETCDF ").unwrap();

        let rows = store.usage_for_field(FilterField::Format).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "netcdf");
        assert_eq!(rows[0].count, 3);
    }

    #[test]
    fn blank_values_are_ignored() {
        let (store, _clock) = store_at(0);
        store.record_usage(FilterField::Tags, "   ").unwrap();
        assert!(store.usage_for_field(FilterField::Tags).unwrap().is_empty());
    }

    #[test]
    fn usage_writes_do_not_advance_write_generation() {
        let (store, _clock) = store_at(0);
        let before = store.write_generation();
        store.record_usage(FilterField::Tags, "ocean").unwrap();
        assert_eq!(store.write_generation(), before);
    }
}
