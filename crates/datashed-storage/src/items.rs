//! Catalog item persistence.
//!
//! Every write is an upsert keyed on `path`. The FTS5 shadow table is
//! maintained by schema triggers, so item rows and their full-text rows
//! change in the same transaction and can never diverge, even under crash.

use std::collections::HashSet;
use std::fmt;

use datashed_core::CatalogResult;
use datashed_core::types::CatalogItem;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::connection::{IndexStore, storage_error, storage_invalid};

/// Column list shared by every item SELECT, in [`item_from_row`] order.
pub(crate) const ITEM_COLUMNS: &str =
    "path, name, project, tags, description, format, source, category, \
     spatial_coverage, temporal_coverage, access_method, storage_location, reference, \
     spatial_resolution, temporal_resolution, size, mtime, etag, is_remote, \
     created_at, updated_at";

/// What a single upsert actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    /// No row existed for this path.
    Inserted,
    /// A row existed and its content differed.
    Updated,
    /// A row existed with identical content; nothing was written.
    Unchanged,
}

impl UpsertOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }

    #[must_use]
    pub const fn changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-outcome tally for a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpsertStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl BulkUpsertStats {
    /// Rows actually written (inserted or updated).
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.inserted + self.updated
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

impl IndexStore {
    /// Inserts or updates one item, keyed on `path`.
    ///
    /// Identical content is detected before writing, so re-upserting the
    /// same record is a true no-op: row timestamps keep their values and
    /// the query cache is not invalidated.
    pub fn upsert_item(&self, item: &CatalogItem) -> CatalogResult<UpsertOutcome> {
        let now = self.now();
        let outcome = self.transaction(|conn| upsert_in_tx(conn, item, now))?;
        self.note_upsert(outcome);

        tracing::debug!(
            target: "datashed::storage",
            op = "upsert_item",
            path = %item.path,
            outcome = %outcome,
            "item upsert completed"
        );

        Ok(outcome)
    }

    /// Upserts a batch inside one transaction; all-or-nothing.
    ///
    /// # Errors
    ///
    /// Rejects batches containing the same `path` twice: silently letting
    /// the later duplicate win would hide an enumeration bug upstream.
    pub fn upsert_items(&self, items: &[CatalogItem]) -> CatalogResult<BulkUpsertStats> {
        if items.is_empty() {
            return Ok(BulkUpsertStats::default());
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.path.as_str()) {
                return Err(storage_invalid(
                    "upsert_items",
                    format!("duplicate path \"{}\" in batch payload", item.path),
                ));
            }
        }

        let now = self.now();
        let stats = self.transaction(|conn| {
            let mut stats = BulkUpsertStats::default();
            for item in items {
                match upsert_in_tx(conn, item, now)? {
                    UpsertOutcome::Inserted => stats.inserted += 1,
                    UpsertOutcome::Updated => stats.updated += 1,
                    UpsertOutcome::Unchanged => stats.unchanged += 1,
                }
            }
            Ok(stats)
        })?;

        if stats.changed() > 0 {
            self.bump_generation();
        }
        self.metrics().record_inserted(stats.inserted as u64);
        self.metrics().record_updated(stats.updated as u64);
        self.metrics().record_unchanged(stats.unchanged as u64);

        tracing::debug!(
            target: "datashed::storage",
            op = "upsert_items",
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            count = items.len(),
            "bulk upsert completed"
        );

        Ok(stats)
    }

    /// Deletes one item (and, via trigger, its full-text row).
    /// Returns whether a row existed.
    pub fn delete_item(&self, path: &str) -> CatalogResult<bool> {
        let deleted = self
            .lock_conn()
            .execute("DELETE FROM items WHERE path = ?1", [path])
            .map_err(storage_error("delete_item"))?;

        if deleted > 0 {
            self.bump_generation();
            self.metrics().record_deleted(deleted as u64);
        }

        tracing::debug!(
            target: "datashed::storage",
            op = "delete_item",
            path,
            deleted = deleted > 0,
            "item delete completed"
        );

        Ok(deleted > 0)
    }

    /// Deletes every remote-sourced row, leaving local drafts untouched.
    pub fn clear_remote_items(&self) -> CatalogResult<usize> {
        let deleted = self
            .lock_conn()
            .execute("DELETE FROM items WHERE is_remote = 1", [])
            .map_err(storage_error("clear_remote_items"))?;

        if deleted > 0 {
            self.bump_generation();
            self.metrics().record_deleted(deleted as u64);
        }

        tracing::debug!(
            target: "datashed::storage",
            op = "clear_remote_items",
            deleted,
            "remote items cleared"
        );

        Ok(deleted)
    }

    /// Replaces every remote-sourced row with `items` in one transaction.
    ///
    /// A full reindex goes through this instead of a wipe followed by a
    /// bulk upsert: the two halves commit together, so no reader ever
    /// observes the catalog between them and a crash cannot leave the
    /// store empty. Local drafts survive the wipe, though an incoming
    /// item may still update a draft sharing its path.
    ///
    /// # Errors
    ///
    /// Rejects batches containing the same `path` twice, like
    /// [`IndexStore::upsert_items`].
    pub fn replace_remote_items(&self, items: &[CatalogItem]) -> CatalogResult<BulkUpsertStats> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.path.as_str()) {
                return Err(storage_invalid(
                    "replace_remote_items",
                    format!("duplicate path \"{}\" in batch payload", item.path),
                ));
            }
        }

        let now = self.now();
        let (cleared, stats) = self.transaction(|conn| {
            let cleared = conn
                .execute("DELETE FROM items WHERE is_remote = 1", [])
                .map_err(storage_error("replace_remote_items"))?;
            let mut stats = BulkUpsertStats::default();
            for item in items {
                match upsert_in_tx(conn, item, now)? {
                    UpsertOutcome::Inserted => stats.inserted += 1,
                    UpsertOutcome::Updated => stats.updated += 1,
                    UpsertOutcome::Unchanged => stats.unchanged += 1,
                }
            }
            Ok((cleared, stats))
        })?;

        if cleared > 0 || stats.changed() > 0 {
            self.bump_generation();
        }
        self.metrics().record_deleted(cleared as u64);
        self.metrics().record_inserted(stats.inserted as u64);
        self.metrics().record_updated(stats.updated as u64);
        self.metrics().record_unchanged(stats.unchanged as u64);

        tracing::debug!(
            target: "datashed::storage",
            op = "replace_remote_items",
            cleared,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "remote rows replaced"
        );

        Ok(stats)
    }

    pub fn get_item(&self, path: &str) -> CatalogResult<Option<CatalogItem>> {
        let conn = self.lock_conn();
        get_by_path(&conn, path)
    }

    /// Total number of indexed items, local drafts included.
    pub fn item_count(&self) -> CatalogResult<u64> {
        let count: i64 = self
            .lock_conn()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .map_err(storage_error("item_count"))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Paths of all remote-sourced rows. The indexer diffs this against the
    /// current listing to prune datasets that disappeared from the remote.
    pub fn remote_paths(&self) -> CatalogResult<Vec<String>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare("SELECT path FROM items WHERE is_remote = 1 ORDER BY path")
            .map_err(storage_error("remote_paths"))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(storage_error("remote_paths"))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.map_err(storage_error("remote_paths"))?);
        }
        Ok(paths)
    }

    fn note_upsert(&self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => {
                self.bump_generation();
                self.metrics().record_inserted(1);
            }
            UpsertOutcome::Updated => {
                self.bump_generation();
                self.metrics().record_updated(1);
            }
            UpsertOutcome::Unchanged => self.metrics().record_unchanged(1),
        }
    }
}

fn upsert_in_tx(
    conn: &Connection,
    item: &CatalogItem,
    now: i64,
) -> CatalogResult<UpsertOutcome> {
    if item.path.trim().is_empty() {
        return Err(storage_invalid("upsert_item", "item path must not be empty"));
    }

    match get_by_path(conn, &item.path)? {
        Some(current) if current.same_content(item) => Ok(UpsertOutcome::Unchanged),
        Some(_) => {
            conn.execute(
                "UPDATE items SET \
                 name = ?2, project = ?3, tags = ?4, description = ?5, format = ?6, \
                 source = ?7, category = ?8, spatial_coverage = ?9, temporal_coverage = ?10, \
                 access_method = ?11, storage_location = ?12, reference = ?13, \
                 spatial_resolution = ?14, temporal_resolution = ?15, size = ?16, \
                 mtime = ?17, etag = ?18, is_remote = ?19, updated_at = ?20 \
                 WHERE path = ?1",
                params![
                    item.path,
                    item.name,
                    item.project,
                    item.tags,
                    item.description,
                    item.format,
                    item.source,
                    item.category,
                    item.spatial_coverage,
                    item.temporal_coverage,
                    item.access_method,
                    item.storage_location,
                    item.reference,
                    item.spatial_resolution,
                    item.temporal_resolution,
                    size_to_sql(item.size),
                    item.mtime,
                    item.etag,
                    item.is_remote,
                    now,
                ],
            )
            .map_err(storage_error("upsert_item"))?;
            Ok(UpsertOutcome::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO items (\
                 path, name, project, tags, description, format, source, category, \
                 spatial_coverage, temporal_coverage, access_method, storage_location, \
                 reference, spatial_resolution, temporal_resolution, size, mtime, etag, \
                 is_remote, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
                 ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
                params![
                    item.path,
                    item.name,
                    item.project,
                    item.tags,
                    item.description,
                    item.format,
                    item.source,
                    item.category,
                    item.spatial_coverage,
                    item.temporal_coverage,
                    item.access_method,
                    item.storage_location,
                    item.reference,
                    item.spatial_resolution,
                    item.temporal_resolution,
                    size_to_sql(item.size),
                    item.mtime,
                    item.etag,
                    item.is_remote,
                    now,
                    now,
                ],
            )
            .map_err(storage_error("upsert_item"))?;
            Ok(UpsertOutcome::Inserted)
        }
    }
}

fn get_by_path(conn: &Connection, path: &str) -> CatalogResult<Option<CatalogItem>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE path = ?1"),
        [path],
        item_from_row,
    )
    .optional()
    .map_err(storage_error("get_item"))
}

fn size_to_sql(size: Option<u64>) -> Option<i64> {
    size.and_then(|v| i64::try_from(v).ok())
}

/// Maps a row selected with [`ITEM_COLUMNS`] back into a `CatalogItem`.
pub(crate) fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogItem> {
    Ok(CatalogItem {
        path: row.get(0)?,
        name: row.get(1)?,
        project: row.get(2)?,
        tags: row.get(3)?,
        description: row.get(4)?,
        format: row.get(5)?,
        source: row.get(6)?,
        category: row.get(7)?,
        spatial_coverage: row.get(8)?,
        temporal_coverage: row.get(9)?,
        access_method: row.get(10)?,
        storage_location: row.get(11)?,
        reference: row.get(12)?,
        spatial_resolution: row.get(13)?,
        temporal_resolution: row.get(14)?,
        size: row
            .get::<_, Option<i64>>(15)?
            .and_then(|v| u64::try_from(v).ok()),
        mtime: row.get(16)?,
        etag: row.get(17)?,
        is_remote: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use datashed_core::clock::ManualClock;
    use datashed_core::types::CatalogItem;

    use super::*;
    use crate::connection::{IndexStore, StoreConfig};

    fn store_at(seconds: i64) -> (IndexStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(seconds));
        let store = IndexStore::open_with_clock(StoreConfig::in_memory(), clock.clone())
            .expect("open in-memory store");
        (store, clock)
    }

    fn sample(path: &str) -> CatalogItem {
        CatalogItem::new(path, path.to_uppercase())
            .with_tags("ocean daily")
            .with_description("daily ocean fields")
            .with_size(5_000_000)
            .with_mtime(1_700_000_000)
    }

    fn fts_paths(store: &IndexStore) -> Vec<String> {
        let conn = store.lock_conn();
        let mut stmt = conn
            .prepare("SELECT path FROM items_fts ORDER BY path")
            .expect("prepare fts query");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .expect("query fts paths");
        rows.map(|r| r.expect("fts path")).collect()
    }

    #[test]
    fn upsert_twice_with_identical_data_is_idempotent() {
        let (store, clock) = store_at(1_000);
        let item = sample("sst");

        assert_eq!(store.upsert_item(&item).unwrap(), UpsertOutcome::Inserted);
        clock.advance(100);
        assert_eq!(store.upsert_item(&item).unwrap(), UpsertOutcome::Unchanged);

        assert_eq!(store.item_count().unwrap(), 1);
        let stored = store.get_item("sst").unwrap().expect("row exists");
        assert_eq!(stored.created_at, 1_000);
        assert_eq!(stored.updated_at, 1_000, "no-op upsert must not touch timestamps");
    }

    #[test]
    fn upsert_with_changed_content_updates_in_place() {
        let (store, clock) = store_at(1_000);
        store.upsert_item(&sample("sst")).unwrap();

        clock.advance(50);
        let changed = sample("sst").with_description("re-gridded ocean fields");
        assert_eq!(store.upsert_item(&changed).unwrap(), UpsertOutcome::Updated);

        let stored = store.get_item("sst").unwrap().expect("row exists");
        assert_eq!(stored.description, "re-gridded ocean fields");
        assert_eq!(stored.created_at, 1_000, "update must keep the original created_at");
        assert_eq!(stored.updated_at, 1_050);
        assert_eq!(store.item_count().unwrap(), 1);
    }

    #[test]
    fn get_item_roundtrips_every_field() {
        let (store, _clock) = store_at(42);
        let item = CatalogItem {
            path: "wind".to_owned(),
            name: "Wind Fields".to_owned(),
            project: "ERA5".to_owned(),
            tags: "wind hourly".to_owned(),
            description: "hourly wind".to_owned(),
            format: "netcdf".to_owned(),
            source: "ecmwf".to_owned(),
            category: "climate".to_owned(),
            spatial_coverage: "global".to_owned(),
            temporal_coverage: "1979-present".to_owned(),
            access_method: "https".to_owned(),
            storage_location: "tape".to_owned(),
            reference: "doi:10.1000/182".to_owned(),
            spatial_resolution: "0.25deg".to_owned(),
            temporal_resolution: "hourly".to_owned(),
            size: Some(12_345_678_901),
            mtime: Some(1_699_999_999),
            etag: Some("abc123".to_owned()),
            is_remote: true,
            created_at: 0,
            updated_at: 0,
        };
        store.upsert_item(&item).unwrap();

        let stored = store.get_item("wind").unwrap().expect("row exists");
        assert!(stored.same_content(&item));
        assert_eq!(stored.created_at, 42);
        assert_eq!(stored.updated_at, 42);
    }

    #[test]
    fn bulk_upsert_tallies_and_is_transactional() {
        let (store, _clock) = store_at(1_000);
        let batch = vec![sample("a"), sample("b"), sample("c")];

        let stats = store.upsert_items(&batch).unwrap();
        assert_eq!(stats.inserted, 3);
        assert_eq!(stats.changed(), 3);
        assert_eq!(store.item_count().unwrap(), 3);

        // Re-running the identical batch writes nothing.
        let again = store.upsert_items(&batch).unwrap();
        assert_eq!(again.unchanged, 3);
        assert_eq!(again.changed(), 0);
    }

    #[test]
    fn bulk_upsert_rejects_duplicate_paths() {
        let (store, _clock) = store_at(0);
        let batch = vec![sample("dup"), sample("dup")];
        let err = store.upsert_items(&batch).expect_err("duplicates must be rejected");
        assert!(err.to_string().contains("duplicate path"));
        assert_eq!(store.item_count().unwrap(), 0);
    }

    #[test]
    fn empty_path_is_rejected() {
        let (store, _clock) = store_at(0);
        let item = CatalogItem::new("", "nameless");
        assert!(store.upsert_item(&item).is_err());
    }

    #[test]
    fn write_generation_advances_only_on_real_writes() {
        let (store, _clock) = store_at(0);
        let before = store.write_generation();

        store.upsert_item(&sample("a")).unwrap();
        let after_insert = store.write_generation();
        assert!(after_insert > before);

        store.upsert_item(&sample("a")).unwrap();
        assert_eq!(
            store.write_generation(),
            after_insert,
            "unchanged upsert must not invalidate cached queries"
        );

        store.delete_item("a").unwrap();
        assert!(store.write_generation() > after_insert);
    }

    #[test]
    fn shadow_row_exists_iff_item_exists() {
        let (store, _clock) = store_at(0);
        store.upsert_item(&sample("a")).unwrap();
        store.upsert_item(&sample("b")).unwrap();
        assert_eq!(fts_paths(&store), vec!["a".to_owned(), "b".to_owned()]);

        assert!(store.delete_item("a").unwrap());
        assert_eq!(fts_paths(&store), vec!["b".to_owned()]);
        assert!(store.get_item("a").unwrap().is_none());
    }

    #[test]
    fn delete_item_reports_missing_rows() {
        let (store, _clock) = store_at(0);
        assert!(!store.delete_item("ghost").unwrap());
    }

    #[test]
    fn clear_remote_items_spares_local_drafts() {
        let (store, _clock) = store_at(0);
        store.upsert_item(&sample("remote-a")).unwrap();
        store.upsert_item(&sample("remote-b")).unwrap();
        store
            .upsert_item(&sample("draft").local_draft())
            .unwrap();

        let cleared = store.clear_remote_items().unwrap();
        assert_eq!(cleared, 2);
        assert_eq!(store.item_count().unwrap(), 1);
        assert!(store.get_item("draft").unwrap().is_some());
        assert_eq!(fts_paths(&store), vec!["draft".to_owned()]);
    }

    #[test]
    fn replace_remote_items_swaps_the_catalog_in_one_shot() {
        let (store, _clock) = store_at(1_000);
        store.upsert_item(&sample("old-a")).unwrap();
        store.upsert_item(&sample("old-b")).unwrap();
        store.upsert_item(&sample("draft").local_draft()).unwrap();

        let fresh = vec![sample("old-b"), sample("new-c")];
        let stats = store.replace_remote_items(&fresh).unwrap();
        assert_eq!(stats.inserted, 2, "the wipe makes every remote row a fresh insert");

        assert!(store.get_item("old-a").unwrap().is_none());
        assert!(store.get_item("old-b").unwrap().is_some());
        assert!(store.get_item("new-c").unwrap().is_some());
        assert!(store.get_item("draft").unwrap().is_some(), "drafts survive the wipe");
        assert_eq!(store.item_count().unwrap(), 3);
        assert_eq!(
            fts_paths(&store),
            vec!["draft".to_owned(), "new-c".to_owned(), "old-b".to_owned()]
        );
    }

    #[test]
    fn replace_remote_items_rolls_back_the_wipe_when_the_batch_fails() {
        let (store, _clock) = store_at(1_000);
        store.upsert_item(&sample("keep-a")).unwrap();
        store.upsert_item(&sample("keep-b")).unwrap();

        let bad = vec![sample("fine"), CatalogItem::new("", "nameless")];
        store
            .replace_remote_items(&bad)
            .expect_err("empty path must fail the batch");

        // The failed replacement must leave the previous catalog intact.
        assert_eq!(store.item_count().unwrap(), 2);
        assert!(store.get_item("keep-a").unwrap().is_some());
        assert!(store.get_item("keep-b").unwrap().is_some());
        assert!(store.get_item("fine").unwrap().is_none());
        assert_eq!(store.metrics_snapshot().tx_rollbacks, 1);
    }

    #[test]
    fn replace_remote_items_with_empty_listing_clears_remote_rows() {
        let (store, _clock) = store_at(0);
        store.upsert_item(&sample("remote")).unwrap();
        store.upsert_item(&sample("draft").local_draft()).unwrap();

        let stats = store.replace_remote_items(&[]).unwrap();
        assert_eq!(stats.total(), 0);
        assert_eq!(store.item_count().unwrap(), 1);
        assert!(store.get_item("draft").unwrap().is_some());
    }

    #[test]
    fn replace_remote_items_rejects_duplicate_paths() {
        let (store, _clock) = store_at(0);
        store.upsert_item(&sample("keep")).unwrap();

        let bad = vec![sample("dup"), sample("dup")];
        assert!(store.replace_remote_items(&bad).is_err());
        assert!(store.get_item("keep").unwrap().is_some());
    }

    #[test]
    fn remote_paths_excludes_drafts() {
        let (store, _clock) = store_at(0);
        store.upsert_item(&sample("b")).unwrap();
        store.upsert_item(&sample("a")).unwrap();
        store.upsert_item(&sample("z").local_draft()).unwrap();

        assert_eq!(store.remote_paths().unwrap(), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn metrics_reflect_item_operations() {
        let (store, _clock) = store_at(0);
        store.upsert_item(&sample("a")).unwrap();
        store.upsert_item(&sample("a")).unwrap();
        store
            .upsert_item(&sample("a").with_description("new"))
            .unwrap();
        store.delete_item("a").unwrap();

        let snap = store.metrics_snapshot();
        assert_eq!(snap.items_inserted, 1);
        assert_eq!(snap.items_unchanged, 1);
        assert_eq!(snap.items_updated, 1);
        assert_eq!(snap.items_deleted, 1);
    }
}
