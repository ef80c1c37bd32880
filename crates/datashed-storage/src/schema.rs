use datashed_core::{CatalogError, CatalogResult};
use rusqlite::Connection;

use crate::connection::storage_error;

pub const SCHEMA_VERSION: i64 = 4;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

/// An on-disk index from any older build upgrades in place: migrations never
/// drop or rewrite item rows, though derived structures (the FTS shadow) may
/// be rebuilt. Shipped versions stay frozen; fixes land as new versions.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: &[
            "CREATE TABLE IF NOT EXISTS items (\
                path TEXT PRIMARY KEY,\
                name TEXT NOT NULL,\
                project TEXT NOT NULL DEFAULT '',\
                tags TEXT NOT NULL DEFAULT '',\
                description TEXT NOT NULL DEFAULT '',\
                format TEXT NOT NULL DEFAULT '',\
                source TEXT NOT NULL DEFAULT '',\
                category TEXT NOT NULL DEFAULT '',\
                spatial_coverage TEXT NOT NULL DEFAULT '',\
                temporal_coverage TEXT NOT NULL DEFAULT '',\
                access_method TEXT NOT NULL DEFAULT '',\
                storage_location TEXT NOT NULL DEFAULT '',\
                reference TEXT NOT NULL DEFAULT '',\
                size INTEGER,\
                mtime INTEGER,\
                created_at INTEGER NOT NULL,\
                updated_at INTEGER NOT NULL\
            );",
            "CREATE INDEX IF NOT EXISTS idx_items_mtime ON items(mtime DESC);",
            "CREATE VIRTUAL TABLE IF NOT EXISTS items_fts USING fts5(\
                name, path, project, tags, description\
            );",
            "CREATE TRIGGER IF NOT EXISTS items_fts_insert AFTER INSERT ON items BEGIN \
                INSERT INTO items_fts (name, path, project, tags, description) \
                VALUES (new.name, new.path, new.project, new.tags, new.description); \
            END;",
            "CREATE TRIGGER IF NOT EXISTS items_fts_delete AFTER DELETE ON items BEGIN \
                DELETE FROM items_fts WHERE path = old.path; \
            END;",
            "CREATE TRIGGER IF NOT EXISTS items_fts_update AFTER UPDATE ON items BEGIN \
                DELETE FROM items_fts WHERE path = old.path; \
                INSERT INTO items_fts (name, path, project, tags, description) \
                VALUES (new.name, new.path, new.project, new.tags, new.description); \
            END;",
            "CREATE TABLE IF NOT EXISTS index_meta (\
                key TEXT PRIMARY KEY,\
                value TEXT NOT NULL\
            );",
            "CREATE TABLE IF NOT EXISTS suggestion_usage (\
                field TEXT NOT NULL,\
                value TEXT NOT NULL,\
                count INTEGER NOT NULL DEFAULT 0,\
                last_used_at INTEGER NOT NULL,\
                PRIMARY KEY (field, value)\
            );",
        ],
    },
    Migration {
        version: 2,
        statements: &[
            "ALTER TABLE items ADD COLUMN etag TEXT;",
            "ALTER TABLE items ADD COLUMN is_remote INTEGER NOT NULL DEFAULT 1;",
            "CREATE INDEX IF NOT EXISTS idx_items_is_remote ON items(is_remote);",
        ],
    },
    Migration {
        version: 3,
        statements: &[
            "ALTER TABLE items ADD COLUMN spatial_resolution TEXT NOT NULL DEFAULT '';",
            "ALTER TABLE items ADD COLUMN temporal_resolution TEXT NOT NULL DEFAULT '';",
        ],
    },
    // Re-key the FTS shadow by items.rowid. The v1 triggers matched shadow
    // rows on the path column, which FTS5 can only satisfy by scanning the
    // whole shadow table for every fired trigger.
    Migration {
        version: 4,
        statements: &[
            "DROP TRIGGER IF EXISTS items_fts_insert;",
            "DROP TRIGGER IF EXISTS items_fts_delete;",
            "DROP TRIGGER IF EXISTS items_fts_update;",
            "DELETE FROM items_fts;",
            "INSERT INTO items_fts (rowid, name, path, project, tags, description) \
             SELECT rowid, name, path, project, tags, description FROM items;",
            "CREATE TRIGGER items_fts_insert AFTER INSERT ON items BEGIN \
                INSERT INTO items_fts (rowid, name, path, project, tags, description) \
                VALUES (new.rowid, new.name, new.path, new.project, new.tags, new.description); \
            END;",
            "CREATE TRIGGER items_fts_delete AFTER DELETE ON items BEGIN \
                DELETE FROM items_fts WHERE rowid = old.rowid; \
            END;",
            "CREATE TRIGGER items_fts_update AFTER UPDATE ON items BEGIN \
                DELETE FROM items_fts WHERE rowid = old.rowid; \
                INSERT INTO items_fts (rowid, name, path, project, tags, description) \
                VALUES (new.rowid, new.name, new.path, new.project, new.tags, new.description); \
            END;",
        ],
    },
];

/// Creates or upgrades the schema to [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns `CatalogError::SchemaTooNew` when the database was written by a
/// newer build; this function never downgrades.
pub fn bootstrap(conn: &Connection) -> CatalogResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);")
        .map_err(storage_error("bootstrap"))?;

    let version = current_version_optional(conn)?.unwrap_or(0);
    if version > SCHEMA_VERSION {
        return Err(CatalogError::SchemaTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    let version = apply_migrations(conn, MIGRATIONS, version)?;

    tracing::debug!(
        target: "datashed::storage",
        schema_version = version,
        "schema bootstrap complete"
    );

    Ok(())
}

/// Applies every migration newer than `from` and returns the final version.
///
/// Each migration's DDL and its `schema_version` record commit in one
/// transaction. Without that, a crash between an `ALTER TABLE` and the
/// version insert leaves the column behind with no record of it, and every
/// later open re-runs the ALTER and fails on the existing column.
fn apply_migrations(conn: &Connection, migrations: &[Migration], from: i64) -> CatalogResult<i64> {
    let mut version = from;
    for migration in migrations {
        if migration.version <= version {
            continue;
        }

        tracing::debug!(
            target: "datashed::storage",
            from_version = version,
            to_version = migration.version,
            "applying schema migration"
        );

        let tx = conn
            .unchecked_transaction()
            .map_err(storage_error("migrate"))?;
        for statement in migration.statements {
            tx.execute_batch(statement).map_err(storage_error("migrate"))?;
        }
        tx.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )
        .map_err(storage_error("migrate"))?;
        tx.commit().map_err(storage_error("migrate"))?;
        version = migration.version;
    }
    Ok(version)
}

pub fn current_version(conn: &Connection) -> CatalogResult<i64> {
    current_version_optional(conn)?.ok_or_else(|| {
        crate::connection::storage_invalid("schema_version", "schema_version table has no rows")
    })
}

fn current_version_optional(conn: &Connection) -> CatalogResult<Option<i64>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
    .optional()
    .map_err(storage_error("schema_version"))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    fn open_raw() -> Connection {
        Connection::open_in_memory().expect("in-memory connection")
    }

    fn object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
                [kind, name],
                |row| row.get(0),
            )
            .expect("sqlite_master query");
        count > 0
    }

    #[test]
    fn bootstrap_sets_latest_version_for_fresh_database() {
        let conn = open_raw();
        bootstrap(&conn).expect("bootstrap should succeed");

        assert_eq!(current_version(&conn).expect("schema version"), SCHEMA_VERSION);
        assert!(object_exists(&conn, "table", "items"));
        assert!(object_exists(&conn, "table", "items_fts"));
        assert!(object_exists(&conn, "table", "index_meta"));
        assert!(object_exists(&conn, "table", "suggestion_usage"));
        assert!(object_exists(&conn, "trigger", "items_fts_insert"));
        assert!(object_exists(&conn, "trigger", "items_fts_delete"));
        assert!(object_exists(&conn, "trigger", "items_fts_update"));
    }

    #[test]
    fn bootstrap_upgrades_v1_database_to_latest() {
        let conn = open_raw();
        conn.execute_batch("CREATE TABLE schema_version (version INTEGER PRIMARY KEY);")
            .expect("schema_version creatable");
        for statement in MIGRATIONS[0].statements {
            conn.execute_batch(statement).expect("v1 statement");
        }
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])
            .expect("v1 marker");

        bootstrap(&conn).expect("bootstrap should upgrade");
        assert_eq!(current_version(&conn).expect("schema version"), SCHEMA_VERSION);

        // v2 and v3 columns must exist after the upgrade.
        let columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('items') \
                 WHERE name IN ('etag', 'is_remote', 'spatial_resolution', 'temporal_resolution')",
                [],
                |row| row.get(0),
            )
            .expect("table_info query");
        assert_eq!(columns, 4);
    }

    #[test]
    fn bootstrap_is_idempotent_at_latest_version() {
        let conn = open_raw();
        bootstrap(&conn).expect("first bootstrap");
        bootstrap(&conn).expect("second bootstrap");
        bootstrap(&conn).expect("third bootstrap");
        assert_eq!(current_version(&conn).expect("schema version"), SCHEMA_VERSION);
    }

    #[test]
    fn bootstrap_rejects_newer_schema() {
        let conn = open_raw();
        bootstrap(&conn).expect("bootstrap");
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION + 1],
        )
        .expect("future version marker");

        let err = bootstrap(&conn).expect_err("newer schema must be rejected");
        assert!(matches!(
            err,
            CatalogError::SchemaTooNew { found, supported }
                if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
        ));
    }

    #[test]
    fn failed_migration_statement_rolls_back_the_whole_migration() {
        let conn = open_raw();
        conn.execute_batch("CREATE TABLE schema_version (version INTEGER PRIMARY KEY);")
            .expect("schema_version creatable");

        // Second statement fails: the table already exists.
        let broken = [Migration {
            version: 1,
            statements: &[
                "CREATE TABLE halfway (x INTEGER);",
                "CREATE TABLE halfway (x INTEGER);",
            ],
        }];
        apply_migrations(&conn, &broken, 0).expect_err("duplicate DDL must fail");

        assert!(
            !object_exists(&conn, "table", "halfway"),
            "rolled-back DDL must not survive"
        );
        assert_eq!(
            current_version_optional(&conn).expect("version query"),
            None,
            "a failed migration must not record its version"
        );
    }

    #[test]
    fn interrupted_upgrade_leaves_a_database_that_opens_cleanly() {
        let conn = open_raw();
        conn.execute_batch("CREATE TABLE schema_version (version INTEGER PRIMARY KEY);")
            .expect("schema_version creatable");
        apply_migrations(&conn, &MIGRATIONS[..1], 0).expect("v1 applies");

        // An upgrade dying after its ALTER succeeded. The column must vanish
        // with the transaction, or every later bootstrap would re-run the
        // same ALTER and fail on the existing column until the file is
        // deleted by hand.
        let dying = [Migration {
            version: 2,
            statements: &[
                "ALTER TABLE items ADD COLUMN etag TEXT;",
                "CREATE TABLE items (oops INTEGER);",
            ],
        }];
        apply_migrations(&conn, &dying, 1).expect_err("broken upgrade must fail");

        bootstrap(&conn).expect("next open completes the upgrade");
        assert_eq!(current_version(&conn).expect("schema version"), SCHEMA_VERSION);
        let columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('items') WHERE name = 'etag'",
                [],
                |row| row.get(0),
            )
            .expect("table_info query");
        assert_eq!(columns, 1, "the real migration must add the column exactly once");
    }

    #[test]
    fn triggers_mirror_items_into_fts_shadow() {
        let conn = open_raw();
        bootstrap(&conn).expect("bootstrap");

        conn.execute(
            "INSERT INTO items (path, name, tags, created_at, updated_at) \
             VALUES ('sst-daily', 'SST Daily', 'ocean sst', 0, 0)",
            [],
        )
        .expect("insert item");
        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM items_fts WHERE items_fts MATCH 'ocean'",
                [],
                |row| row.get(0),
            )
            .expect("fts query");
        assert_eq!(hits, 1, "insert trigger must mirror the row");

        conn.execute("UPDATE items SET tags = 'wind' WHERE path = 'sst-daily'", [])
            .expect("update item");
        let stale: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM items_fts WHERE items_fts MATCH 'ocean'",
                [],
                |row| row.get(0),
            )
            .expect("fts query");
        let fresh: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM items_fts WHERE items_fts MATCH 'wind'",
                [],
                |row| row.get(0),
            )
            .expect("fts query");
        assert_eq!(stale, 0, "update trigger must drop the old tokens");
        assert_eq!(fresh, 1, "update trigger must index the new tokens");

        conn.execute("DELETE FROM items WHERE path = 'sst-daily'", [])
            .expect("delete item");
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM items_fts", [], |row| row.get(0))
            .expect("fts count");
        assert_eq!(remaining, 0, "delete trigger must remove the shadow row");
    }

    fn misaligned_shadow_rows(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM items WHERE rowid NOT IN (SELECT rowid FROM items_fts)",
            [],
            |row| row.get(0),
        )
        .expect("rowid comparison")
    }

    #[test]
    fn fresh_shadow_rows_share_their_item_rowids() {
        let conn = open_raw();
        bootstrap(&conn).expect("bootstrap");

        conn.execute(
            "INSERT INTO items (path, name, created_at, updated_at) VALUES ('a', 'A', 0, 0)",
            [],
        )
        .expect("insert item");
        conn.execute(
            "INSERT INTO items (path, name, created_at, updated_at) VALUES ('b', 'B', 0, 0)",
            [],
        )
        .expect("insert item");

        assert_eq!(misaligned_shadow_rows(&conn), 0);
    }

    #[test]
    fn upgrade_rekeys_shadow_rows_to_item_rowids() {
        let conn = open_raw();
        conn.execute_batch("CREATE TABLE schema_version (version INTEGER PRIMARY KEY);")
            .expect("schema_version creatable");
        apply_migrations(&conn, &MIGRATIONS[..1], 0).expect("v1 applies");
        conn.execute(
            "INSERT INTO items (path, name, tags, created_at, updated_at) \
             VALUES ('sst-daily', 'SST Daily', 'ocean', 0, 0)",
            [],
        )
        .expect("insert item");
        conn.execute(
            "INSERT INTO items (path, name, tags, created_at, updated_at) \
             VALUES ('wind-fields', 'Wind Fields', 'wind', 0, 0)",
            [],
        )
        .expect("insert item");
        // Under the v1 triggers an update re-inserts the shadow row with a
        // fresh auto-assigned rowid, so the two tables drift apart.
        conn.execute(
            "UPDATE items SET tags = 'ocean sst' WHERE path = 'sst-daily'",
            [],
        )
        .expect("update item");
        assert_eq!(misaligned_shadow_rows(&conn), 1, "v1 keying drifts");

        bootstrap(&conn).expect("upgrade to latest");
        assert_eq!(misaligned_shadow_rows(&conn), 0, "rebuild re-keys the shadow");

        // Rowid-keyed triggers keep mirroring after the upgrade.
        conn.execute("DELETE FROM items WHERE path = 'sst-daily'", [])
            .expect("delete item");
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM items_fts", [], |row| row.get(0))
            .expect("fts count");
        assert_eq!(remaining, 1);
        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM items_fts WHERE items_fts MATCH 'wind'",
                [],
                |row| row.get(0),
            )
            .expect("fts query");
        assert_eq!(hits, 1);
    }
}
