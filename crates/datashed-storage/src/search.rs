//! Ranked full-text search over the catalog index.
//!
//! [`QueryEngine`] turns a [`SearchRequest`] into SQL against the `items`
//! table and its FTS5 shadow. Free text is matched through `items_fts` and
//! ordered by BM25 relevance; requests without usable text fall back to a
//! plain filter scan ordered by recency. Every filter value is AND-ed into
//! the WHERE clause, so adding filters can only narrow a result set.
//!
//! First result pages are cached for a short TTL keyed by the normalized
//! request signature. Cache entries are stamped with the store's write
//! generation, so any mutation of the item rows invalidates them
//! immediately even while the TTL is still running.

use std::sync::Arc;

use datashed_core::cache::TtlCache;
use datashed_core::query::{FilterField, SearchRequest, SizeBucket, match_expression};
use datashed_core::types::ScoredItem;
use datashed_core::{CatalogError, CatalogResult};
use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::connection::{IndexStore, storage_error};
use crate::items::{ITEM_COLUMNS, item_from_row};

// ─── Query engine ───────────────────────────────────────────────────────────

/// Executes ranked searches against an [`IndexStore`].
///
/// Cheap to share behind an `Arc`; all interior state is synchronized.
pub struct QueryEngine {
    store: Arc<IndexStore>,
    cache: TtlCache<datashed_core::query::QuerySignature, Vec<ScoredItem>>,
}

impl QueryEngine {
    /// Creates an engine over `store` with a first-page cache holding
    /// entries for `cache_ttl_secs`.
    #[must_use]
    pub fn new(store: Arc<IndexStore>, cache_ttl_secs: u64) -> Self {
        let cache = TtlCache::new(cache_ttl_secs, Arc::clone(store.clock()));
        Self { store, cache }
    }

    /// Runs a search and returns items ranked best-first.
    ///
    /// Requests whose text carries at least one usable token are matched
    /// through FTS5 and ordered by BM25; otherwise results are the filter
    /// matches ordered by modification time, newest first. A query the
    /// FTS5 parser rejects is degraded to an empty result rather than an
    /// error, since it usually means the user is mid-keystroke.
    pub fn search(&self, request: &SearchRequest) -> CatalogResult<Vec<ScoredItem>> {
        self.store.metrics().record_search();
        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let signature = request.signature();
        // Snapshot before running the query: a write landing mid-query
        // advances the store generation past this stamp, so the entry we
        // are about to insert can never outlive data it no longer matches.
        let generation = self.store.write_generation();
        let cacheable = request.offset == 0;
        if cacheable && let Some(hit) = self.cache.get(&signature, generation) {
            self.store.metrics().record_search_cache_hit();
            tracing::trace!(
                target: "datashed::search",
                op = "search",
                result_count = hit.len(),
                "served from first-page cache"
            );
            return Ok(hit);
        }

        let results = match self.execute(request) {
            Ok(rows) => rows,
            Err(CatalogError::QuerySyntax { query, detail }) => {
                tracing::warn!(
                    target: "datashed::search",
                    op = "search",
                    query = %query,
                    detail = %detail,
                    "unparsable match expression degraded to empty result"
                );
                Vec::new()
            }
            Err(other) => return Err(other),
        };
        tracing::debug!(
            target: "datashed::search",
            op = "search",
            result_count = results.len(),
            offset = request.offset,
            "search executed"
        );
        if cacheable {
            self.cache.insert(signature, results.clone(), generation);
        }
        Ok(results)
    }

    fn execute(&self, request: &SearchRequest) -> CatalogResult<Vec<ScoredItem>> {
        let (clauses, params) = filter_clauses(&request.filters);
        match match_expression(&request.text) {
            Some(expr) => self.ranked(&expr, &clauses, params, request),
            None => self.recency(&clauses, params, request),
        }
    }

    /// FTS5 path: join the shadow table back to `items` and let BM25 order
    /// the matches. SQLite's `bm25()` returns smaller-is-better values, so
    /// the surfaced score is its negation.
    fn ranked(
        &self,
        expr: &str,
        clauses: &[String],
        filter_params: Vec<Value>,
        request: &SearchRequest,
    ) -> CatalogResult<Vec<ScoredItem>> {
        let mut sql = format!(
            "SELECT {cols}, bm25(items_fts) AS fts_rank \
             FROM items_fts JOIN items i ON i.rowid = items_fts.rowid \
             WHERE items_fts MATCH ?",
            cols = qualified_item_columns(),
        );
        for clause in clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        sql.push_str(" ORDER BY fts_rank, i.path LIMIT ? OFFSET ?");

        let mut params = Vec::with_capacity(filter_params.len() + 3);
        params.push(Value::Text(expr.to_owned()));
        params.extend(filter_params);
        push_page_params(&mut params, request);

        let conn = self.store.lock_conn();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(storage_error("search.prepare"))?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let item = item_from_row(row)?;
                let rank: f64 = row.get(21)?;
                Ok(ScoredItem { item, score: -rank })
            })
            .map_err(|err| classify_match_error(expr, err))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|err| classify_match_error(expr, err))?);
        }
        Ok(out)
    }

    /// Filter-only path: no relevance signal exists, so newest items come
    /// first. SQLite sorts NULL `mtime` last under DESC, which is where
    /// items without a known modification time belong.
    fn recency(
        &self,
        clauses: &[String],
        filter_params: Vec<Value>,
        request: &SearchRequest,
    ) -> CatalogResult<Vec<ScoredItem>> {
        let mut sql = format!("SELECT {cols} FROM items i", cols = qualified_item_columns());
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY i.mtime DESC, i.path LIMIT ? OFFSET ?");

        let mut params = filter_params;
        push_page_params(&mut params, request);

        let conn = self.store.lock_conn();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(storage_error("search.prepare"))?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let item = item_from_row(row)?;
                Ok(ScoredItem { item, score: 0.0 })
            })
            .map_err(storage_error("search.query"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(storage_error("search.row"))?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("cached_pages", &self.cache.len())
            .finish_non_exhaustive()
    }
}

// ─── Clause assembly ────────────────────────────────────────────────────────

/// Builds one AND-ed `LIKE`/range clause per filter value, with bind
/// parameters in matching order. Blank values are skipped; an unknown size
/// label becomes a clause that matches nothing, so a bogus filter narrows
/// to empty instead of being silently ignored.
fn filter_clauses(
    filters: &std::collections::BTreeMap<FilterField, Vec<String>>,
) -> (Vec<String>, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for (field, values) in filters {
        for value in values {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            if *field == FilterField::Size {
                push_size_clause(trimmed, &mut clauses, &mut params);
                continue;
            }
            let Some(column) = field.column() else {
                continue;
            };
            let pattern = if field.prefix_match() {
                format!("{}%", escape_like(trimmed))
            } else {
                format!("%{}%", escape_like(trimmed))
            };
            clauses.push(format!("i.{column} LIKE ? ESCAPE '\\'"));
            params.push(Value::Text(pattern));
        }
    }
    (clauses, params)
}

fn push_size_clause(label: &str, clauses: &mut Vec<String>, params: &mut Vec<Value>) {
    let Some(bucket) = SizeBucket::from_label(&label.to_ascii_lowercase()) else {
        clauses.push("0 = 1".to_owned());
        return;
    };
    let (lo, hi) = bucket.byte_range();
    match hi {
        Some(hi) => {
            clauses.push("(i.size >= ? AND i.size < ?)".to_owned());
            params.push(Value::Integer(i64::try_from(lo).unwrap_or(i64::MAX)));
            params.push(Value::Integer(i64::try_from(hi).unwrap_or(i64::MAX)));
        }
        None => {
            clauses.push("i.size >= ?".to_owned());
            params.push(Value::Integer(i64::try_from(lo).unwrap_or(i64::MAX)));
        }
    }
}

fn push_page_params(params: &mut Vec<Value>, request: &SearchRequest) {
    params.push(Value::Integer(
        i64::try_from(request.limit).unwrap_or(i64::MAX),
    ));
    params.push(Value::Integer(
        i64::try_from(request.offset).unwrap_or(i64::MAX),
    ));
}

/// Escapes `LIKE` metacharacters so filter values match literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Errors raised while evaluating a MATCH expression are almost always the
/// FTS5 parser objecting to the expression itself; surface those as
/// [`CatalogError::QuerySyntax`] so the caller can degrade gracefully.
fn classify_match_error(expr: &str, err: rusqlite::Error) -> CatalogError {
    let detail = err.to_string();
    let lowered = detail.to_ascii_lowercase();
    if lowered.contains("fts5") || lowered.contains("syntax error") {
        CatalogError::QuerySyntax {
            query: expr.to_owned(),
            detail,
        }
    } else {
        storage_error("search.query")(err)
    }
}

fn qualified_item_columns() -> String {
    ITEM_COLUMNS
        .split(", ")
        .map(|column| format!("i.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Tests ──────────────────────────────────────────────────────────────────
