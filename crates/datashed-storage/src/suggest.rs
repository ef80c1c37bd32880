//! Filter-value autocomplete.
//!
//! Candidates come from the distinct values currently indexed for a field
//! (or the fixed bucket labels for the synthetic `size` field) and are
//! ranked by a deterministic blend of prefix affinity, historical usage
//! frequency, usage recency, and alphabetical position:
//!
//! ```text
//! score = 2.0 * prefix + 1.5 * frequency + 1.2 * recency + 0.5 * alphabetical
//! ```
//!
//! `frequency` and `recency` are normalized against the maximum count and
//! `last_used_at` among the surviving candidates, with denominators floored
//! at 1 so an unused field never divides by zero. The weights are part of
//! the observable contract; tests pin them exactly.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use datashed_core::CatalogResult;
use datashed_core::query::{FilterField, SIZE_BUCKETS, SUGGESTIBLE_FIELDS, SizeBucket};
use serde::Serialize;

use crate::connection::{IndexStore, storage_error};

// ─── Distinct candidate values ──────────────────────────────────────────────

impl IndexStore {
    /// Distinct values currently present for `field`, deduplicated
    /// case-insensitively (first-seen casing wins) and sorted
    /// case-insensitively.
    ///
    /// The `tags` field is stored whitespace-joined, so its rows are split
    /// into individual tag candidates. The synthetic `size` field has no
    /// backing column; its candidates are the fixed bucket labels, which
    /// the ranker supplies itself, so this returns nothing for it.
    pub fn distinct_values(&self, field: FilterField) -> CatalogResult<Vec<String>> {
        let raw = match field {
            FilterField::Size => Vec::new(),
            FilterField::Tags => self.tag_values()?,
            other => {
                let Some(column) = other.column() else {
                    return Ok(Vec::new());
                };
                self.column_values(column)?
            }
        };
        Ok(dedupe_case_insensitive(raw))
    }

    fn column_values(&self, column: &'static str) -> CatalogResult<Vec<String>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT DISTINCT {column} FROM items WHERE {column} <> '' ORDER BY {column}"
            ))
            .map_err(storage_error("distinct_values"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_error("distinct_values"))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row.map_err(storage_error("distinct_values"))?);
        }
        Ok(values)
    }

    fn tag_values(&self) -> CatalogResult<Vec<String>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare("SELECT tags FROM items WHERE tags <> '' ORDER BY path")
            .map_err(storage_error("distinct_values"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_error("distinct_values"))?;
        let mut values = Vec::new();
        for row in rows {
            let joined: String = row.map_err(storage_error("distinct_values"))?;
            values.extend(joined.split_whitespace().map(str::to_owned));
        }
        Ok(values)
    }
}

fn dedupe_case_insensitive(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out: Vec<String> = values
        .into_iter()
        .filter(|value| seen.insert(value.to_lowercase()))
        .collect();
    out.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
    out
}

// ─── Suggestions ────────────────────────────────────────────────────────────

/// One ranked autocomplete entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Field the value belongs to.
    pub field: FilterField,
    /// The value to insert into the filter.
    pub value: String,
    /// Extra display text, e.g. the byte range behind a size bucket label.
    pub display_meta: Option<String>,
    /// Blended relevance; comparable only within one `suggest` call.
    pub score: f64,
}

/// Ranks filter-value suggestions against an [`IndexStore`].
#[derive(Debug)]
pub struct SuggestionRanker {
    store: Arc<IndexStore>,
}

impl SuggestionRanker {
    #[must_use]
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self { store }
    }

    /// Returns up to `max` suggestions matching `typed`, best first.
    ///
    /// With a concrete `field` only that field's values are offered; with
    /// `None` every suggestible field contributes and the blended scores
    /// decide the interleaving. Matching is case-insensitive containment,
    /// except the `size` labels which match by prefix only.
    pub fn suggest(
        &self,
        field: Option<FilterField>,
        typed: &str,
        max: usize,
    ) -> CatalogResult<Vec<Suggestion>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let typed_lower = typed.trim().to_lowercase();
        let fields: &[FilterField] = match field {
            Some(ref concrete) => std::slice::from_ref(concrete),
            None => SUGGESTIBLE_FIELDS,
        };

        let mut results = Vec::new();
        for field in fields {
            results.extend(self.score_field(*field, &typed_lower)?);
        }
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.field.as_str().cmp(b.field.as_str()))
                .then_with(|| a.value.cmp(&b.value))
        });
        results.truncate(max);
        tracing::trace!(
            target: "datashed::suggest",
            op = "suggest",
            typed = %typed,
            result_count = results.len(),
            "ranked suggestions"
        );
        Ok(results)
    }

    /// Records that a filter value was actually exercised by a query,
    /// feeding the frequency and recency components of future rankings.
    pub fn track(&self, field: FilterField, value: &str) -> CatalogResult<()> {
        self.store.record_usage(field, value)
    }

    fn score_field(
        &self,
        field: FilterField,
        typed_lower: &str,
    ) -> CatalogResult<Vec<Suggestion>> {
        let mut candidates = self.candidates(field, typed_lower)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        // The alphabetical component is positional, so order the candidate
        // set before scoring.
        candidates.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));

        let usage: HashMap<String, (u64, i64)> = self
            .store
            .usage_for_field(field)?
            .into_iter()
            .map(|row| (row.value.clone(), (row.count, row.last_used_at)))
            .collect();
        let lookup =
            |value: &str| usage.get(&value.to_lowercase()).copied().unwrap_or((0, 0));

        let max_count = candidates
            .iter()
            .map(|c| lookup(c).0)
            .max()
            .unwrap_or(0)
            .max(1);
        let max_last_used = candidates
            .iter()
            .map(|c| lookup(c).1)
            .max()
            .unwrap_or(0)
            .max(1);
        let len = candidates.len();

        Ok(candidates
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let (count, last_used) = lookup(value);
                let prefix = if value.to_lowercase().starts_with(typed_lower) {
                    1.0
                } else {
                    0.0
                };
                let frequency = count as f64 / max_count as f64;
                let recency = last_used as f64 / max_last_used as f64;
                let alphabetical = 1.0 - idx as f64 / len as f64;
                Suggestion {
                    field,
                    value: value.clone(),
                    display_meta: display_meta(field, value),
                    score: 2.0 * prefix
                        + 1.5 * frequency
                        + 1.2 * recency
                        + 0.5 * alphabetical,
                }
            })
            .collect())
    }

    fn candidates(&self, field: FilterField, typed_lower: &str) -> CatalogResult<Vec<String>> {
        if field == FilterField::Size {
            return Ok(SIZE_BUCKETS
                .iter()
                .map(|bucket| bucket.label().to_owned())
                .filter(|label| label.starts_with(typed_lower))
                .collect());
        }
        let values = self.store.distinct_values(field)?;
        Ok(values
            .into_iter()
            .filter(|value| value.to_lowercase().contains(typed_lower))
            .collect())
    }
}

fn display_meta(field: FilterField, value: &str) -> Option<String> {
    if field != FilterField::Size {
        return None;
    }
    SizeBucket::from_label(value).map(|bucket| bucket.describe().to_owned())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
