use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

/// One dataset record, keyed by its remote path.
///
/// `path` is the globally unique identifier (typically the dataset's folder
/// name in the catalog tree); every write is an upsert keyed on it. Text
/// fields default to empty strings rather than NULL so filter SQL stays
/// uniform. `created_at`/`updated_at` are set by the store on write and are
/// ignored when deciding whether an upsert actually changed anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique remote identifier and primary key.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Optional grouping label (empty when unset).
    #[serde(default)]
    pub project: String,
    /// Free-form, space-joined token set.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub spatial_coverage: String,
    #[serde(default)]
    pub temporal_coverage: String,
    #[serde(default)]
    pub access_method: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub spatial_resolution: String,
    #[serde(default)]
    pub temporal_resolution: String,
    /// Size in bytes, when the remote reports one.
    #[serde(default)]
    pub size: Option<u64>,
    /// Remote modification time, unix seconds.
    #[serde(default)]
    pub mtime: Option<i64>,
    /// Remote change token, when the source provides one.
    #[serde(default)]
    pub etag: Option<String>,
    /// Whether this row was sourced from the remote catalog (as opposed to a
    /// purely local draft). Remote rows are cleared and re-filled by a full
    /// reindex; drafts survive.
    #[serde(default)]
    pub is_remote: bool,
    /// Set by the store on first insert, unix seconds.
    #[serde(default)]
    pub created_at: i64,
    /// Set by the store on every write, unix seconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl CatalogItem {
    /// Creates a remote-sourced item with the required identity fields.
    #[must_use]
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            is_remote: true,
            ..Self::default()
        }
    }

    /// Fallback record built from listing data alone, used when an entry's
    /// descriptor cannot be fetched. Navigation never silently loses entries.
    #[must_use]
    pub fn bare(entry: &RemoteEntry) -> Self {
        Self {
            size: entry.size,
            mtime: entry.modified,
            ..Self::new(entry.name.clone(), entry.name.clone())
        }
    }

    /// Sets the grouping label.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Sets the space-joined tag set.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the size in bytes.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the remote modification time (unix seconds).
    #[must_use]
    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Marks the record as a local draft rather than a remote-sourced row.
    #[must_use]
    pub fn local_draft(mut self) -> Self {
        self.is_remote = false;
        self
    }

    /// Content equality, ignoring the store-managed timestamps. An upsert
    /// whose payload is `same_content` as the stored row is a no-op.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.created_at = 0;
        a.updated_at = 0;
        b.created_at = 0;
        b.updated_at = 0;
        a == b
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A catalog item paired with its relevance score.
///
/// Ranked full-text results carry a BM25-derived score (higher is better);
/// filter-only results carry 0.0 and are ordered by recency instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// The matching record.
    pub item: CatalogItem,
    /// Relevance score; comparable only within one result set.
    pub score: f64,
}

impl ScoredItem {
    /// Pairs an item with its score.
    #[must_use]
    pub fn new(item: CatalogItem, score: f64) -> Self {
        Self { item, score }
    }
}

// ---------------------------------------------------------------------------
// Remote listing
// ---------------------------------------------------------------------------

/// One entry of a remote catalog listing.
///
/// Datasets are directories; stray files in the catalog root are skipped by
/// the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Entry name; doubles as the catalog path for directory entries.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Size in bytes, when the listing reports one.
    pub size: Option<u64>,
    /// Modification time, unix seconds, when the listing reports one.
    pub modified: Option<i64>,
}

impl RemoteEntry {
    /// Creates a directory entry (the common case for datasets).
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            size: None,
            modified: None,
        }
    }

    /// Creates a plain-file entry.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            size: None,
            modified: None,
        }
    }

    /// Sets the reported size.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the reported modification time (unix seconds).
    #[must_use]
    pub fn with_modified(mut self, modified: i64) -> Self {
        self.modified = Some(modified);
        self
    }
}
