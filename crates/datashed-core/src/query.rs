//! Query-side primitives: filterable fields, size buckets, token
//! sanitization into FTS5 MATCH expressions, and the frozen signature used
//! as the result-cache key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest query text the engine will look at; anything beyond is truncated
/// on a char boundary before tokenization.
pub const MAX_QUERY_LENGTH: usize = 1_024;

// ─── Filter fields ──────────────────────────────────────────────────────────

/// A field a search filter or suggestion can target.
///
/// All variants except [`FilterField::Size`] map to a text column on the
/// items table. `Size` is synthetic: its values are the fixed
/// [`SizeBucket`] labels and it filters as a byte range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Name,
    Project,
    Tags,
    Description,
    Format,
    Source,
    Category,
    SpatialCoverage,
    TemporalCoverage,
    AccessMethod,
    StorageLocation,
    Reference,
    SpatialResolution,
    TemporalResolution,
    Size,
}

/// Fields offered by autocomplete.
pub const SUGGESTIBLE_FIELDS: &[FilterField] = &[
    FilterField::Project,
    FilterField::Tags,
    FilterField::Format,
    FilterField::Source,
    FilterField::Category,
    FilterField::Size,
];

impl FilterField {
    /// Stable lowercase identifier, used in the usage table and UI strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Project => "project",
            Self::Tags => "tags",
            Self::Description => "description",
            Self::Format => "format",
            Self::Source => "source",
            Self::Category => "category",
            Self::SpatialCoverage => "spatial_coverage",
            Self::TemporalCoverage => "temporal_coverage",
            Self::AccessMethod => "access_method",
            Self::StorageLocation => "storage_location",
            Self::Reference => "reference",
            Self::SpatialResolution => "spatial_resolution",
            Self::TemporalResolution => "temporal_resolution",
            Self::Size => "size",
        }
    }

    /// Parses the identifier produced by [`FilterField::as_str`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "project" => Some(Self::Project),
            "tags" | "tag" => Some(Self::Tags),
            "description" => Some(Self::Description),
            "format" => Some(Self::Format),
            "source" => Some(Self::Source),
            "category" => Some(Self::Category),
            "spatial_coverage" => Some(Self::SpatialCoverage),
            "temporal_coverage" => Some(Self::TemporalCoverage),
            "access_method" => Some(Self::AccessMethod),
            "storage_location" => Some(Self::StorageLocation),
            "reference" => Some(Self::Reference),
            "spatial_resolution" => Some(Self::SpatialResolution),
            "temporal_resolution" => Some(Self::TemporalResolution),
            "size" => Some(Self::Size),
            _ => None,
        }
    }

    /// The items-table column this field filters on, or `None` for the
    /// synthetic `size` field.
    #[must_use]
    pub const fn column(self) -> Option<&'static str> {
        match self {
            Self::Name => Some("name"),
            Self::Project => Some("project"),
            Self::Tags => Some("tags"),
            Self::Description => Some("description"),
            Self::Format => Some("format"),
            Self::Source => Some("source"),
            Self::Category => Some("category"),
            Self::SpatialCoverage => Some("spatial_coverage"),
            Self::TemporalCoverage => Some("temporal_coverage"),
            Self::AccessMethod => Some("access_method"),
            Self::StorageLocation => Some("storage_location"),
            Self::Reference => Some("reference"),
            Self::SpatialResolution => Some("spatial_resolution"),
            Self::TemporalResolution => Some("temporal_resolution"),
            Self::Size => None,
        }
    }

    /// Whether the field matches by prefix instead of containment.
    #[must_use]
    pub const fn prefix_match(self) -> bool {
        matches!(self, Self::Project)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Size buckets ───────────────────────────────────────────────────────────

const MB: u64 = 1_000_000;
const GB: u64 = 1_000_000_000;

/// Fixed size classification offered for the synthetic `size` filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    Tiny,
    Small,
    Medium,
    Large,
    Xl,
}

/// All buckets in ascending size order.
pub const SIZE_BUCKETS: &[SizeBucket] = &[
    SizeBucket::Tiny,
    SizeBucket::Small,
    SizeBucket::Medium,
    SizeBucket::Large,
    SizeBucket::Xl,
];

impl SizeBucket {
    /// The filter value users see and type.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xl => "xl",
        }
    }

    /// Parses a bucket label (exact, lowercase).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        SIZE_BUCKETS.iter().copied().find(|b| b.label() == label)
    }

    /// Inclusive lower bound and exclusive upper bound in bytes. The upper
    /// bound is `None` for the open-ended top bucket.
    #[must_use]
    pub const fn byte_range(self) -> (u64, Option<u64>) {
        match self {
            Self::Tiny => (0, Some(10 * MB)),
            Self::Small => (10 * MB, Some(100 * MB)),
            Self::Medium => (100 * MB, Some(GB)),
            Self::Large => (GB, Some(10 * GB)),
            Self::Xl => (10 * GB, None),
        }
    }

    /// Human-readable range for suggestion display.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Tiny => "less than 10 MB",
            Self::Small => "10 MB to 100 MB",
            Self::Medium => "100 MB to 1 GB",
            Self::Large => "1 GB to 10 GB",
            Self::Xl => "10 GB or more",
        }
    }

    /// Classifies an actual byte count.
    #[must_use]
    pub fn bucket_for(size: u64) -> Self {
        for bucket in SIZE_BUCKETS {
            let (low, high) = bucket.byte_range();
            let above_low = size >= low;
            let below_high = match high {
                Some(h) => size < h,
                None => true,
            };
            if above_low && below_high {
                return *bucket;
            }
        }
        Self::Xl
    }
}

// ─── Text tokenization ──────────────────────────────────────────────────────

/// Builds an FTS5 MATCH expression from free text, or `None` when no token
/// survives (the query then degrades to filter-only mode).
///
/// Rules: whitespace tokenization; tokens shorter than 2 characters are
/// dropped; each survivor is reduced to its alphanumeric/`.`/`_` characters
/// and lowercased. A purely alphanumeric survivor becomes a prefix term
/// (`tok*`); a survivor containing `.` or `_` would not parse as an FTS5
/// bareword, so it is exact-quoted instead.
#[must_use]
pub fn match_expression(text: &str) -> Option<String> {
    let mut clauses = Vec::new();
    for token in truncate_on_char_boundary(text, MAX_QUERY_LENGTH).split_whitespace() {
        if token.chars().count() < 2 {
            continue;
        }
        let survivor: String = token
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_')
            .flat_map(char::to_lowercase)
            .collect();
        if survivor.is_empty() {
            continue;
        }
        if survivor.chars().all(char::is_alphanumeric) {
            clauses.push(format!("{survivor}*"));
        } else {
            clauses.push(format!("\"{survivor}\""));
        }
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" "))
    }
}

fn truncate_on_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ─── Search request and cache signature ─────────────────────────────────────

/// One search call: free text plus per-field filter values.
///
/// Multiple values for the same field are AND-ed (every value must match);
/// this mirrors the product's observed facet behavior and is covered by a
/// regression test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text portion; may be empty.
    pub text: String,
    /// Per-field filter values.
    pub filters: BTreeMap<FilterField, Vec<String>>,
    /// Page size.
    pub limit: usize,
    /// Page start; only `offset == 0` results are cacheable.
    pub offset: usize,
}

impl SearchRequest {
    /// Creates a request with the default page shape.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: BTreeMap::new(),
            limit: 50,
            offset: 0,
        }
    }

    /// Adds one filter value for a field.
    #[must_use]
    pub fn with_filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.filters.entry(field).or_default().push(value.into());
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page start.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Frozen, hashable identity of this request for the first-page cache:
    /// the normalized match expression, the sorted deduplicated filter
    /// tuples (values compared case-insensitively), and the page size.
    #[must_use]
    pub fn signature(&self) -> QuerySignature {
        let mut filters: Vec<(FilterField, String)> = self
            .filters
            .iter()
            .flat_map(|(field, values)| {
                values
                    .iter()
                    .map(move |value| (*field, value.to_lowercase()))
            })
            .collect();
        filters.sort();
        filters.dedup();
        QuerySignature {
            match_expr: match_expression(&self.text),
            filters,
            limit: self.limit,
        }
    }
}

/// Hashable cache key derived from a [`SearchRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    match_expr: Option<String>,
    filters: Vec<(FilterField, String)>,
    limit: usize,
}
