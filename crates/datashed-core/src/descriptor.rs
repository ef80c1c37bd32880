//! Dataset descriptor documents.
//!
//! Each catalog entry carries a small flat YAML document (`dataset.yaml`)
//! describing the dataset. Only a YAML subset appears in practice: top-level
//! `key: value` scalars, inline `[a, b]` lists, indented `- item` lists, and
//! `|` block scalars. Parsing is tolerant by contract: unknown keys are
//! ignored, missing keys default to absent, and a malformed line never fails
//! the whole document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{CatalogItem, RemoteEntry};

/// Parsed descriptor fields consumed by the indexer. Every field is
/// optional; [`DatasetDescriptor::into_item`] falls back to listing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub name: Option<String>,
    pub description: Option<String>,
    /// From `tags`, or `keywords` when `tags` is absent.
    #[serde(default)]
    pub tags: Vec<String>,
    /// From `project`, or the first entry of `used_in_projects`.
    pub project: Option<String>,
    /// From `format`, or `file_format` when `format` is absent.
    pub format: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub spatial_coverage: Option<String>,
    pub temporal_coverage: Option<String>,
    pub access_method: Option<String>,
    pub storage_location: Option<String>,
    pub reference: Option<String>,
    pub spatial_resolution: Option<String>,
    pub temporal_resolution: Option<String>,
    /// Declared size in bytes, when the descriptor carries a plain number.
    pub size: Option<u64>,
}

impl DatasetDescriptor {
    /// Parses a flat YAML descriptor document. Never fails; anything the
    /// subset grammar cannot read is simply absent from the result.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let fields = parse_fields(text);
        Self {
            name: scalar(&fields, &["name"]),
            description: scalar(&fields, &["description"]),
            tags: token_list(&fields, &["tags", "keywords"]),
            project: scalar(&fields, &["project"])
                .or_else(|| first_of_list(&fields, "used_in_projects")),
            format: scalar(&fields, &["format", "file_format"]),
            source: scalar(&fields, &["source"]),
            category: scalar(&fields, &["category"]),
            spatial_coverage: scalar(&fields, &["spatial_coverage"]),
            temporal_coverage: scalar(&fields, &["temporal_coverage"]),
            access_method: scalar(&fields, &["access_method"]),
            storage_location: scalar(&fields, &["storage_location"]),
            reference: scalar(&fields, &["reference"]),
            spatial_resolution: scalar(&fields, &["spatial_resolution"]),
            temporal_resolution: scalar(&fields, &["temporal_resolution"]),
            size: scalar(&fields, &["size"]).and_then(|raw| raw.trim().parse().ok()),
        }
    }

    /// Merges descriptor fields over a listing entry. Descriptor values win
    /// where present; the listing supplies identity, size, and mtime
    /// fallbacks so an empty descriptor still yields a navigable item.
    #[must_use]
    pub fn into_item(self, entry: &RemoteEntry) -> CatalogItem {
        CatalogItem {
            size: self.size.or(entry.size),
            mtime: entry.modified,
            name: self.name.unwrap_or_else(|| entry.name.clone()),
            project: self.project.unwrap_or_default(),
            tags: self.tags.join(" "),
            description: self.description.unwrap_or_default(),
            format: self.format.unwrap_or_default(),
            source: self.source.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            spatial_coverage: self.spatial_coverage.unwrap_or_default(),
            temporal_coverage: self.temporal_coverage.unwrap_or_default(),
            access_method: self.access_method.unwrap_or_default(),
            storage_location: self.storage_location.unwrap_or_default(),
            reference: self.reference.unwrap_or_default(),
            spatial_resolution: self.spatial_resolution.unwrap_or_default(),
            temporal_resolution: self.temporal_resolution.unwrap_or_default(),
            ..CatalogItem::new(entry.name.clone(), String::new())
        }
    }
}

// ─── Flat YAML subset ───────────────────────────────────────────────────────

/// A parsed top-level field value.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

/// Parses top-level fields of a flat YAML document into a map.
/// Handles `key: value`, `key: [a, b]`, `key:` + indented `- item` lines,
/// and `key: |` block scalars. Indented keys (nested maps) are skipped.
fn parse_fields(text: &str) -> HashMap<String, FieldValue> {
    let lines: Vec<&str> = text.lines().collect();
    let mut fields = HashMap::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || indent_level(line) > 0 {
            i += 1;
            continue;
        }

        let Some((key, raw_value)) = split_key_value(trimmed) else {
            i += 1;
            continue;
        };
        let value = raw_value.trim();

        if value.is_empty() {
            let (items, consumed) = parse_dash_list(&lines, i + 1);
            if !items.is_empty() {
                fields.insert(key, FieldValue::List(items));
            }
            i += 1 + consumed;
        } else if value == "|" || value == "|-" || value == "|+" {
            let (block, consumed) = parse_block_scalar(&lines, i + 1);
            fields.insert(key, FieldValue::Scalar(block));
            i += 1 + consumed;
        } else if value.starts_with('[') && value.ends_with(']') {
            fields.insert(key, FieldValue::List(parse_inline_list(value)));
            i += 1;
        } else {
            fields.insert(key, FieldValue::Scalar(unquote(value)));
            i += 1;
        }
    }

    fields
}

fn split_key_value(line: &str) -> Option<(String, String)> {
    let colon = line.find(':')?;
    let key = line[..colon].trim();
    if key.is_empty() || key.starts_with('-') || key.contains(' ') {
        return None;
    }
    Some((key.to_owned(), line[colon + 1..].to_owned()))
}

fn indent_level(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Consumes indented `- item` lines following a bare `key:` line.
fn parse_dash_list(lines: &[&str], start: usize) -> (Vec<String>, usize) {
    let mut items = Vec::new();
    let mut consumed = 0;
    for line in &lines[start.min(lines.len())..] {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            consumed += 1;
            continue;
        }
        if indent_level(line) == 0 || !trimmed.starts_with('-') {
            break;
        }
        let item = trimmed.trim_start_matches('-').trim();
        if !item.is_empty() {
            items.push(unquote(item));
        }
        consumed += 1;
    }
    (items, consumed)
}

/// Consumes the indented body of a `key: |` block scalar.
fn parse_block_scalar(lines: &[&str], start: usize) -> (String, usize) {
    let mut body: Vec<String> = Vec::new();
    let mut consumed = 0;
    for line in &lines[start.min(lines.len())..] {
        if !line.trim().is_empty() && indent_level(line) == 0 {
            break;
        }
        body.push(line.trim().to_owned());
        consumed += 1;
    }
    while matches!(body.last(), Some(last) if last.is_empty()) {
        body.pop();
    }
    (body.join("\n"), consumed)
}

fn parse_inline_list(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|item| unquote(item.trim()))
        .filter(|item| !item.is_empty())
        .collect()
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        v[1..v.len() - 1].to_owned()
    } else {
        v.to_owned()
    }
}

// ─── Field accessors ────────────────────────────────────────────────────────

fn scalar(fields: &HashMap<String, FieldValue>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match fields.get(*key) {
            Some(FieldValue::Scalar(value)) if !value.is_empty() => {
                return Some(value.clone());
            }
            _ => {}
        }
    }
    None
}

/// A list-valued field; a scalar under the same key is whitespace-split so
/// `tags: ocean daily` and `tags: [ocean, daily]` read the same.
fn token_list(fields: &HashMap<String, FieldValue>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        match fields.get(*key) {
            Some(FieldValue::List(items)) if !items.is_empty() => return items.clone(),
            Some(FieldValue::Scalar(value)) if !value.is_empty() => {
                return value.split_whitespace().map(str::to_owned).collect();
            }
            _ => {}
        }
    }
    Vec::new()
}

fn first_of_list(fields: &HashMap<String, FieldValue>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(FieldValue::List(items)) => items.first().cloned(),
        Some(FieldValue::Scalar(value)) if !value.is_empty() => Some(value.clone()),
        _ => None,
    }
}
