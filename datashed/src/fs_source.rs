//! Filesystem catalog source.
//!
//! Reads the catalog straight out of the git working tree: every top-level
//! directory under the catalog root is a dataset, and each may carry a
//! descriptor document (`dataset.yaml` by default) with its metadata.

use std::path::PathBuf;

use datashed_core::descriptor::DatasetDescriptor;
use datashed_core::error::CatalogError;
use datashed_core::traits::{CatalogFuture, CatalogSource};
use datashed_core::types::RemoteEntry;

/// [`CatalogSource`] over a local checkout directory.
#[derive(Debug, Clone)]
pub struct FsCatalogSource {
    root: PathBuf,
    descriptor_filename: String,
}

impl FsCatalogSource {
    pub fn new(root: impl Into<PathBuf>, descriptor_filename: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            descriptor_filename: descriptor_filename.into(),
        }
    }
}

impl CatalogSource for FsCatalogSource {
    fn id(&self) -> &'static str {
        "fs"
    }

    fn list(&self) -> CatalogFuture<'_, Vec<RemoteEntry>> {
        Box::pin(async move {
            let mut dir = tokio::fs::read_dir(&self.root).await?;
            let mut entries = Vec::new();
            while let Some(dir_entry) = dir.next_entry().await? {
                let name = dir_entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let metadata = match dir_entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        // Broken symlinks and the like: drop the entry, keep
                        // the listing.
                        tracing::warn!(
                            target: "datashed::indexer",
                            path = %name,
                            error = %err,
                            "skipping unreadable catalog entry"
                        );
                        continue;
                    }
                };
                let mut entry = if metadata.is_dir() {
                    RemoteEntry::directory(name)
                } else {
                    RemoteEntry::file(name).with_size(metadata.len())
                };
                entry.modified = unix_seconds(&metadata);
                entries.push(entry);
            }
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(entries)
        })
    }

    fn descriptor<'a>(
        &'a self,
        entry: &'a RemoteEntry,
    ) -> CatalogFuture<'a, Option<DatasetDescriptor>> {
        Box::pin(async move {
            let path = self.root.join(&entry.name).join(&self.descriptor_filename);
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => Ok(Some(DatasetDescriptor::parse(&text))),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(CatalogError::PartialIndex {
                    path: entry.name.clone(),
                    detail: err.to_string(),
                }),
            }
        })
    }
}

fn unix_seconds(metadata: &std::fs::Metadata) -> Option<i64> {
    let modified = metadata.modified().ok()?;
    let secs = modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    i64::try_from(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(dir: &tempfile::TempDir) -> FsCatalogSource {
        FsCatalogSource::new(dir.path(), "dataset.yaml")
    }

    #[tokio::test]
    async fn lists_entries_sorted_with_hidden_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("wind")).expect("mkdir");
        std::fs::create_dir(dir.path().join("sst")).expect("mkdir");
        std::fs::create_dir(dir.path().join(".git")).expect("mkdir");
        std::fs::write(dir.path().join("README.md"), "hello").expect("write");

        let entries = source(&dir).list().await.expect("list");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "sst", "wind"]);

        let readme = &entries[0];
        assert!(!readme.is_directory);
        assert_eq!(readme.size, Some(5));
        assert!(readme.modified.is_some());

        assert!(entries[1].is_directory);
        assert_eq!(entries[1].size, None);
    }

    #[tokio::test]
    async fn descriptor_is_parsed_from_the_entry_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("sst")).expect("mkdir");
        std::fs::write(
            dir.path().join("sst/dataset.yaml"),
            "name: Sea Surface Temperature\ntags: [ocean, daily]\n",
        )
        .expect("write descriptor");

        let entry = RemoteEntry::directory("sst");
        let descriptor = source(&dir)
            .descriptor(&entry)
            .await
            .expect("descriptor")
            .expect("present");
        assert_eq!(descriptor.name.as_deref(), Some("Sea Surface Temperature"));
        assert_eq!(descriptor.tags, vec!["ocean", "daily"]);
    }

    #[tokio::test]
    async fn missing_descriptor_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("bare")).expect("mkdir");

        let entry = RemoteEntry::directory("bare");
        let descriptor = source(&dir).descriptor(&entry).await.expect("descriptor");
        assert!(descriptor.is_none());
    }

    #[tokio::test]
    async fn unreadable_descriptor_is_a_partial_index_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the descriptor file should be: present but not
        // readable as a file.
        std::fs::create_dir_all(dir.path().join("odd/dataset.yaml")).expect("mkdir");

        let entry = RemoteEntry::directory("odd");
        let err = source(&dir)
            .descriptor(&entry)
            .await
            .expect_err("must fail");
        match err {
            CatalogError::PartialIndex { path, .. } => assert_eq!(path, "odd"),
            other => panic!("expected partial index error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_a_missing_root_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = FsCatalogSource::new(dir.path().join("nope"), "dataset.yaml");
        assert!(missing.list().await.is_err());
    }
}
