//! Durable checkpoint store for enrichment results.
//!
//! The store is a single pretty-printed JSON document keyed by item
//! identity. Every `upsert` rewrites the whole document atomically
//! (temp file + rename), so the file on disk is always a complete,
//! self-consistent snapshot: an interruption after N of M items leaves
//! exactly N valid entries. Item counts are modest (tens to low
//! thousands), which makes rewrite-on-every-item cheaper than a log
//! with replay and compaction.
//!
//! The document is meant to be hand-inspectable. An operator may edit an
//! entry (e.g., fix an `"Unknown"` author affiliation); the next run's
//! skip check honors the edit as already-complete.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use paperatlas_shared::{
    CURRENT_SCHEMA_VERSION, EnrichmentResult, PaperAtlasError, Result,
};

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: u32,
    /// Shared category taxonomy, persisted alongside the entries so the
    /// paper pipeline can reuse it across runs.
    #[serde(default)]
    taxonomy: Vec<String>,
    /// Results keyed by item identity. BTreeMap keeps the file diffable.
    #[serde(default)]
    entries: BTreeMap<String, EnrichmentResult>,
}

/// Durable mapping from item identity to its last-known enrichment result.
///
/// All mutation goes through [`CheckpointStore::upsert`] under an internal
/// mutex; this is the only writer-shared resource in the system and the
/// critical section is short (merge, serialize, rename).
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    inner: Mutex<StoreDocument>,
}

impl CheckpointStore {
    /// Open (or create) the store backed by `path`.
    ///
    /// A missing file yields an empty store. A file that exists but cannot
    /// be parsed is fatal — treating corrupt data as empty would silently
    /// discard prior durable work on the next `upsert`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let document = if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| PaperAtlasError::io(&path, e))?;
            let document: StoreDocument = serde_json::from_str(&content)
                .map_err(|e| PaperAtlasError::corrupt_store(&path, e.to_string()))?;
            info!(
                path = %path.display(),
                entries = document.entries.len(),
                "loaded checkpoint store"
            );
            document
        } else {
            debug!(path = %path.display(), "no checkpoint store on disk, starting empty");
            StoreDocument {
                schema_version: CURRENT_SCHEMA_VERSION,
                ..Default::default()
            }
        };

        Ok(Self {
            path,
            inner: Mutex::new(document),
        })
    }

    /// Merge one result into the mapping and durably persist the entire
    /// document before returning. Last write wins per key.
    pub async fn upsert(&self, result: EnrichmentResult) -> Result<()> {
        let mut doc = self.inner.lock().await;
        doc.entries.insert(result.item_id.clone(), result);
        self.persist(&doc).await
    }

    /// Replace the persisted taxonomy and rewrite the document.
    pub async fn set_taxonomy(&self, taxonomy: Vec<String>) -> Result<()> {
        let mut doc = self.inner.lock().await;
        doc.taxonomy = taxonomy;
        self.persist(&doc).await
    }

    /// The persisted category taxonomy (empty before the first paper run).
    pub async fn taxonomy(&self) -> Vec<String> {
        self.inner.lock().await.taxonomy.clone()
    }

    /// Read-only snapshot of all entries.
    pub async fn snapshot(&self) -> BTreeMap<String, EnrichmentResult> {
        self.inner.lock().await.entries.clone()
    }

    /// Look up a single entry by item identity.
    pub async fn get(&self, item_id: &str) -> Option<EnrichmentResult> {
        self.inner.lock().await.entries.get(item_id).cloned()
    }

    /// Number of persisted entries.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full document to a temp file, then rename over the
    /// target. Rename is atomic on the same filesystem, so readers never
    /// observe a half-written snapshot.
    async fn persist(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PaperAtlasError::io(parent, e))?;
            }
        }

        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| PaperAtlasError::validation(format!("serialize store: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| PaperAtlasError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| PaperAtlasError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            entries = doc.entries.len(),
            "checkpoint store persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use paperatlas_shared::{
        AuthorEnrichment, EnrichmentPayload, ItemKind, PaperEnrichment,
    };

    fn paper_result(title: &str) -> EnrichmentResult {
        EnrichmentResult::success(
            title,
            EnrichmentPayload::Paper(PaperEnrichment {
                key_findings: "f".into(),
                description: "d".into(),
                key_contribution: "c".into(),
                novelty: "n".into(),
                categories: vec!["Agents".into()],
            }),
            1,
            None,
        )
    }

    #[tokio::test]
    async fn missing_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("enriched.json"))
            .await
            .unwrap();
        assert!(store.is_empty().await);
        assert!(store.taxonomy().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let err = CheckpointStore::open(&path).await.unwrap_err();
        assert!(matches!(err, PaperAtlasError::CorruptStore { .. }));
    }

    #[tokio::test]
    async fn upsert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.json");

        let store = CheckpointStore::open(&path).await.unwrap();
        store.upsert(paper_result("Paper A")).await.unwrap();
        store.upsert(paper_result("Paper B")).await.unwrap();
        assert_eq!(store.len().await, 2);
        drop(store);

        // A fresh open sees exactly what was persisted.
        let reloaded = CheckpointStore::open(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 2);
        let entry = reloaded.get("Paper A").await.expect("entry present");
        assert!(entry.is_complete());
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("enriched.json"))
            .await
            .unwrap();

        store
            .upsert(EnrichmentResult::failed(
                "Paper A",
                ItemKind::Paper,
                "timeout",
                3,
                None,
            ))
            .await
            .unwrap();
        store.upsert(paper_result("Paper A")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.get("Paper A").await.unwrap().is_complete());
    }

    #[tokio::test]
    async fn taxonomy_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.json");

        let store = CheckpointStore::open(&path).await.unwrap();
        store
            .set_taxonomy(vec!["Agents".into(), "Benchmarks".into()])
            .await
            .unwrap();
        drop(store);

        let reloaded = CheckpointStore::open(&path).await.unwrap();
        assert_eq!(reloaded.taxonomy().await, vec!["Agents", "Benchmarks"]);
    }

    #[tokio::test]
    async fn hand_edited_entry_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched_authors.json");

        let store = CheckpointStore::open(&path).await.unwrap();
        store
            .upsert(EnrichmentResult::success(
                "Jane Doe",
                EnrichmentPayload::Author(AuthorEnrichment {
                    affiliation: "Unknown".into(),
                    role: "Unknown".into(),
                    photo_url: None,
                    profile_url: None,
                }),
                3,
                None,
            ))
            .await
            .unwrap();
        drop(store);

        // Operator fixes the affiliation by editing the file directly.
        let content = std::fs::read_to_string(&path).unwrap();
        let edited = content.replace("\"Unknown\"", "\"ETH Zurich\"");
        std::fs::write(&path, edited).unwrap();

        let reloaded = CheckpointStore::open(&path).await.unwrap();
        let entry = reloaded.get("Jane Doe").await.unwrap();
        assert!(entry.is_complete());
        match entry.payload.unwrap() {
            EnrichmentPayload::Author(a) => assert_eq!(a.affiliation, "ETH Zurich"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.json");

        let store = CheckpointStore::open(&path).await.unwrap();
        store.upsert(paper_result("Paper A")).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
