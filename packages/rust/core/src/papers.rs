//! Paper enrichment pipeline: taxonomy resolution followed by an
//! engine pass over the paper set.

use std::sync::Arc;

use tracing::{info, warn};

use paperatlas_shared::{Annotate, EngineConfig, PaperRecord, Result, RunSummary};
use paperatlas_source::paper_items;
use paperatlas_store::CheckpointStore;

use crate::engine::{EnrichmentProgress, can_skip, run_enrichment};
use crate::taxonomy::{default_taxonomy, normalize_taxonomy};

/// Enrich a paper set. Returns the run summary and the taxonomy used.
///
/// The shared taxonomy is resolved first (reused or regenerated, see
/// [`resolve_taxonomy`]), persisted, and handed to every work item so
/// all papers in a run are tagged against the same category set.
pub async fn enrich_papers(
    papers: &[PaperRecord],
    annotator: Arc<dyn Annotate>,
    store: Arc<CheckpointStore>,
    config: EngineConfig,
    progress: Arc<dyn EnrichmentProgress>,
) -> Result<(RunSummary, Vec<String>)> {
    if papers.is_empty() {
        info!("no papers to enrich");
        return Ok((RunSummary::default(), store.taxonomy().await));
    }

    let taxonomy = resolve_taxonomy(papers, annotator.as_ref(), &store).await;
    store.set_taxonomy(taxonomy.clone()).await?;

    let items = paper_items(papers, &taxonomy);
    let summary = run_enrichment(items, annotator, store, config, progress).await?;
    Ok((summary, taxonomy))
}

/// Decide which taxonomy this run uses.
///
/// A stored taxonomy is reused when most of the work is already done —
/// fewer than half the papers pending — so incremental runs do not
/// re-tag existing results against a shifted category set. Otherwise a
/// fresh proposal is generated from the full title list; if the model
/// cannot produce one, the stored set (or the built-in fallback) is used.
async fn resolve_taxonomy(
    papers: &[PaperRecord],
    annotator: &dyn Annotate,
    store: &CheckpointStore,
) -> Vec<String> {
    let existing = store.taxonomy().await;
    let snapshot = store.snapshot().await;

    let pending = paper_items(papers, &existing)
        .iter()
        .filter(|item| !can_skip(item, snapshot.get(&item.id)))
        .count();

    if !existing.is_empty() && pending * 2 < papers.len() {
        info!(
            categories = existing.len(),
            pending,
            total = papers.len(),
            "reusing stored taxonomy"
        );
        return existing;
    }

    match annotator.propose_taxonomy(papers).await {
        Ok(proposed) => {
            let normalized = normalize_taxonomy(proposed);
            if normalized.is_empty() {
                warn!("taxonomy proposal normalized to nothing, using fallback");
                fallback_taxonomy(existing)
            } else {
                info!(categories = normalized.len(), "generated taxonomy");
                normalized
            }
        }
        Err(e) => {
            warn!(error = %e, "taxonomy proposal failed, using fallback");
            fallback_taxonomy(existing)
        }
    }
}

fn fallback_taxonomy(existing: Vec<String>) -> Vec<String> {
    if existing.is_empty() {
        default_taxonomy()
    } else {
        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use paperatlas_shared::{
        AnnotationError, EnrichmentPayload, EnrichmentResult, ItemContext, PaperEnrichment,
        WorkItem,
    };

    use crate::engine::SilentProgress;

    fn paper(title: &str, pdf_url: Option<&str>) -> PaperRecord {
        PaperRecord {
            title: title.into(),
            authors: "Alice".into(),
            relevance_score: 90.0,
            pdf_url: pdf_url.map(String::from),
            session: None,
        }
    }

    /// Echoes back the first category it was asked to tag against.
    struct TaggingAnnotate {
        taxonomy: std::result::Result<Vec<String>, AnnotationError>,
        proposals: AtomicUsize,
    }

    impl TaggingAnnotate {
        fn proposing(categories: &[&str]) -> Self {
            Self {
                taxonomy: Ok(categories.iter().map(|c| c.to_string()).collect()),
                proposals: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                taxonomy: Err(AnnotationError::Unreachable("down".into())),
                proposals: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Annotate for TaggingAnnotate {
        async fn annotate(
            &self,
            item: &WorkItem,
        ) -> std::result::Result<EnrichmentPayload, AnnotationError> {
            let ItemContext::Paper { categories, .. } = &item.context else {
                panic!("paper pipeline produced a non-paper item");
            };
            Ok(EnrichmentPayload::Paper(PaperEnrichment {
                key_findings: "f".into(),
                description: "d".into(),
                key_contribution: "c".into(),
                novelty: "n".into(),
                categories: vec![categories.first().cloned().unwrap_or_default()],
            }))
        }

        async fn propose_taxonomy(
            &self,
            _papers: &[PaperRecord],
        ) -> std::result::Result<Vec<String>, AnnotationError> {
            self.proposals.fetch_add(1, Ordering::SeqCst);
            self.taxonomy.clone()
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            workers: 4,
            max_attempts: 1,
            backoff_base_ms: 1,
            backoff_multiplier: 1.0,
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> Arc<CheckpointStore> {
        Arc::new(
            CheckpointStore::open(dir.path().join("enriched.json"))
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn first_run_generates_and_persists_taxonomy() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let papers = vec![paper("A", None), paper("B", None)];

        let annotator = Arc::new(TaggingAnnotate::proposing(&["Agents", "agents", " RL "]));
        let (summary, taxonomy) = enrich_papers(
            &papers,
            annotator.clone(),
            store.clone(),
            config(),
            Arc::new(SilentProgress),
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(taxonomy, vec!["Agents", "RL"]);
        assert_eq!(store.taxonomy().await, vec!["Agents", "RL"]);
        assert_eq!(annotator.proposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mostly_complete_run_reuses_stored_taxonomy() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.set_taxonomy(vec!["Agents".into()]).await.unwrap();

        // 3 of 4 already complete: only a minority is pending.
        let papers: Vec<PaperRecord> =
            ["A", "B", "C", "D"].iter().map(|t| paper(t, None)).collect();
        for title in ["A", "B", "C"] {
            store
                .upsert(EnrichmentResult::success(
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
                ))
                .await
                .unwrap();
        }

        let annotator = Arc::new(TaggingAnnotate::proposing(&["Something Else"]));
        let (summary, taxonomy) = enrich_papers(
            &papers,
            annotator.clone(),
            store,
            config(),
            Arc::new(SilentProgress),
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(taxonomy, vec!["Agents"]);
        assert_eq!(annotator.proposals.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_proposal_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let papers = vec![paper("A", None)];

        let (summary, taxonomy) = enrich_papers(
            &papers,
            Arc::new(TaggingAnnotate::failing()),
            store,
            config(),
            Arc::new(SilentProgress),
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(taxonomy, default_taxonomy());
    }

    #[tokio::test]
    async fn empty_paper_set_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let (summary, taxonomy) = enrich_papers(
            &[],
            Arc::new(TaggingAnnotate::proposing(&["Agents"])),
            store,
            config(),
            Arc::new(SilentProgress),
        )
        .await
        .unwrap();

        assert_eq!(summary.total_items, 0);
        assert!(taxonomy.is_empty());
    }
}
