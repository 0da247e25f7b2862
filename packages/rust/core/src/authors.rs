//! Author enrichment pipeline: key-author selection over the paper set,
//! then an engine pass with the author-sized worker pool.

use std::sync::Arc;

use tracing::info;

use paperatlas_shared::{Annotate, AuthorStats, EngineConfig, PaperRecord, Result, RunSummary};
use paperatlas_source::{analyze_authors, author_items, key_authors};
use paperatlas_store::CheckpointStore;

use crate::engine::{EnrichmentProgress, run_enrichment};

/// Enrich the key authors of a paper set.
///
/// An author is key when at least one of their papers scores at or above
/// `highly_relevant_threshold`; papers with more than three listed
/// authors contribute only their first, second, and last author.
pub async fn enrich_authors(
    papers: &[PaperRecord],
    highly_relevant_threshold: f64,
    annotator: Arc<dyn Annotate>,
    store: Arc<CheckpointStore>,
    config: EngineConfig,
    progress: Arc<dyn EnrichmentProgress>,
) -> Result<RunSummary> {
    let authors = select_key_authors(papers, highly_relevant_threshold);
    info!(
        papers = papers.len(),
        key_authors = authors.len(),
        "selected key authors"
    );

    let items = author_items(&authors);
    run_enrichment(items, annotator, store, config, progress).await
}

/// Key-author selection, exposed for reporting (`--dry-run` listings).
pub fn select_key_authors(papers: &[PaperRecord], threshold: f64) -> Vec<AuthorStats> {
    key_authors(analyze_authors(papers, true, threshold))
}
