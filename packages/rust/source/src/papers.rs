//! Paper source: reads scraped conference rows and builds work items.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use paperatlas_shared::{ItemContext, ItemKind, PaperAtlasError, PaperRecord, Result, WorkItem};

/// Load papers from the scraper's CSV export.
///
/// Rows with an empty title are dropped, and duplicate titles keep the
/// first occurrence so identity keys stay unique within a run.
pub fn load_papers(path: impl AsRef<Path>) -> Result<Vec<PaperRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        PaperAtlasError::source(format!("cannot read {}: {e}", path.display()))
    })?;

    let mut papers = Vec::new();
    let mut seen = HashSet::new();

    for (row, record) in reader.deserialize::<PaperRecord>().enumerate() {
        let paper = record.map_err(|e| {
            PaperAtlasError::source(format!("{}: row {}: {e}", path.display(), row + 2))
        })?;

        if paper.title.trim().is_empty() {
            warn!(row = row + 2, "skipping row with empty title");
            continue;
        }
        if !seen.insert(paper.title.clone()) {
            warn!(title = %paper.title, "duplicate title, keeping first occurrence");
            continue;
        }
        papers.push(paper);
    }

    info!(path = %path.display(), papers = papers.len(), "loaded paper source");
    Ok(papers)
}

/// Build enrichment work items for a paper set against a shared taxonomy.
///
/// The PDF URL doubles as the item fingerprint: when it changes upstream,
/// the engine re-enriches even though a complete result exists.
pub fn paper_items(papers: &[PaperRecord], categories: &[String]) -> Vec<WorkItem> {
    papers
        .iter()
        .map(|paper| WorkItem {
            id: paper.title.clone(),
            kind: ItemKind::Paper,
            context: ItemContext::Paper {
                title: paper.title.clone(),
                score: paper.relevance_score,
                pdf_url: paper.pdf_url.clone().filter(|u| !u.trim().is_empty()),
                categories: categories.to_vec(),
            },
            fingerprint: paper.pdf_url.clone().filter(|u| !u.trim().is_empty()),
        })
        .collect()
}
