//! Core domain types for PaperAtlas enrichment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnnotationError;

/// Current schema version for the checkpoint store document.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// One scraped paper row from the conference feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title — the stable identity key for paper enrichment.
    pub title: String,
    /// Comma-separated author list as scraped.
    #[serde(default)]
    pub authors: String,
    /// Relevance score (0–100). Older exports use the `score` header.
    #[serde(alias = "score", default)]
    pub relevance_score: f64,
    /// Direct PDF link, when the scraper found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// Session name/type, when present.
    #[serde(
        alias = "session_type",
        alias = "session_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session: Option<String>,
}

/// A paper reference carried in an author's aggregate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorPaperRef {
    pub title: String,
    pub score: f64,
}

/// Aggregated statistics for one author across the paper set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorStats {
    /// Author name — the stable identity key for author enrichment.
    pub name: String,
    /// Total papers this author appears on (first/second/last positions).
    pub paper_count: usize,
    /// Papers at or above the highly-relevant threshold.
    pub highly_relevant_count: usize,
    /// Average relevance score across their papers, rounded to one decimal.
    pub avg_score: f64,
    /// Best relevance score across their papers.
    pub max_score: f64,
    /// The papers themselves, for disambiguating context.
    pub papers: Vec<AuthorPaperRef>,
}

// ---------------------------------------------------------------------------
// Work items
// ---------------------------------------------------------------------------

/// Which enrichment pipeline an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Paper,
    Author,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Author => write!(f, "author"),
        }
    }
}

/// Kind-specific context handed to the annotation client.
#[derive(Debug, Clone)]
pub enum ItemContext {
    Paper {
        title: String,
        score: f64,
        /// Primary context. `None` degrades to title-plus-web-search.
        pdf_url: Option<String>,
        /// Shared taxonomy the model must assign tags from.
        categories: Vec<String>,
    },
    Author {
        name: String,
        /// Up to three paper titles for disambiguation.
        paper_titles: Vec<String>,
    },
}

/// One unit of enrichment work. Immutable once constructed for a run.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Stable identity key, unique within a run.
    pub id: String,
    pub kind: ItemKind,
    pub context: ItemContext,
    /// Context fingerprint (the paper's PDF URL). A complete checkpoint
    /// entry with a different fingerprint is re-enriched, not skipped.
    pub fingerprint: Option<String>,
}

// ---------------------------------------------------------------------------
// Enrichment payloads
// ---------------------------------------------------------------------------

/// Machine-derived annotations for one paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperEnrichment {
    pub key_findings: String,
    pub description: String,
    pub key_contribution: String,
    pub novelty: String,
    /// 1–3 tags drawn from the shared taxonomy.
    pub categories: Vec<String>,
}

/// Machine-derived annotations for one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorEnrichment {
    /// Institution name, or the literal `"Unknown"` when lookup failed.
    pub affiliation: String,
    /// Single most senior role, or `"Unknown"`.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
}

/// Kind-specific enrichment payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPayload {
    Paper(PaperEnrichment),
    Author(AuthorEnrichment),
}

impl EnrichmentPayload {
    /// Kind of this payload.
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Paper(_) => ItemKind::Paper,
            Self::Author(_) => ItemKind::Author,
        }
    }

    /// All-or-nothing required-field check.
    ///
    /// Papers need all five fields populated; authors need non-empty
    /// affiliation and role (`"Unknown"` is a legitimate value — it marks
    /// an attempted-but-unresolved lookup). URLs are always optional.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Paper(p) => {
                let required = [
                    ("key_findings", &p.key_findings),
                    ("description", &p.description),
                    ("key_contribution", &p.key_contribution),
                    ("novelty", &p.novelty),
                ];
                for (field, value) in required {
                    if value.trim().is_empty() {
                        return Err(format!("missing required field: {field}"));
                    }
                }
                if p.categories.iter().all(|c| c.trim().is_empty()) {
                    return Err("missing required field: categories".into());
                }
                Ok(())
            }
            Self::Author(a) => {
                if a.affiliation.trim().is_empty() {
                    return Err("missing required field: affiliation".into());
                }
                if a.role.trim().is_empty() {
                    return Err("missing required field: role".into());
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Enrichment results
// ---------------------------------------------------------------------------

/// Lifecycle state of an enrichment result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Pending,
    Success,
    Failed,
}

/// Outcome attached to one item, persisted in the checkpoint store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub item_id: String,
    pub kind: ItemKind,
    pub status: EnrichmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EnrichmentPayload>,
    /// Present iff status is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Fingerprint of the context the result was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_fingerprint: Option<String>,
}

impl EnrichmentResult {
    /// Build a successful result.
    pub fn success(
        item_id: impl Into<String>,
        payload: EnrichmentPayload,
        attempt_count: u32,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            kind: payload.kind(),
            status: EnrichmentStatus::Success,
            payload: Some(payload),
            error: None,
            attempt_count,
            completed_at: Some(Utc::now()),
            source_fingerprint: fingerprint,
        }
    }

    /// Build a failed result after the attempt budget was exhausted.
    pub fn failed(
        item_id: impl Into<String>,
        kind: ItemKind,
        error: impl Into<String>,
        attempt_count: u32,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            kind,
            status: EnrichmentStatus::Failed,
            payload: None,
            error: Some(error.into()),
            attempt_count,
            completed_at: Some(Utc::now()),
            source_fingerprint: fingerprint,
        }
    }

    /// A result is complete iff it succeeded and its payload passes the
    /// kind-specific required-field check. Only complete results are
    /// skipped on re-runs.
    pub fn is_complete(&self) -> bool {
        self.status == EnrichmentStatus::Success
            && self
                .payload
                .as_ref()
                .is_some_and(|p| p.validate().is_ok())
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// One item-level failure recorded in the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub error: String,
}

/// Aggregate over one engine invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_items: usize,
    /// Items already complete in the checkpoint store.
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Itemized failures, in completion order (non-deterministic).
    pub failures: Vec<ItemFailure>,
}

// ---------------------------------------------------------------------------
// Annotation seam
// ---------------------------------------------------------------------------

/// Adapter boundary to the external reasoning service.
///
/// Implementations are stateless per call and own no retry logic — the
/// enrichment engine applies a uniform retry policy across both pipelines.
#[async_trait::async_trait]
pub trait Annotate: Send + Sync {
    /// Analyze one item and return its structured payload.
    async fn annotate(
        &self,
        item: &WorkItem,
    ) -> std::result::Result<EnrichmentPayload, AnnotationError>;

    /// Propose a category taxonomy from the full paper list.
    async fn propose_taxonomy(
        &self,
        papers: &[PaperRecord],
    ) -> std::result::Result<Vec<String>, AnnotationError>;
}
