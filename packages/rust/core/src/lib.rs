//! Enrichment orchestration for PaperAtlas: the shared incremental
//! engine and the paper/author pipelines built on top of it.

pub mod authors;
pub mod engine;
pub mod papers;
pub mod taxonomy;

pub use authors::{enrich_authors, select_key_authors};
pub use engine::{EnrichmentProgress, SilentProgress, run_enrichment};
pub use papers::enrich_papers;
pub use taxonomy::{category_distribution, default_taxonomy, normalize_taxonomy};
