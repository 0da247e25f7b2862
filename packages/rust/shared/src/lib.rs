//! Shared types, error model, and configuration for PaperAtlas.
//!
//! This crate is the foundation depended on by all other PaperAtlas crates.
//! It provides:
//! - [`PaperAtlasError`] / [`AnnotationError`] — the unified error model
//! - Domain types ([`PaperRecord`], [`WorkItem`], [`EnrichmentResult`], [`RunSummary`])
//! - The [`Annotate`] seam to the external reasoning service
//! - Configuration ([`AppConfig`], [`EngineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EngineConfig, EnrichmentSettings, OpenRouterConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{AnnotationError, PaperAtlasError, Result};
pub use types::{
    Annotate, AuthorEnrichment, AuthorPaperRef, AuthorStats, CURRENT_SCHEMA_VERSION,
    EnrichmentPayload, EnrichmentResult, EnrichmentStatus, ItemContext, ItemFailure, ItemKind,
    PaperEnrichment, PaperRecord, RunSummary, WorkItem,
};
