//! Category taxonomy handling: normalization, the fallback set, and the
//! category distribution report.

use std::collections::BTreeMap;

use paperatlas_shared::{EnrichmentPayload, EnrichmentResult};

/// Fallback categories when the model cannot propose a usable taxonomy.
const DEFAULT_CATEGORIES: &[&str] = &[
    "Large Language Models",
    "Agents and Tool Use",
    "Reinforcement Learning",
    "Reasoning and Planning",
    "Multimodal Learning",
    "Model Efficiency",
    "Alignment and Safety",
    "Benchmarks and Evaluation",
    "Applications",
    "Other",
];

/// The built-in fallback taxonomy.
pub fn default_taxonomy() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Normalize a proposed taxonomy: trim entries, drop empties, and dedup
/// case-insensitively keeping the first spelling. Idempotent.
pub fn normalize_taxonomy(categories: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect()
}

/// Count how many enriched papers carry each category tag.
///
/// Sorted by descending count, then name, for stable report output.
pub fn category_distribution(
    entries: &BTreeMap<String, EnrichmentResult>,
) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries.values() {
        if let Some(EnrichmentPayload::Paper(paper)) = &entry.payload {
            for category in &paper.categories {
                *counts.entry(category.clone()).or_default() += 1;
            }
        }
    }

    let mut distribution: Vec<(String, usize)> = counts.into_iter().collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    distribution
}
