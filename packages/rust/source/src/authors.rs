//! Author analysis: parses author lists, aggregates per-author stats,
//! and filters down to the key authors worth enriching.

use std::collections::HashMap;

use paperatlas_shared::{
    AuthorPaperRef, AuthorStats, ItemContext, ItemKind, PaperRecord, WorkItem,
};

/// How many paper titles to carry as disambiguating context per author.
const AUTHOR_CONTEXT_TITLES: usize = 3;

/// Parse a scraped comma-separated author string into clean names.
///
/// Drops truncation markers (`...`, `et al`) and trailing dots.
pub fn parse_authors(author_string: &str) -> Vec<String> {
    author_string
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty() && *a != "..." && *a != "et al" && *a != "et al.")
        .map(|a| a.trim_end_matches('.').trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Aggregate per-author paper lists and score statistics.
///
/// With `first_last_only` set, papers listing more than three authors
/// count only the first, second, and last author — the positions that
/// usually carry the work.
pub fn analyze_authors(
    papers: &[PaperRecord],
    first_last_only: bool,
    highly_relevant_threshold: f64,
) -> Vec<AuthorStats> {
    let mut author_papers: HashMap<String, Vec<AuthorPaperRef>> = HashMap::new();

    for paper in papers {
        let mut authors = parse_authors(&paper.authors);
        if first_last_only && authors.len() > 3 {
            let last = authors.pop().expect("non-empty");
            authors.truncate(2);
            authors.push(last);
        }

        for author in authors {
            author_papers.entry(author).or_default().push(AuthorPaperRef {
                title: paper.title.clone(),
                score: paper.relevance_score,
            });
        }
    }

    let mut stats: Vec<AuthorStats> = author_papers
        .into_iter()
        .map(|(name, papers)| {
            let scores: Vec<f64> = papers.iter().map(|p| p.score).collect();
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            let max = scores.iter().cloned().fold(f64::MIN, f64::max);
            let highly_relevant_count = scores
                .iter()
                .filter(|s| **s >= highly_relevant_threshold)
                .count();

            AuthorStats {
                name,
                paper_count: papers.len(),
                highly_relevant_count,
                avg_score: (avg * 10.0).round() / 10.0,
                max_score: max,
                papers,
            }
        })
        .collect();

    // Deterministic order for stable output and tests.
    stats.sort_by(|a, b| {
        b.highly_relevant_count
            .cmp(&a.highly_relevant_count)
            .then(b.paper_count.cmp(&a.paper_count))
            .then(a.name.cmp(&b.name))
    });
    stats
}

/// Filter to key authors: at least one paper at or above the threshold.
///
/// Pure over already-aggregated stats; no concurrency or failure
/// semantics of its own.
pub fn key_authors(stats: Vec<AuthorStats>) -> Vec<AuthorStats> {
    stats
        .into_iter()
        .filter(|a| a.highly_relevant_count >= 1)
        .collect()
}

/// Build enrichment work items for a key-author set.
pub fn author_items(authors: &[AuthorStats]) -> Vec<WorkItem> {
    authors
        .iter()
        .map(|author| WorkItem {
            id: author.name.clone(),
            kind: ItemKind::Author,
            context: ItemContext::Author {
                name: author.name.clone(),
                paper_titles: author
                    .papers
                    .iter()
                    .take(AUTHOR_CONTEXT_TITLES)
                    .map(|p| p.title.clone())
                    .collect(),
            },
            fingerprint: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, authors: &str, score: f64) -> PaperRecord {
        PaperRecord {
            title: title.into(),
            authors: authors.into(),
            relevance_score: score,
            pdf_url: None,
            session: None,
        }
    }

    #[test]
    fn parse_authors_strips_markers() {
        let authors = parse_authors("Alice Smith, Bob Jones, ..., et al., Carol White.");
        assert_eq!(authors, vec!["Alice Smith", "Bob Jones", "Carol White"]);
        assert!(parse_authors("").is_empty());
    }

    #[test]
    fn analyze_keeps_first_second_last_on_long_lists() {
        let papers = vec![paper("P1", "A, B, C, D, E", 90.0)];
        let stats = analyze_authors(&papers, true, 85.0);

        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"A"));
        assert!(names.contains(&"B"));
        assert!(names.contains(&"E"));
        assert!(!names.contains(&"C"));
    }

    #[test]
    fn analyze_keeps_all_authors_on_short_lists() {
        let papers = vec![paper("P1", "A, B, C", 90.0)];
        let stats = analyze_authors(&papers, true, 85.0);
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn analyze_aggregates_scores() {
        let papers = vec![
            paper("P1", "A, B", 90.0),
            paper("P2", "A", 70.0),
        ];
        let stats = analyze_authors(&papers, true, 85.0);
        let a = stats.iter().find(|s| s.name == "A").unwrap();
        assert_eq!(a.paper_count, 2);
        assert_eq!(a.highly_relevant_count, 1);
        assert_eq!(a.avg_score, 80.0);
        assert_eq!(a.max_score, 90.0);
    }

    #[test]
    fn key_author_filter_honors_threshold() {
        // Scores [90, 80, 86] with threshold 85: the 90 and 86 papers
        // qualify their first/second/last authors, the 80 paper does not.
        let papers = vec![
            paper("P90", "A1, A2, A3, A4, A5", 90.0),
            paper("P80", "B1, B2, B3", 80.0),
            paper("P86", "C1, C2, C3", 86.0),
        ];

        let stats = analyze_authors(&papers, true, 85.0);
        let key: Vec<String> = key_authors(stats).into_iter().map(|a| a.name).collect();

        let mut expected = vec!["A1", "A2", "A5", "C1", "C2", "C3"];
        expected.sort_unstable();
        let mut actual = key.clone();
        actual.sort_unstable();
        assert_eq!(actual, expected);
        assert!(!key.iter().any(|n| n.starts_with('B')));
        assert!(!key.contains(&"A3".to_string()));
        assert!(!key.contains(&"A4".to_string()));
    }

    #[test]
    fn author_items_carry_limited_context() {
        let stats = vec![AuthorStats {
            name: "Alice".into(),
            paper_count: 5,
            highly_relevant_count: 5,
            avg_score: 90.0,
            max_score: 95.0,
            papers: (1..=5)
                .map(|i| AuthorPaperRef {
                    title: format!("P{i}"),
                    score: 90.0,
                })
                .collect(),
        }];

        let items = author_items(&stats);
        assert_eq!(items[0].id, "Alice");
        match &items[0].context {
            ItemContext::Author { paper_titles, .. } => {
                assert_eq!(paper_titles.len(), AUTHOR_CONTEXT_TITLES);
            }
            other => panic!("unexpected context: {other:?}"),
        }
    }
}
