//! Prompt construction for the annotation service.
//!
//! Each prompt ends with an exact JSON shape the model must return; the
//! parsing side (`parse.rs`) enforces it.

use paperatlas_shared::PaperRecord;

/// Prompt for enriching one paper.
///
/// With a PDF URL the model is told to read it and to fall back to web
/// search if the link is dead; without one it must search by title.
pub fn paper_prompt(
    title: &str,
    score: f64,
    pdf_url: Option<&str>,
    categories: &[String],
) -> String {
    let categories_str = categories.join(", ");

    let lead = match pdf_url {
        Some(url) => format!(
            "Read this conference paper and extract key insights.\n\n\
             Paper Title: \"{title}\"\n\
             Paper URL: {url}\n\
             Relevance Score: {score}\n\n\
             Available Categories: {categories_str}\n\n\
             1. Fetch and read the paper from the URL above.\n\
             2. If the link does not work, search the web for \"{title} PDF\" \
             and read it from an alternative source."
        ),
        None => format!(
            "Find and read this conference paper, then extract key insights.\n\n\
             Paper Title: \"{title}\"\n\
             Relevance Score: {score}\n\n\
             Available Categories: {categories_str}\n\n\
             1. Search the web for \"{title} PDF\" to find the paper.\n\
             2. Once you find it, read the paper."
        ),
    };

    format!(
        "{lead}\n\
         3. Extract the key findings: what is new, what is important, what the paper brings to the field (2-3 sentences).\n\
         4. Summarize what the paper is about (2-3 sentences).\n\
         5. Identify the main contribution or innovation (1-2 sentences).\n\
         6. Explain what makes this work NOVEL: how it differs from previous work, \
         what limitations it addresses, what new approach it takes (2-3 sentences).\n\
         7. Assign 1-3 relevant categories from the list above - be selective.\n\n\
         Return ONLY a valid JSON object with this exact format, no other text:\n\
         {{\"key_findings\": \"...\", \"description\": \"...\", \"key_contribution\": \"...\", \
         \"novelty\": \"...\", \"categories\": [\"Category1\", \"Category2\"]}}"
    )
}

/// Prompt for looking up one author's affiliation and role.
pub fn author_prompt(name: &str, paper_titles: &[String]) -> String {
    let paper_list = paper_titles
        .iter()
        .map(|t| format!("- {}", truncate(t, 100)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Find information about this academic researcher:\n\n\
         Author: {name}\n\n\
         Their papers include:\n{paper_list}\n\n\
         Please search the web to find:\n\
         1. Their PRIMARY current affiliation (university or company name ONLY - no departments, labs, or addresses)\n\
         2. Their SINGLE most senior role (e.g., PhD Student, Postdoc, Assistant Professor, Professor, Research Scientist)\n\
         3. A professional photo URL (from their university/company webpage or research profile)\n\
         4. A link to their profile (prioritize: personal webpage > Google Scholar > university profile page)\n\n\
         FORMATTING RULES:\n\
         - affiliation: institution name only, e.g. \"Google DeepMind\" not \"Google DeepMind, London, UK\"\n\
         - role: one concise title, e.g. \"Professor\" not \"Full Professor of Computer Science\"\n\n\
         Return ONLY a JSON object with this exact format (no other text):\n\
         {{\"affiliation\": \"Institution Name\", \"role\": \"Role Title\", \
         \"photo_url\": \"https://...\", \"profile_url\": \"https://...\"}}\n\n\
         If you cannot find a photo or profile link, set those fields to null. \
         Only use \"Unknown\" if you genuinely could not find the information after searching."
    )
}

/// Prompt for proposing a category taxonomy over the whole paper set.
pub fn taxonomy_prompt(papers: &[PaperRecord]) -> String {
    let titles_text = papers
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {} (score: {})", i + 1, p.title, p.relevance_score))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze these {count} paper titles and create high-level research categories \
         that would effectively group them.\n\n\
         Paper titles:\n\n{titles_text}\n\n\
         Based on these titles, create research categories that:\n\
         - Are clear and distinct\n\
         - Cover the major research themes across all papers\n\
         - Would be useful for organizing and browsing this collection\n\
         - Use standard ML/AI terminology\n\
         - Stay concise: a focused set of high-level categories, not an exhaustive list\n\n\
         Aim for broad themes that multiple papers can fit into.\n\n\
         Return ONLY a JSON array of category names, nothing else:\n\
         [\"Category 1\", \"Category 2\", ...]",
        count = papers.len(),
    )
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
