//! Model response parsing: fence stripping, JSON extraction, and
//! per-kind schema validation.
//!
//! Models wrap JSON in markdown fences or surround it with prose often
//! enough that we locate the payload structurally instead of parsing the
//! raw response. Any shape violation surfaces as
//! [`AnnotationError::Malformed`].

use serde::Deserialize;

use paperatlas_shared::{AnnotationError, AuthorEnrichment, PaperEnrichment};

/// The explicit marker for an attempted-but-unresolved author lookup.
const UNKNOWN: &str = "Unknown";

/// Strip a markdown code fence if the response carries one.
fn strip_code_fences(text: &str) -> &str {
    if let Some(rest) = text.split_once("```json").map(|(_, r)| r) {
        rest.split("```").next().unwrap_or(rest).trim()
    } else if let Some(rest) = text.split_once("```").map(|(_, r)| r) {
        rest.split("```").next().unwrap_or(rest).trim()
    } else {
        text.trim()
    }
}

/// Locate the first JSON object by brace matching.
fn extract_object(text: &str) -> Result<&str, AnnotationError> {
    extract_delimited(text, '{', '}')
        .ok_or_else(|| AnnotationError::Malformed("no JSON object in response".into()))
}

/// Locate the first JSON array by bracket matching.
fn extract_array(text: &str) -> Result<&str, AnnotationError> {
    extract_delimited(text, '[', ']')
        .ok_or_else(|| AnnotationError::Malformed("no JSON array in response".into()))
}

/// Delimiter matching skips string literals (with escape handling), so
/// a brace inside a quoted value never unbalances the scan.
fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + offset + close.len_utf8()]);
            }
        }
    }
    // Unmatched delimiters.
    None
}

/// Relaxed intermediate shape for paper responses; required-field checks
/// happen after deserialization so a missing key reports its name.
#[derive(Debug, Default, Deserialize)]
struct RawPaperResponse {
    #[serde(default)]
    key_findings: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    key_contribution: String,
    #[serde(default)]
    novelty: String,
    #[serde(default)]
    categories: Vec<String>,
}

/// Parse and validate a paper enrichment response.
///
/// All five fields are required; a partial payload is rejected rather
/// than passed downstream with holes.
pub fn parse_paper_response(text: &str) -> Result<PaperEnrichment, AnnotationError> {
    let json = extract_object(strip_code_fences(text))?;
    let raw: RawPaperResponse = serde_json::from_str(json)
        .map_err(|e| AnnotationError::Malformed(format!("invalid JSON: {e}")))?;

    let enrichment = PaperEnrichment {
        key_findings: raw.key_findings.trim().to_string(),
        description: raw.description.trim().to_string(),
        key_contribution: raw.key_contribution.trim().to_string(),
        novelty: raw.novelty.trim().to_string(),
        categories: raw
            .categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    };

    paperatlas_shared::EnrichmentPayload::Paper(enrichment.clone())
        .validate()
        .map_err(AnnotationError::Malformed)?;
    Ok(enrichment)
}

#[derive(Debug, Default, Deserialize)]
struct RawAuthorResponse {
    #[serde(default)]
    affiliation: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    profile_url: Option<String>,
}

/// Parse an author enrichment response.
///
/// Null or missing affiliation/role degrade to the explicit `"Unknown"`
/// marker; that is a complete answer, not a failure. Only a response
/// that is not a JSON object is malformed.
pub fn parse_author_response(text: &str) -> Result<AuthorEnrichment, AnnotationError> {
    let json = extract_object(strip_code_fences(text))?;
    let raw: RawAuthorResponse = serde_json::from_str(json)
        .map_err(|e| AnnotationError::Malformed(format!("invalid JSON: {e}")))?;

    Ok(AuthorEnrichment {
        affiliation: non_empty(raw.affiliation).unwrap_or_else(|| UNKNOWN.to_string()),
        role: non_empty(raw.role).unwrap_or_else(|| UNKNOWN.to_string()),
        photo_url: non_empty(raw.photo_url),
        profile_url: non_empty(raw.profile_url),
    })
}

/// Parse a taxonomy proposal: a JSON array of category names.
pub fn parse_taxonomy_response(text: &str) -> Result<Vec<String>, AnnotationError> {
    let json = extract_array(strip_code_fences(text))?;
    let categories: Vec<String> = serde_json::from_str(json)
        .map_err(|e| AnnotationError::Malformed(format!("invalid JSON array: {e}")))?;

    let categories: Vec<String> = categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if categories.is_empty() {
        return Err(AnnotationError::Malformed("empty category list".into()));
    }
    Ok(categories)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER_JSON: &str = r#"{"key_findings": "F", "description": "D", "key_contribution": "C", "novelty": "N", "categories": ["Agents"]}"#;

    #[test]
    fn parses_bare_paper_json() {
        let enrichment = parse_paper_response(PAPER_JSON).unwrap();
        assert_eq!(enrichment.key_findings, "F");
        assert_eq!(enrichment.categories, vec!["Agents"]);
    }

    #[test]
    fn parses_fenced_paper_json() {
        let fenced = format!("Here is the result:\n```json\n{PAPER_JSON}\n```\nDone.");
        let enrichment = parse_paper_response(&fenced).unwrap();
        assert_eq!(enrichment.novelty, "N");
    }

    #[test]
    fn parses_prose_wrapped_json() {
        let wrapped = format!("Sure! Based on the paper: {PAPER_JSON} Let me know.");
        assert!(parse_paper_response(&wrapped).is_ok());
    }

    #[test]
    fn braces_inside_string_values_do_not_truncate() {
        let response = r#"Result: {"key_findings": "see fig. 2}", "description": "a \"quoted\" {sample}", "key_contribution": "C", "novelty": "N", "categories": ["Agents"]} done."#;
        let enrichment = parse_paper_response(response).unwrap();
        assert_eq!(enrichment.key_findings, "see fig. 2}");
        assert_eq!(enrichment.description, r#"a "quoted" {sample}"#);
    }

    #[test]
    fn missing_paper_field_is_malformed() {
        let partial = r#"{"key_findings": "F", "description": "D", "categories": ["A"]}"#;
        let err = parse_paper_response(partial).unwrap_err();
        match err {
            AnnotationError::Malformed(msg) => assert!(msg.contains("key_contribution")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_categories_is_malformed() {
        let partial = r#"{"key_findings": "F", "description": "D", "key_contribution": "C", "novelty": "N", "categories": []}"#;
        assert!(matches!(
            parse_paper_response(partial),
            Err(AnnotationError::Malformed(_))
        ));
    }

    #[test]
    fn unmatched_braces_are_malformed() {
        let truncated = r#"{"key_findings": "F", "description": "D"#;
        assert!(matches!(
            parse_paper_response(truncated),
            Err(AnnotationError::Malformed(_))
        ));
    }

    #[test]
    fn no_json_at_all_is_malformed() {
        assert!(matches!(
            parse_paper_response("I could not find this paper."),
            Err(AnnotationError::Malformed(_))
        ));
    }

    #[test]
    fn author_nulls_degrade_to_unknown() {
        let response = r#"{"affiliation": null, "role": "Professor", "photo_url": null, "profile_url": "https://example.com"}"#;
        let author = parse_author_response(response).unwrap();
        assert_eq!(author.affiliation, "Unknown");
        assert_eq!(author.role, "Professor");
        assert_eq!(author.photo_url, None);
        assert_eq!(author.profile_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn author_literal_null_string_is_dropped() {
        let response = r#"{"affiliation": "MIT", "role": "PhD Student", "photo_url": "null"}"#;
        let author = parse_author_response(response).unwrap();
        assert_eq!(author.photo_url, None);
    }

    #[test]
    fn author_non_object_is_malformed() {
        assert!(matches!(
            parse_author_response("no structured data here"),
            Err(AnnotationError::Malformed(_))
        ));
    }

    #[test]
    fn parses_taxonomy_array() {
        let response = "```json\n[\"Agents\", \"Benchmarks\", \"Tool Use\"]\n```";
        let taxonomy = parse_taxonomy_response(response).unwrap();
        assert_eq!(taxonomy, vec!["Agents", "Benchmarks", "Tool Use"]);
    }

    #[test]
    fn empty_taxonomy_is_malformed() {
        assert!(matches!(
            parse_taxonomy_response("[]"),
            Err(AnnotationError::Malformed(_))
        ));
    }
}
