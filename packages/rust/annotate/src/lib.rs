//! OpenRouter annotation client.
//!
//! Thin adapter over the chat-completions API. The client classifies
//! failures into [`AnnotationError`] kinds but never retries — retry
//! policy belongs to the enrichment engine so both pipelines share it.
//!
//! Papers and author lookups run against the model with the `:online`
//! suffix, which makes the provider fetch/search the web (papers carry a
//! PDF URL in the prompt when available). The taxonomy call inlines all
//! titles and runs against the plain model.

pub mod parse;
pub mod prompts;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use paperatlas_shared::{
    Annotate, AnnotationError, EnrichmentPayload, EnrichmentSettings, ItemContext, OpenRouterConfig,
    PaperAtlasError, PaperRecord, Result, WorkItem,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("PaperAtlas/", env!("CARGO_PKG_VERSION"));

/// Sampling temperature for all enrichment calls.
const TEMPERATURE: f32 = 0.3;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stateless-per-call adapter to the OpenRouter API.
pub struct OpenRouterClient {
    http: reqwest::Client,
    completions_url: String,
    api_key: String,
    paper_model: String,
    author_model: String,
    paper_timeout: Duration,
    author_timeout: Duration,
}

impl OpenRouterClient {
    /// Build a client from the application config and a resolved API key.
    pub fn new(
        openrouter: &OpenRouterConfig,
        api_key: String,
        enrichment: &EnrichmentSettings,
    ) -> Result<Self> {
        let base = Url::parse(&openrouter.base_url).map_err(|e| {
            PaperAtlasError::config(format!("invalid base URL {}: {e}", openrouter.base_url))
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&openrouter.http_referer) {
            headers.insert("HTTP-Referer", value);
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&openrouter.app_title) {
            headers.insert("X-Title", value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| PaperAtlasError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            completions_url: format!(
                "{}/chat/completions",
                base.as_str().trim_end_matches('/')
            ),
            api_key,
            paper_model: openrouter.paper_model.clone(),
            author_model: openrouter.author_model.clone(),
            paper_timeout: Duration::from_secs(enrichment.paper_timeout_secs),
            author_timeout: Duration::from_secs(enrichment.author_timeout_secs),
        })
    }

    /// One chat-completions round trip, classified into `AnnotationError`.
    async fn chat(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> std::result::Result<String, AnnotationError> {
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnnotationError::Timeout
                } else {
                    AnnotationError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnnotationError::RateLimited);
        }
        if !status.is_success() {
            return Err(AnnotationError::Unreachable(format!("HTTP {status}")));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AnnotationError::Timeout
            } else {
                AnnotationError::Malformed(format!("invalid response body: {e}"))
            }
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AnnotationError::Malformed("empty completion".into()))?;

        debug!(model, chars = content.len(), "completion received");
        Ok(content)
    }

    /// Model name with the provider's web-search plugin enabled.
    fn online(model: &str) -> String {
        format!("{model}:online")
    }
}

#[async_trait::async_trait]
impl Annotate for OpenRouterClient {
    #[instrument(skip_all, fields(item = %item.id, kind = %item.kind))]
    async fn annotate(
        &self,
        item: &WorkItem,
    ) -> std::result::Result<EnrichmentPayload, AnnotationError> {
        match &item.context {
            ItemContext::Paper {
                title,
                score,
                pdf_url,
                categories,
            } => {
                let prompt = prompts::paper_prompt(title, *score, pdf_url.as_deref(), categories);
                let model = Self::online(&self.paper_model);
                let content = self.chat(&model, &prompt, self.paper_timeout).await?;
                let enrichment = parse::parse_paper_response(&content)?;
                Ok(EnrichmentPayload::Paper(enrichment))
            }
            ItemContext::Author { name, paper_titles } => {
                let prompt = prompts::author_prompt(name, paper_titles);
                let model = Self::online(&self.author_model);
                let content = self.chat(&model, &prompt, self.author_timeout).await?;
                let enrichment = parse::parse_author_response(&content)?;
                Ok(EnrichmentPayload::Author(enrichment))
            }
        }
    }

    #[instrument(skip_all, fields(papers = papers.len()))]
    async fn propose_taxonomy(
        &self,
        papers: &[PaperRecord],
    ) -> std::result::Result<Vec<String>, AnnotationError> {
        let prompt = prompts::taxonomy_prompt(papers);
        let content = self
            .chat(&self.paper_model, &prompt, self.paper_timeout)
            .await?;
        let taxonomy = parse::parse_taxonomy_response(&content).inspect_err(|e| {
            warn!(error = %e, "taxonomy proposal failed to parse");
        })?;
        Ok(taxonomy)
    }
}
