pub mod prompt;
pub mod schema;

pub use schema::{
    EntityType, ExtractedEntity, ExtractedRelationship, ExtractionResult, RelationshipType,
};

use anyhow::{Context, Result};
use llm::{ChatMessage, CompletionRequest, CompletionService};
use std::sync::Arc;
use tracing::warn;

/// What to do when the completion service fails or returns unparseable
/// output. Ingestion runs with `Degrade` so one bad chunk cannot abort a
/// batch; callers that need to see the error pick `Propagate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Degrade,
    Propagate,
}

#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub failure_policy: FailurePolicy,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2:3b".to_string(),
            max_tokens: 1500,
            // Low temperature for consistent structured output
            temperature: 0.1,
            failure_policy: FailurePolicy::Degrade,
        }
    }
}

/// Converts one chunk of documentation text into a structured
/// `ExtractionResult` via a schema-constrained prompt.
pub struct SemanticExtractor {
    service: Arc<dyn CompletionService>,
    options: ExtractorOptions,
}

impl SemanticExtractor {
    pub fn new(service: Arc<dyn CompletionService>, options: ExtractorOptions) -> Self {
        Self { service, options }
    }

    pub async fn extract(&self, chunk_text: &str) -> Result<ExtractionResult> {
        match self.extract_inner(chunk_text).await {
            Ok(result) => Ok(result),
            Err(e) => match self.options.failure_policy {
                FailurePolicy::Degrade => {
                    warn!(error = %format!("{e:#}"), "extraction failed, substituting empty result");
                    Ok(ExtractionResult::default())
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }

    async fn extract_inner(&self, chunk_text: &str) -> Result<ExtractionResult> {
        let prompt = prompt::build_extraction_prompt(chunk_text);

        let request = CompletionRequest {
            model: self.options.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let raw = self
            .service
            .complete(&request)
            .await
            .context("Entity extraction call failed")?;

        parse_extraction(&raw)
    }
}

/// Parse the model's reply, tolerating an optional markdown code fence.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult> {
    let json = strip_code_fences(raw);
    serde_json::from_str(json).context("Extraction reply is not the expected JSON shape")
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag line, then everything after the closing fence
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    match body.rfind("```") {
        Some(pos) => body[..pos].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticService(String);

    #[async_trait]
    impl CompletionService for StaticService {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingService;

    #[async_trait]
    impl CompletionService for FailingService {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    const VALID_REPLY: &str = r#"{
        "entities": [{"type": "Concept", "name": "NUMA Optimization", "description": "d"}],
        "relationships": [{"from": "NUMA Optimization", "to": "vSphere", "type": "INVOLVES_COMPONENT"}],
        "chunk_summary": "summary"
    }"#;

    fn extractor(service: impl CompletionService + 'static) -> SemanticExtractor {
        SemanticExtractor::new(Arc::new(service), ExtractorOptions::default())
    }

    #[tokio::test]
    async fn parses_a_valid_reply() {
        let result = extractor(StaticService(VALID_REPLY.to_string()))
            .extract("chunk")
            .await
            .unwrap();

        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "NUMA Optimization");
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.chunk_summary, "summary");
    }

    #[tokio::test]
    async fn strips_markdown_fences() {
        let fenced = format!("```json\n{VALID_REPLY}\n```");
        let result = extractor(StaticService(fenced)).extract("chunk").await.unwrap();
        assert_eq!(result.entities.len(), 1);
    }

    #[tokio::test]
    async fn garbage_reply_degrades_to_empty() {
        let result = extractor(StaticService("not json at all".to_string()))
            .extract("chunk")
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn service_failure_degrades_to_empty() {
        let result = extractor(FailingService).extract("chunk").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn propagate_policy_surfaces_the_error() {
        let options = ExtractorOptions {
            failure_policy: FailurePolicy::Propagate,
            ..Default::default()
        };
        let extractor = SemanticExtractor::new(Arc::new(FailingService), options);

        assert!(extractor.extract("chunk").await.is_err());
    }

    #[test]
    fn fence_stripping_handles_plain_and_tagged_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }
}
