use anyhow::{Context, Result};
use llm::{ChatMessage, CompletionRequest, CompletionService};
use std::sync::Arc;

use crate::retriever::ContextFragment;

#[derive(Debug, Clone)]
pub struct SynthesizerOptions {
    pub model: String,
    /// Only the first N fragments are merged into the prompt.
    pub max_fragments: usize,
    /// Per-fragment character cap, applied before concatenation.
    pub max_fragment_chars: Option<usize>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2:3b".to_string(),
            max_fragments: 5,
            max_fragment_chars: Some(500),
            max_tokens: 800,
            // Moderate temperature: coherent prose over rigid structure
            temperature: 0.3,
        }
    }
}

/// Formats retrieved context into a fixed chain-of-thought template and asks
/// the completion service for the final answer. Unlike extraction there is
/// no fallback here: an empty answer has no safe default, so failures
/// propagate to the caller.
pub struct Synthesizer {
    service: Arc<dyn CompletionService>,
    options: SynthesizerOptions,
}

impl Synthesizer {
    pub fn new(service: Arc<dyn CompletionService>, options: SynthesizerOptions) -> Self {
        Self { service, options }
    }

    pub async fn answer(&self, question: &str, fragments: &[ContextFragment]) -> Result<String> {
        let context = self.build_context(fragments);
        let prompt = build_cot_prompt(question, &context);

        let request = CompletionRequest {
            model: self.options.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        self.service
            .complete(&request)
            .await
            .context("Answer synthesis failed")
    }

    fn build_context(&self, fragments: &[ContextFragment]) -> String {
        fragments
            .iter()
            .take(self.options.max_fragments)
            .map(|fragment| {
                let text = match self.options.max_fragment_chars {
                    Some(cap) => truncate_chars(&fragment.text, cap),
                    None => &fragment.text,
                };
                format!("- {text}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn build_cot_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are an expert SAP HANA on VMware consultant. Answer the question using chain-of-thought reasoning.

CONTEXT from semantic knowledge graph:
{context}

QUESTION: {question}

Think step-by-step:
1. What SAP HANA concepts are involved in this question?
2. What configuration parameters or components are relevant?
3. How do these elements interact in a VMware environment?
4. What specific recommendations apply?

FINAL ANSWER: Provide a comprehensive response based on your analysis, including specific parameters and recommendations."#
    )
}

fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
