//! Answer generation: the language-model seam and the prompts fed to it.
//!
//! Concrete generators (OpenAI, Ollama) live in the app crate; the core only
//! needs [`AnswerGenerator::complete`].

use anyhow::Result;
use async_trait::async_trait;

use crate::compare::{Cell, ComparisonResult};
use crate::models::RetrievedPassage;

/// Reply the model is told to give when the context lacks an answer.
pub const NO_ANSWER: &str = "I don't have enough information to answer that question.";

/// Separator between context passages in the ask prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Language-model completion.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Model identifier, for logs and stats.
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Prompt for a question answered from retrieved passages.
pub fn build_answer_prompt(question: &str, passages: &[RetrievedPassage]) -> String {
    let context = passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "You are a helpful assistant that answers questions based on the provided context.\n\
         \n\
         INSTRUCTIONS:\n\
         - Use ONLY the information from the context below to answer the question\n\
         - If the answer is not in the context, say \"{NO_ANSWER}\"\n\
         - Be concise and accurate\n\
         - Cite specific parts of the context when relevant\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION: {question}\n\
         \n\
         ANSWER:"
    )
}

/// Prompt asking for a summary of how the translations differ.
pub fn build_comparison_prompt(comparison: &ComparisonResult) -> String {
    let mut body = String::new();
    for row in &comparison.rows {
        body.push_str(&format!("## {}\n", row.reference));
        for entry in &row.entries {
            let text = match &entry.cell {
                Cell::Found { content, .. } => content.as_str(),
                Cell::NotFound => "(not found in this translation)",
                Cell::Error { .. } => "(unavailable)",
            };
            body.push_str(&format!("[{}] {}\n", entry.translation_id, text));
        }
        body.push('\n');
    }

    format!(
        "You are comparing Bible translations ({translations}).\n\
         \n\
         INSTRUCTIONS:\n\
         - Summarise the differences in wording and emphasis between the translations\n\
         - Mention passages missing from a translation\n\
         - Use ONLY the passages below\n\
         - Be concise\n\
         \n\
         QUESTION: {query}\n\
         \n\
         PASSAGES:\n\
         {body}\
         SUMMARY:",
        translations = comparison.translations.join(", "),
        query = comparison.query,
    )
}

/// Generator that echoes a fixed reply and records prompts. For tests.
#[derive(Default)]
pub struct StaticGenerator {
    reply: Option<String>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl StaticGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Default::default(),
        }
    }

    /// A generator whose every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnswerGenerator for StaticGenerator {
    fn model_name(&self) -> &str {
        "static"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => anyhow::bail!("generator unavailable"),
        }
    }
}
