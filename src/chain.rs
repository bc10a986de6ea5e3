//! Request/Chain Builder
//!
//! Assembles one model invocation: the accumulated memory becomes leading
//! history, stage variables are interpolated into the prompt, the model is
//! called free-text or schema-constrained, and free-text results run through an
//! [`Extractor`]. Nothing is retried or recorded here; stages decide both.

use crate::error::PipelineError;
use crate::memory::ConversationMemory;
use crate::provider::{ChatMessage, CompletionOptions, LanguageModel, OutputSchema};
use crate::template::{interpolate, Variables};
use crate::validation::{coerce_structured, strip_code_fence};
use serde_json::Value;
use tracing::debug;

/// Pulls usable content out of a raw model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extractor {
    /// Trimmed reply, unchanged otherwise
    Passthrough,
    /// Body of the first fenced code block, or the whole reply when unfenced
    Markdown,
    /// Text between the first `open` and the following `close`, or the whole reply
    Delimited { open: String, close: String },
}

impl Extractor {
    pub fn extract(&self, raw: &str) -> String {
        match self {
            Extractor::Passthrough => raw.trim().to_string(),
            Extractor::Markdown => strip_code_fence(raw).to_string(),
            Extractor::Delimited { open, close } => {
                let inner = raw.find(open.as_str()).and_then(|start| {
                    let rest = &raw[start + open.len()..];
                    rest.find(close.as_str()).map(|end| &rest[..end])
                });
                inner.unwrap_or(raw).trim().to_string()
            }
        }
    }
}

/// Stateless invocation helper shared by every stage of a run
pub struct ChainBuilder<'a> {
    model: &'a dyn LanguageModel,
    memory: &'a ConversationMemory,
    options: CompletionOptions,
    debug_prompts: bool,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        memory: &'a ConversationMemory,
        options: CompletionOptions,
    ) -> Self {
        Self {
            model,
            memory,
            options,
            debug_prompts: false,
        }
    }

    /// Log rendered prompts at debug level.
    pub fn with_debug_prompts(mut self, debug_prompts: bool) -> Self {
        self.debug_prompts = debug_prompts;
        self
    }

    /// Schema-constrained call. The raw structured result is returned unvalidated.
    pub async fn structured(
        &self,
        prompt: &str,
        vars: &Variables,
        schema: &OutputSchema,
    ) -> Result<Value, PipelineError> {
        let (history, rendered) = self.prepare(prompt, vars);
        let value = self
            .model
            .invoke_structured(&history, &rendered, schema, &self.options)
            .await?;
        Ok(coerce_structured(value))
    }

    /// Free-text call. An empty extraction is a `ContentGeneration` failure.
    pub async fn text(
        &self,
        prompt: &str,
        vars: &Variables,
        extractor: &Extractor,
    ) -> Result<String, PipelineError> {
        let (history, rendered) = self.prepare(prompt, vars);
        let raw = self
            .model
            .invoke(&history, &rendered, &self.options)
            .await?;

        let text = extractor.extract(&raw);
        if text.is_empty() {
            return Err(PipelineError::content(format!(
                "model {} returned no usable content",
                self.model.model_name()
            )));
        }
        Ok(text)
    }

    /// Render a prompt without invoking the model.
    pub fn render(&self, prompt: &str, vars: &Variables) -> String {
        interpolate(prompt, vars)
    }

    fn prepare(&self, prompt: &str, vars: &Variables) -> (Vec<ChatMessage>, String) {
        let history = self.memory.messages();
        let rendered = self.render(prompt, vars);
        if self.debug_prompts {
            debug!(
                model = self.model.model_name(),
                history_len = history.len(),
                prompt = %rendered,
                "Invoking model"
            );
        }
        (history, rendered)
    }
}
