//! Model and Image Provider Capabilities
//!
//! Provider-agnostic interfaces the pipeline consumes. Network transport,
//! authentication and timeouts belong to the implementations; the pipeline only
//! sees "invoke a model with a message history" and "request an image".

use crate::error::{ImageError, PipelineError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call sampling options
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>, // 0.0-2.0
    pub max_tokens: Option<u32>,
    /// Credential forwarded to clients that authenticate per call
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl fmt::Debug for CompletionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionOptions")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Description of the shape a structured call must return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema document
    pub schema: Value,
}

/// Language model capability
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text completion of `prompt` following `history`.
    async fn invoke(
        &self,
        history: &[ChatMessage],
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, PipelineError>;

    /// Completion constrained to `schema`; the result is not validated here.
    async fn invoke_structured(
        &self,
        history: &[ChatMessage],
        prompt: &str,
        schema: &OutputSchema,
        options: &CompletionOptions,
    ) -> Result<Value, PipelineError>;

    fn model_name(&self) -> &str;
}

/// Image provider capability
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Request one image; returns its URL or provider handle.
    async fn generate(&self, prompt: &str) -> Result<String, ImageError>;

    fn provider_name(&self) -> &str;
}

/// Rewrites a raw image prompt into a higher-quality provider prompt
#[async_trait]
pub trait PromptOptimizer: Send + Sync {
    async fn optimize(&self, prompt: &str, context: &str) -> Result<String, ImageError>;
}

const OPTIMIZER_INSTRUCTION: &str = "You rewrite image requests into detailed prompts for an \
image generation model. Describe subject, composition, lighting and style in one paragraph. \
Never include text, captions or logos in the image. Reply with the prompt only.";

/// Prompt optimizer backed by a language model
pub struct ModelPromptOptimizer {
    model: Arc<dyn LanguageModel>,
    options: CompletionOptions,
}

impl ModelPromptOptimizer {
    pub fn new(model: Arc<dyn LanguageModel>, options: CompletionOptions) -> Self {
        Self { model, options }
    }
}

#[async_trait]
impl PromptOptimizer for ModelPromptOptimizer {
    async fn optimize(&self, prompt: &str, context: &str) -> Result<String, ImageError> {
        let history = [ChatMessage::system(OPTIMIZER_INSTRUCTION)];
        let request = if context.trim().is_empty() {
            format!("Image request: {}", prompt)
        } else {
            format!("Image request: {}\n\nContext:\n{}", prompt, context)
        };

        let optimized = self
            .model
            .invoke(&history, &request, &self.options)
            .await
            .map_err(|e| ImageError::PromptOptimization {
                message: format!("model {} failed", self.model.model_name()),
                source: Some(Box::new(e)),
            })?;

        let optimized = optimized.trim();
        if optimized.is_empty() {
            return Err(ImageError::optimization("optimizer returned an empty prompt"));
        }
        Ok(optimized.to_string())
    }
}

/// Optimizer that passes prompts through unchanged
pub struct IdentityOptimizer;

#[async_trait]
impl PromptOptimizer for IdentityOptimizer {
    async fn optimize(&self, prompt: &str, _context: &str) -> Result<String, ImageError> {
        Ok(prompt.to_string())
    }
}
