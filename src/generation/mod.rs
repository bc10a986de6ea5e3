//! Generation Orchestrators
//!
//! Two single-pass pipelines share the same stage helpers:
//!
//! * [`AutoGenerator`] builds a document from a topic: outline, introduction,
//!   one body per leaf heading, conclusion, images.
//! * [`TemplateGenerator`] fills the content and image blocks of a template,
//!   then derives SEO metadata from the assembled text.
//!
//! Stages run strictly one after another. Each stage's model call completes
//! and is recorded in the run's [`ConversationMemory`] before the next one
//! starts, because every prompt is built on the accumulated transcript.

pub mod auto;
pub mod templated;

pub use auto::AutoGenerator;
pub use templated::TemplateGenerator;

use crate::chain::{ChainBuilder, Extractor};
use crate::concurrency::{retry_with_backoff, RetryPolicy};
use crate::config::{GenerationConfig, PipelineSettings};
use crate::images::ImageOrchestrator;
use crate::memory::ConversationMemory;
use crate::provider::{ImageProvider, PromptOptimizer};
use crate::template::Variables;
use std::sync::Arc;
use tracing::warn;

/// Placeholder written in place of a text section the model failed to produce.
pub const DEGRADED_SECTION_SENTINEL: &str = "[Content generation failed for this section]";

/// Separator between assembled document parts
pub(crate) const PART_SEPARATOR: &str = "\n\n";

/// Image capabilities a generator may be given
#[derive(Clone)]
pub struct ImageServices {
    pub provider: Arc<dyn ImageProvider>,
    pub optimizer: Arc<dyn PromptOptimizer>,
}

impl ImageServices {
    pub fn new(provider: Arc<dyn ImageProvider>, optimizer: Arc<dyn PromptOptimizer>) -> Self {
        Self {
            provider,
            optimizer,
        }
    }

    /// Fresh orchestrator for one run, or `None` when images are disabled or
    /// the image settings are unusable.
    pub(crate) fn orchestrator_for(
        services: Option<&ImageServices>,
        config: &GenerationConfig,
        settings: &PipelineSettings,
        run_id: &str,
    ) -> Option<ImageOrchestrator> {
        if !config.generate_images {
            return None;
        }
        let Some(services) = services else {
            warn!(run_id, "Image generation requested but no image provider configured");
            return None;
        };
        match ImageOrchestrator::new(
            services.provider.clone(),
            services.optimizer.clone(),
            settings.images.clone(),
            settings.retry.clone(),
        ) {
            Ok(orchestrator) => Some(orchestrator),
            Err(err) => {
                warn!(run_id, error = %err, "Image generation disabled for this run");
                None
            }
        }
    }
}

/// Result of a free-text stage
pub(crate) struct StageText {
    pub text: String,
    pub degraded: bool,
}

/// Run a free-text stage with retries, falling back to the sentinel once the
/// retry policy gives up. The result is recorded to memory either way.
pub(crate) async fn text_stage(
    chain: &ChainBuilder<'_>,
    memory: &ConversationMemory,
    retry: &RetryPolicy,
    stage: &str,
    prompt: &str,
    vars: &Variables,
) -> StageText {
    let extractor = &Extractor::Markdown;
    let instruction = chain.render(prompt, vars);

    let result = retry_with_backoff(retry, move |_| chain.text(prompt, vars, extractor)).await;
    let (text, degraded) = match result {
        Ok(text) => (text, false),
        Err(err) => {
            warn!(stage, error = %err, "Stage produced no usable text; inserting sentinel");
            (DEGRADED_SECTION_SENTINEL.to_string(), true)
        }
    };

    memory.append(&instruction, &text);
    StageText {
        text,
        degraded,
    }
}

/// Join non-blank parts with the part separator.
pub(crate) fn assemble<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(PART_SEPARATOR)
}
