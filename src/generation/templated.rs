//! Template-driven generation pipeline.

use super::{text_stage, ImageServices};
use crate::chain::ChainBuilder;
use crate::config::{GenerationConfig, GenerationSource, PipelineSettings};
use crate::error::PipelineError;
use crate::images::ImageOrchestrator;
use crate::memory::ConversationMemory;
use crate::prompts::{
    seo_schema, SEO_PROMPT, SYSTEM_ACKNOWLEDGEMENT, TEMPLATE_CONTENT_SUFFIX,
    TEMPLATE_DEFAULT_DIRECTIVE,
};
use crate::provider::{ImageProvider, LanguageModel, PromptOptimizer};
use crate::slug::normalize_or_derive;
use crate::template::{interpolate, BlockKind, PromptBlock, SystemBlock, TemplateDocument, Variables};
use crate::types::{Document, GeneratedImage, SeoInfo};
use crate::validation::parse_seo_info;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fills a template's content and image blocks
pub struct TemplateGenerator {
    model: Arc<dyn LanguageModel>,
    images: Option<ImageServices>,
    settings: PipelineSettings,
}

impl TemplateGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            images: None,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_images(
        mut self,
        provider: Arc<dyn ImageProvider>,
        optimizer: Arc<dyn PromptOptimizer>,
    ) -> Self {
        self.images = Some(ImageServices::new(provider, optimizer));
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Load the template named by `config` and generate from it.
    pub async fn generate(
        &self,
        config: &GenerationConfig,
        inputs: &Variables,
    ) -> Result<Document, PipelineError> {
        config.validate()?;
        let GenerationSource::Template(path) = &config.source else {
            return Err(PipelineError::Config(
                "template-driven generation requires a template path".to_string(),
            ));
        };
        let template = TemplateDocument::from_path(path)?;
        self.generate_from(&template, config, inputs).await
    }

    /// Generate from an already parsed template.
    ///
    /// Content blocks see only `inputs`, never the rest of the run
    /// configuration. Fails when SEO extraction fails; that failure is not
    /// retryable.
    pub async fn generate_from(
        &self,
        template: &TemplateDocument,
        config: &GenerationConfig,
        inputs: &Variables,
    ) -> Result<Document, PipelineError> {
        config.validate()?;
        let run_id = Uuid::new_v4().to_string();
        let memory = ConversationMemory::new().with_debug(config.debug_memory);
        let chain = ChainBuilder::new(self.model.as_ref(), &memory, config.completion_options())
            .with_debug_prompts(config.debug_prompts);

        let preview = template.preview();
        info!(
            run_id = %run_id,
            content_blocks = preview.content_blocks,
            image_blocks = preview.image_blocks,
            model = self.model.model_name(),
            "Starting template generation run"
        );

        let missing = template.missing_variables(inputs);
        if !missing.is_empty() {
            warn!(
                run_id = %run_id,
                missing = %missing.join(", "),
                "Template references variables with no input value; leaving them as-is"
            );
        }

        // Init
        let directive = match template.system_block() {
            Some(block) => interpolate(&block.text, inputs),
            None => TEMPLATE_DEFAULT_DIRECTIVE.to_string(),
        };
        memory.append(&directive, SYSTEM_ACKNOWLEDGEMENT);

        let orchestrator =
            ImageServices::orchestrator_for(self.images.as_ref(), config, &self.settings, &run_id);

        // Blocks, in document order
        let mut generated = Vec::new();
        let mut images = Vec::new();
        let mut degraded_sections = 0;
        let mut last_content = String::new();

        for (index, block) in template.generation_blocks().enumerate() {
            match block.kind {
                BlockKind::Image => {
                    let placeholder = match &orchestrator {
                        Some(orchestrator) => {
                            let image =
                                image_block(orchestrator, index, block, inputs, &last_content)
                                    .await;
                            match image {
                                Some(image) => {
                                    let markdown = image_markdown(&image, block, inputs);
                                    images.push(image);
                                    markdown
                                }
                                None => String::new(),
                            }
                        }
                        None => String::new(),
                    };
                    generated.push(placeholder);
                }
                BlockKind::Content => {
                    let prompt = format!("{}{}", block.text, TEMPLATE_CONTENT_SUFFIX);
                    let stage = text_stage(
                        &chain,
                        &memory,
                        &self.settings.retry,
                        "template_block",
                        &prompt,
                        inputs,
                    )
                    .await;
                    degraded_sections += usize::from(stage.degraded);
                    debug!(run_id = %run_id, block = index, degraded = stage.degraded, "Content block finished");
                    last_content = stage.text.clone();
                    generated.push(stage.text);
                }
                BlockKind::System => {}
            }
        }

        let content = template.substitute(&generated, SystemBlock::Drop)?;

        // SEO extraction
        info!(run_id = %run_id, stage = "seo", "Stage started");
        let seo = extract_seo(&chain, &content).await?;
        info!(run_id = %run_id, stage = "seo", h1 = %seo.h1, "Stage finished");

        info!(
            run_id = %run_id,
            chars = content.len(),
            degraded_sections,
            images = images.len(),
            "Template generation run finished"
        );

        Ok(Document {
            slug: normalize_or_derive(&seo.slug, &seo.h1),
            title: seo.h1,
            content,
            seo_title: seo.seo_title,
            seo_description: seo.seo_description,
            images,
            generated_at: Utc::now(),
            degraded_sections,
        })
    }
}

async fn image_block(
    orchestrator: &ImageOrchestrator,
    index: usize,
    block: &PromptBlock,
    inputs: &Variables,
    context: &str,
) -> Option<GeneratedImage> {
    let prompt = interpolate(&block.text, inputs);
    orchestrator
        .generate_single(&format!("block-{}", index), &prompt, context)
        .await
}

fn image_markdown(image: &GeneratedImage, block: &PromptBlock, inputs: &Variables) -> String {
    let alt = interpolate(&block.text, inputs).replace(['[', ']'], "");
    format!("![{}]({})", alt, image.url)
}

async fn extract_seo(chain: &ChainBuilder<'_>, content: &str) -> Result<SeoInfo, PipelineError> {
    let mut vars = Variables::new();
    vars.insert("content".to_string(), content.to_string());

    let value = chain
        .structured(SEO_PROMPT, &vars, &seo_schema())
        .await
        .map_err(|err| PipelineError::content_terminal("SEO extraction failed", Some(err)))?;
    parse_seo_info(value).map_err(|err| {
        PipelineError::content_terminal("SEO extraction returned invalid metadata", Some(err))
    })
}
