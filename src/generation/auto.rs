//! Topic-driven generation pipeline.

use super::{assemble, text_stage, ImageServices};
use crate::chain::ChainBuilder;
use crate::concurrency::RetryPolicy;
use crate::config::{EnrichedConfig, GenerationConfig, PipelineSettings};
use crate::error::PipelineError;
use crate::formatter::{format_sections, LeafGenerator};
use crate::memory::ConversationMemory;
use crate::prompts::{
    audience_intent_schema, outline_schema, AUDIENCE_INTENT_PROMPT, CONCLUSION_PROMPT,
    INTRODUCTION_PROMPT, OUTLINE_PROMPT, SECTION_PROMPT, SYSTEM_ACKNOWLEDGEMENT,
    SYSTEM_DIRECTIVE,
};
use crate::provider::{ImageProvider, LanguageModel, PromptOptimizer};
use crate::slug::normalize_or_derive;
use crate::template::{interpolate, Variables};
use crate::types::{AudienceIntent, Document, Heading, Outline};
use crate::validation::{parse_audience_intent, parse_outline};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Builds a document from a topic
pub struct AutoGenerator {
    model: Arc<dyn LanguageModel>,
    images: Option<ImageServices>,
    settings: PipelineSettings,
}

impl AutoGenerator {
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

    /// Run every stage for `config` and return the finished document.
    ///
    /// Fails only when the audience/intent or outline stage fails; empty text
    /// sections degrade to the sentinel and image failures are dropped.
    pub async fn generate(&self, config: &GenerationConfig) -> Result<Document, PipelineError> {
        config.validate()?;
        let topic = config.topic().ok_or_else(|| {
            PipelineError::Config("topic-driven generation requires a topic".to_string())
        })?;

        let run_id = Uuid::new_v4().to_string();
        let memory = ConversationMemory::new().with_debug(config.debug_memory);
        let chain = ChainBuilder::new(self.model.as_ref(), &memory, config.completion_options())
            .with_debug_prompts(config.debug_prompts);
        let retry = &self.settings.retry;

        info!(run_id = %run_id, topic, model = self.model.model_name(), "Starting generation run");

        // Init
        let mut enriched = EnrichedConfig::new(config.clone());
        let directive = interpolate(SYSTEM_DIRECTIVE, &enriched.variables());
        memory.append(&directive, SYSTEM_ACKNOWLEDGEMENT);

        // Audience and intent
        if config.infer_audience_intent {
            info!(run_id = %run_id, stage = "audience_intent", "Stage started");
            let inferred = infer_audience_intent(&chain, &enriched.variables()).await?;
            info!(
                run_id = %run_id,
                stage = "audience_intent",
                audience = %inferred.audience,
                intent = %inferred.intent,
                "Stage finished"
            );
            enriched = enriched.with_audience_intent(inferred);
        }
        let vars = enriched.variables();

        // Outline
        info!(run_id = %run_id, stage = "outline", "Stage started");
        let outline = generate_outline(&chain, &vars).await?;
        memory.append_value(&chain.render(OUTLINE_PROMPT, &vars), &outline);
        info!(
            run_id = %run_id,
            stage = "outline",
            title = %outline.title,
            leaves = outline.leaf_count(),
            "Stage finished"
        );

        let mut degraded_sections = 0;

        // Introduction
        let introduction =
            text_stage(&chain, &memory, retry, "introduction", INTRODUCTION_PROMPT, &vars).await;
        degraded_sections += usize::from(introduction.degraded);
        info!(run_id = %run_id, stage = "introduction", degraded = introduction.degraded, "Stage finished");

        // Sections
        let mut writer = SectionWriter {
            chain: &chain,
            memory: &memory,
            retry,
            vars: &vars,
            degraded: 0,
        };
        let sections = format_sections(&outline.headings, String::new(), &mut writer).await;
        degraded_sections += writer.degraded;
        info!(
            run_id = %run_id,
            stage = "sections",
            degraded = writer.degraded,
            "Stage finished"
        );

        // Conclusion
        let conclusion = if config.include_conclusion {
            let conclusion =
                text_stage(&chain, &memory, retry, "conclusion", CONCLUSION_PROMPT, &vars).await;
            degraded_sections += usize::from(conclusion.degraded);
            info!(run_id = %run_id, stage = "conclusion", degraded = conclusion.degraded, "Stage finished");
            conclusion.text
        } else {
            String::new()
        };

        // Images
        let images = match ImageServices::orchestrator_for(
            self.images.as_ref(),
            config,
            &self.settings,
            &run_id,
        ) {
            Some(orchestrator) => {
                let batch = orchestrator
                    .generate_for_outline(&outline, config.images_per_section)
                    .await;
                info!(
                    run_id = %run_id,
                    stage = "images",
                    generated = batch.images.len(),
                    dropped = batch.failures.len(),
                    "Stage finished"
                );
                batch.images
            }
            None => Vec::new(),
        };

        // Assemble
        let content = assemble([
            introduction.text.as_str(),
            sections.as_str(),
            conclusion.as_str(),
        ]);
        if config.debug_memory {
            debug!(run_id = %run_id, turns = memory.len(), "Final memory size");
        }
        info!(
            run_id = %run_id,
            chars = content.len(),
            degraded_sections,
            images = images.len(),
            "Generation run finished"
        );

        Ok(Document {
            slug: normalize_or_derive(&outline.slug, &outline.title),
            title: outline.title,
            content,
            seo_title: outline.seo_title,
            seo_description: outline.seo_description,
            images,
            generated_at: Utc::now(),
            degraded_sections,
        })
    }
}

async fn infer_audience_intent(
    chain: &ChainBuilder<'_>,
    vars: &Variables,
) -> Result<AudienceIntent, PipelineError> {
    let value = chain
        .structured(AUDIENCE_INTENT_PROMPT, vars, &audience_intent_schema())
        .await
        .map_err(|err| PipelineError::outline_caused_by("audience/intent inference failed", err))?;
    parse_audience_intent(value).map_err(|err| {
        PipelineError::outline_caused_by("audience/intent result failed validation", err)
    })
}

async fn generate_outline(
    chain: &ChainBuilder<'_>,
    vars: &Variables,
) -> Result<Outline, PipelineError> {
    let value = chain
        .structured(OUTLINE_PROMPT, vars, &outline_schema())
        .await
        .map_err(|err| PipelineError::outline_caused_by("outline generation failed", err))?;
    parse_outline(value)
        .map_err(|err| PipelineError::outline_caused_by("outline failed validation", err))
}

/// Writes one leaf section body per call, recording each before the next
struct SectionWriter<'a> {
    chain: &'a ChainBuilder<'a>,
    memory: &'a ConversationMemory,
    retry: &'a RetryPolicy,
    vars: &'a Variables,
    degraded: usize,
}

#[async_trait]
impl LeafGenerator for SectionWriter<'_> {
    async fn generate(&mut self, heading: &Heading, depth: usize) -> String {
        let mut vars = self.vars.clone();
        vars.insert("heading".to_string(), heading.title.clone());
        let keywords = if heading.keywords.is_empty() {
            "none in particular".to_string()
        } else {
            heading.keywords.join(", ")
        };
        vars.insert("keywords".to_string(), keywords);

        debug!(heading = %heading.title, depth, "Writing section");
        let section =
            text_stage(self.chain, self.memory, self.retry, "section", SECTION_PROMPT, &vars)
                .await;
        self.degraded += usize::from(section.degraded);
        section.text
    }
}
