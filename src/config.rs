//! Configuration System
//!
//! Two layers of configuration:
//!
//! * [`GenerationConfig`]: the immutable input of one generation run (topic or
//!   template, language, model, feature flags).
//! * [`PipelineSettings`]: process-level tunables (logging, retry policy, image
//!   concurrency) layered from defaults, an optional TOML file and `QUILL_*`
//!   environment variables.

use crate::concurrency::RetryPolicy;
use crate::error::PipelineError;
use crate::logging::LoggingConfig;
use crate::provider::CompletionOptions;
use crate::template::Variables;
use crate::types::AudienceIntent;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on images requested per leaf section
pub const MAX_IMAGES_PER_SECTION: u32 = 10;

/// What a run generates from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
    Topic(String),
    Template(PathBuf),
}

/// Input of one generation run
#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub source: GenerationSource,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Provider credential, forwarded to the model client
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub infer_audience_intent: bool,
    #[serde(default = "default_true")]
    pub include_conclusion: bool,
    #[serde(default)]
    pub generate_images: bool,
    #[serde(default = "default_images_per_section")]
    pub images_per_section: u32,
    /// Log every rendered prompt at debug level
    #[serde(default)]
    pub debug_prompts: bool,
    /// Log every recorded memory turn at debug level
    #[serde(default)]
    pub debug_memory: bool,
}

fn default_language() -> String {
    "English".to_string()
}

fn default_country() -> String {
    "United States".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_images_per_section() -> u32 {
    1
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("source", &self.source)
            .field("language", &self.language)
            .field("country", &self.country)
            .field("audience", &self.audience)
            .field("intent", &self.intent)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("infer_audience_intent", &self.infer_audience_intent)
            .field("include_conclusion", &self.include_conclusion)
            .field("generate_images", &self.generate_images)
            .field("images_per_section", &self.images_per_section)
            .finish()
    }
}

impl GenerationConfig {
    fn with_source(source: GenerationSource) -> Self {
        Self {
            source,
            language: default_language(),
            country: default_country(),
            audience: None,
            intent: None,
            model: default_model(),
            temperature: default_temperature(),
            api_key: None,
            infer_audience_intent: false,
            include_conclusion: true,
            generate_images: false,
            images_per_section: default_images_per_section(),
            debug_prompts: false,
            debug_memory: false,
        }
    }

    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self::with_source(GenerationSource::Topic(topic.into()))
    }

    pub fn for_template(path: impl Into<PathBuf>) -> Self {
        Self::with_source(GenerationSource::Template(path.into()))
    }

    pub fn topic(&self) -> Option<&str> {
        match &self.source {
            GenerationSource::Topic(topic) => Some(topic),
            GenerationSource::Template(_) => None,
        }
    }

    /// Validate run configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        match &self.source {
            GenerationSource::Topic(topic) if topic.trim().is_empty() => {
                return Err(PipelineError::Config("topic cannot be empty".to_string()))
            }
            GenerationSource::Template(path) if path.as_os_str().is_empty() => {
                return Err(PipelineError::Config(
                    "template path cannot be empty".to_string(),
                ))
            }
            _ => {}
        }
        if self.model.trim().is_empty() {
            return Err(PipelineError::Config("model cannot be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PipelineError::Config(format!(
                "temperature {} outside 0.0-2.0",
                self.temperature
            )));
        }
        if self.images_per_section > MAX_IMAGES_PER_SECTION {
            return Err(PipelineError::Config(format!(
                "images_per_section {} exceeds {}",
                self.images_per_section, MAX_IMAGES_PER_SECTION
            )));
        }
        Ok(())
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: Some(self.model.clone()),
            temperature: Some(self.temperature),
            max_tokens: None,
            api_key: self.api_key.clone(),
        }
    }
}

/// Run configuration plus values resolved by earlier stages.
///
/// Later stages read audience/intent from here instead of from a mutated
/// `GenerationConfig`.
#[derive(Debug, Clone)]
pub struct EnrichedConfig {
    base: GenerationConfig,
    audience: Option<String>,
    intent: Option<String>,
}

impl EnrichedConfig {
    pub fn new(base: GenerationConfig) -> Self {
        let audience = base.audience.clone();
        let intent = base.intent.clone();
        Self {
            base,
            audience,
            intent,
        }
    }

    /// New value carrying the inferred audience and intent.
    pub fn with_audience_intent(self, inferred: AudienceIntent) -> Self {
        Self {
            audience: Some(inferred.audience),
            intent: Some(inferred.intent),
            ..self
        }
    }

    pub fn base(&self) -> &GenerationConfig {
        &self.base
    }

    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    /// Prompt variables for the stage prompts.
    pub fn variables(&self) -> Variables {
        let mut vars = Variables::new();
        if let Some(topic) = self.base.topic() {
            vars.insert("topic".to_string(), topic.to_string());
        }
        vars.insert("language".to_string(), self.base.language.clone());
        vars.insert("country".to_string(), self.base.country.clone());
        vars.insert(
            "audience".to_string(),
            self.audience.clone().unwrap_or_else(|| "a general audience".to_string()),
        );
        vars.insert(
            "intent".to_string(),
            self.intent.clone().unwrap_or_else(|| "informational".to_string()),
        );
        vars
    }
}

/// Image layer tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Image requests in flight at once
    #[serde(default = "default_image_concurrency")]
    pub concurrency: usize,
    /// Optimized prompts kept per run
    #[serde(default = "default_optimizer_cache_capacity")]
    pub optimizer_cache_capacity: usize,
    /// Provider attempts per image, the first included
    #[serde(default = "default_image_attempts")]
    pub max_attempts: u32,
}

fn default_image_concurrency() -> usize {
    2
}

fn default_optimizer_cache_capacity() -> usize {
    64
}

fn default_image_attempts() -> u32 {
    3
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            concurrency: default_image_concurrency(),
            optimizer_cache_capacity: default_optimizer_cache_capacity(),
            max_attempts: default_image_attempts(),
        }
    }
}

/// Process-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub images: ImageSettings,
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.images.concurrency == 0 {
            return Err(PipelineError::Config(
                "images.concurrency must be at least 1".to_string(),
            ));
        }
        if self.images.optimizer_cache_capacity == 0 {
            return Err(PipelineError::Config(
                "images.optimizer_cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(PipelineError::Config(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads [`PipelineSettings`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default settings file: `$XDG_CONFIG_HOME/quill/config.toml` or platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "quill").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load settings from defaults, the given (or default) file, then `QUILL_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<PipelineSettings, PipelineError> {
        let mut builder = Self::builder_with_defaults()?;

        let file = path.map(Path::to_path_buf).or_else(Self::default_path);
        if let Some(file) = file {
            if file.exists() {
                debug!(config_path = %file.display(), "Loading settings file");
                builder = builder.add_source(File::from(file).required(true));
            } else if path.is_some() {
                return Err(PipelineError::Config(format!(
                    "settings file not found: {}",
                    file.display()
                )));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("QUILL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: PipelineSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = RetryPolicy::default();
        let images = ImageSettings::default();
        Config::builder()
            .set_default("retry.max_attempts", defaults.max_attempts as i64)?
            .set_default("retry.initial_delay_ms", defaults.initial_delay_ms as i64)?
            .set_default("retry.multiplier", defaults.multiplier)?
            .set_default("retry.max_delay_ms", defaults.max_delay_ms as i64)?
            .set_default("images.concurrency", images.concurrency as i64)?
            .set_default(
                "images.optimizer_cache_capacity",
                images.optimizer_cache_capacity as i64,
            )?
            .set_default("images.max_attempts", images.max_attempts as i64)
    }
}
