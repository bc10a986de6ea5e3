//! Error types for the quill generation pipeline.
//!
//! Every failure a run can surface is a [`PipelineError`]. Each variant knows
//! whether re-running the failed stage is worth trying, exposed through
//! [`PipelineError::is_retryable`]. Image failures live in their own
//! [`ImageError`] family and are recovered inside the image layer.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying cause carried by pipeline errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the image orchestration layer
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Prompt optimization failed: {message}")]
    PromptOptimization {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Image provider failed: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid image configuration: {0}")]
    InvalidConfiguration(String),
}

impl ImageError {
    pub fn optimization(message: impl Into<String>) -> Self {
        ImageError::PromptOptimization {
            message: message.into(),
            source: None,
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        ImageError::Provider {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ImageError::PromptOptimization { .. } => true,
            ImageError::Provider { .. } => true,
            ImageError::InvalidConfiguration(_) => false,
        }
    }
}

/// Pipeline-level errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Audience/intent or outline stage failed or produced an invalid structure.
    #[error("Outline generation failed: {message}")]
    OutlineGeneration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A free-text or SEO extraction stage produced no usable output.
    #[error("Content generation failed: {message}")]
    ContentGeneration {
        message: String,
        retryable: bool,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Memory management failed: {message}")]
    MemoryManagement {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("Failed to read template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<PipelineError>,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn outline(message: impl Into<String>) -> Self {
        PipelineError::OutlineGeneration {
            message: message.into(),
            source: None,
        }
    }

    /// Outline-class failure wrapping the error that caused it.
    pub fn outline_caused_by(message: impl Into<String>, cause: PipelineError) -> Self {
        PipelineError::OutlineGeneration {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn content(message: impl Into<String>) -> Self {
        PipelineError::ContentGeneration {
            message: message.into(),
            retryable: true,
            source: None,
        }
    }

    /// Terminal content failure: the document exists but cannot be finalized.
    pub fn content_terminal(message: impl Into<String>, cause: Option<PipelineError>) -> Self {
        PipelineError::ContentGeneration {
            message: message.into(),
            retryable: false,
            source: cause.map(|c| Box::new(c) as BoxError),
        }
    }

    pub fn memory(message: impl Into<String>) -> Self {
        PipelineError::MemoryManagement {
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(field: Option<&str>, message: impl Into<String>) -> Self {
        PipelineError::Validation {
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    /// Whether re-running the failed stage may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::OutlineGeneration { .. } => true,
            PipelineError::ContentGeneration { retryable, .. } => *retryable,
            PipelineError::MemoryManagement { .. } => false,
            PipelineError::Validation { .. } => false,
            PipelineError::Image(err) => err.is_retryable(),
            PipelineError::MalformedTemplate(_) => false,
            PipelineError::Template { .. } => false,
            PipelineError::RetriesExhausted { .. } => false,
            PipelineError::Provider(_) => true,
            PipelineError::Config(_) => false,
        }
    }

    /// Offending field of a validation failure, when known.
    pub fn field(&self) -> Option<&str> {
        match self {
            PipelineError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
