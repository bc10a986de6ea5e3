//! Quill: Multi-Stage Document Generation
//!
//! A pipeline that turns a topic, or a prompt template, into a long-form
//! markdown document through a fixed sequence of language model calls. A shared
//! conversation memory keeps every stage coherent with the ones before it.
//! Structured stages are validated, empty text degrades to a visible sentinel,
//! and images are generated with bounded concurrency and per-request retries.

pub mod chain;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod formatter;
pub mod generation;
pub mod images;
pub mod logging;
pub mod memory;
pub mod prompts;
pub mod provider;
pub mod slug;
pub mod template;
pub mod types;
pub mod validation;

pub use config::{EnrichedConfig, GenerationConfig, PipelineSettings};
pub use error::{ImageError, PipelineError};
pub use generation::{AutoGenerator, TemplateGenerator, DEGRADED_SECTION_SENTINEL};
pub use memory::ConversationMemory;
pub use template::{TemplateDocument, Variables};
pub use types::{Document, GeneratedImage, Heading, Outline};
