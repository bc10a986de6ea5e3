//! Prompt Template Language
//!
//! Templates are literal documents with typed prompt blocks embedded in them:
//!
//! * `{{s: ... }}` system block, at most once
//! * `{{c: ... }}` content block, one or more
//! * `{{i: ... }}` image block, zero or more
//!
//! Block text may reference `{variable}` placeholders, which are substituted
//! from the run's input map at generation time. After generation, every
//! non-system block span is spliced out and replaced with its generated text.

use crate::error::PipelineError;
use indexmap::IndexSet;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Named input values substituted into `{placeholder}` references.
pub type Variables = HashMap<String, String>;

const VARIABLE_PATTERN: &str = r"\{([A-Za-z_][A-Za-z0-9_]*)\}";

// A block body runs lazily up to the first closing `}}`. Extra `}` right before
// the close belong to the body, so `{{c: about {topic}}}` keeps its placeholder.
const BLOCK_PATTERN: &str = r"(?s)\{\{([sci]):(.*?\}*)\}\}";

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BLOCK_PATTERN).expect("block pattern is valid"))
}

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VARIABLE_PATTERN).expect("variable pattern is valid"))
}

/// Block type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    System,
    Content,
    Image,
}

impl BlockKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(BlockKind::System),
            "c" => Some(BlockKind::Content),
            "i" => Some(BlockKind::Image),
            _ => None,
        }
    }
}

/// One delimited block of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBlock {
    pub kind: BlockKind,
    /// Block body with surrounding whitespace trimmed, placeholders intact
    pub text: String,
    /// Byte range of the whole `{{x: ... }}` span in the source
    pub start: usize,
    pub end: usize,
}

/// Whether `substitute` keeps the system block span in its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemBlock {
    Keep,
    Drop,
}

/// Summary of a template for management and preview surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplatePreview {
    pub system_prompt: Option<String>,
    pub content_blocks: usize,
    pub image_blocks: usize,
    pub variables: Vec<String>,
}

/// Parsed template: source text plus its ordered blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    source: String,
    blocks: Vec<PromptBlock>,
    variables: Vec<String>,
}

impl TemplateDocument {
    /// Parse template source text.
    pub fn parse(source: impl Into<String>) -> Result<Self, PipelineError> {
        let source = source.into();

        let blocks: Vec<PromptBlock> = block_regex()
            .captures_iter(&source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let kind = BlockKind::from_tag(caps.get(1)?.as_str())?;
                Some(PromptBlock {
                    kind,
                    text: caps.get(2)?.as_str().trim().to_string(),
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect();

        let system_count = blocks.iter().filter(|b| b.kind == BlockKind::System).count();
        let content_count = blocks.iter().filter(|b| b.kind == BlockKind::Content).count();

        if system_count == 0 && content_count == 0 {
            return Err(PipelineError::MalformedTemplate(
                "template contains neither a system block nor a content block".to_string(),
            ));
        }
        if system_count > 1 {
            return Err(PipelineError::MalformedTemplate(format!(
                "template contains {} system blocks, expected at most one",
                system_count
            )));
        }

        let variables = extract_variables(&source);

        Ok(Self {
            source,
            blocks,
            variables,
        })
    }

    /// Read and parse a template file.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Template {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(source)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn blocks(&self) -> &[PromptBlock] {
        &self.blocks
    }

    /// Distinct variable names in order of first appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn system_block(&self) -> Option<&PromptBlock> {
        self.blocks.iter().find(|b| b.kind == BlockKind::System)
    }

    /// Content and image blocks in document order.
    pub fn generation_blocks(&self) -> impl Iterator<Item = &PromptBlock> {
        self.blocks.iter().filter(|b| b.kind != BlockKind::System)
    }

    pub fn preview(&self) -> TemplatePreview {
        TemplatePreview {
            system_prompt: self.system_block().map(|b| b.text.clone()),
            content_blocks: self.count(BlockKind::Content),
            image_blocks: self.count(BlockKind::Image),
            variables: self.variables.clone(),
        }
    }

    fn count(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| b.kind == kind).count()
    }

    /// Variables referenced by the template but absent from `vars`.
    pub fn missing_variables(&self, vars: &Variables) -> Vec<String> {
        self.variables
            .iter()
            .filter(|name| !vars.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    /// Splice generated strings into the template, one per non-system block
    /// in block order. Text outside the replaced spans is copied verbatim.
    pub fn substitute(
        &self,
        generated: &[String],
        system: SystemBlock,
    ) -> Result<String, PipelineError> {
        let expected = self.generation_blocks().count();
        if generated.len() != expected {
            return Err(PipelineError::validation(
                Some("generated"),
                format!(
                    "expected {} generated blocks, got {}",
                    expected,
                    generated.len()
                ),
            ));
        }

        let mut output = String::with_capacity(self.source.len());
        let mut cursor = 0;
        let mut replacements = generated.iter();

        for block in &self.blocks {
            output.push_str(&self.source[cursor..block.start]);
            match block.kind {
                BlockKind::System => {
                    if system == SystemBlock::Keep {
                        output.push_str(&self.source[block.start..block.end]);
                    }
                }
                BlockKind::Content | BlockKind::Image => {
                    if let Some(text) = replacements.next() {
                        output.push_str(text);
                    }
                }
            }
            cursor = block.end;
        }
        output.push_str(&self.source[cursor..]);

        Ok(output)
    }
}

/// Distinct `{identifier}` names in order of first appearance.
pub fn extract_variables(text: &str) -> Vec<String> {
    variable_regex()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Replace `{name}` with `vars[name]`; placeholders without a value are left as-is.
pub fn interpolate(text: &str, vars: &Variables) -> String {
    variable_regex()
        .replace_all(text, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
