//! CLI: clap types plus the template inspection commands.
//!
//! Generation itself needs a model client and is driven by library callers;
//! the binary only inspects and checks templates and shows settings.

use crate::config::PipelineSettings;
use crate::error::PipelineError;
use crate::template::{BlockKind, TemplateDocument, Variables};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Longest block text shown in tables
const BLOCK_PREVIEW_CHARS: usize = 60;

/// Quill CLI - template tooling for the document generation pipeline
#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Inspect and check quill prompt templates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file path (overrides the default location)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a template's blocks and variables
    Inspect {
        /// Template file
        template: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Parse a template and report variables without a value
    Check {
        /// Template file
        template: PathBuf,
        /// Input value as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Print the effective settings as TOML
    Settings,
}

/// Parse a `key=value` pair.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Execute a command and return the text to print.
pub fn execute(command: &Commands, settings: &PipelineSettings) -> Result<String, PipelineError> {
    match command {
        Commands::Inspect { template, format } => {
            let document = TemplateDocument::from_path(template)?;
            match format.as_str() {
                "json" => format_inspect_json(&document),
                "text" => Ok(format_inspect_text(template, &document)),
                other => Err(PipelineError::Config(format!(
                    "Invalid format: {} (must be 'text' or 'json')",
                    other
                ))),
            }
        }
        Commands::Check { template, vars } => {
            let document = TemplateDocument::from_path(template)?;
            let inputs: Variables = vars.iter().cloned().collect();
            Ok(format_check(template, &document, &inputs))
        }
        Commands::Settings => toml::to_string_pretty(settings)
            .map_err(|e| PipelineError::Config(format!("Failed to render settings: {}", e))),
    }
}

pub fn format_inspect_json(document: &TemplateDocument) -> Result<String, PipelineError> {
    serde_json::to_string_pretty(&document.preview())
        .map_err(|e| PipelineError::Config(format!("Failed to render preview: {}", e)))
}

pub fn format_inspect_text(path: &Path, document: &TemplateDocument) -> String {
    let preview = document.preview();

    let mut summary = Table::new();
    summary.load_preset(comfy_table::presets::UTF8_FULL);
    summary.set_header(vec!["Property", "Value"]);
    summary.add_row(vec![
        "System prompt".to_string(),
        preview
            .system_prompt
            .as_deref()
            .map(shorten)
            .unwrap_or_else(|| "-".to_string()),
    ]);
    summary.add_row(vec![
        "Content blocks".to_string(),
        preview.content_blocks.to_string(),
    ]);
    summary.add_row(vec!["Image blocks".to_string(), preview.image_blocks.to_string()]);
    summary.add_row(vec![
        "Variables".to_string(),
        if preview.variables.is_empty() {
            "-".to_string()
        } else {
            preview.variables.join(", ")
        },
    ]);

    let mut blocks = Table::new();
    blocks.load_preset(comfy_table::presets::UTF8_FULL);
    blocks.set_header(vec!["#", "Kind", "Text"]);
    for (index, block) in document.blocks().iter().enumerate() {
        let kind = match block.kind {
            BlockKind::System => "system",
            BlockKind::Content => "content",
            BlockKind::Image => "image",
        };
        blocks.add_row(vec![index.to_string(), kind.to_string(), shorten(&block.text)]);
    }

    format!(
        "{}\n{}\n\n{}",
        format!("Template: {}", path.display()).bold(),
        summary,
        blocks
    )
}

pub fn format_check(path: &Path, document: &TemplateDocument, inputs: &Variables) -> String {
    let missing = document.missing_variables(inputs);
    let preview = document.preview();
    let mut out = format!(
        "{} {} ({} content, {} image blocks)",
        "OK".green().bold(),
        path.display(),
        preview.content_blocks,
        preview.image_blocks
    );
    if document.system_block().is_none() {
        out.push_str(&format!(
            "\n{} no system block; the default directive will be used",
            "note:".cyan()
        ));
    }
    if !missing.is_empty() {
        out.push_str(&format!(
            "\n{} variables without a value: {}",
            "warning:".yellow().bold(),
            missing.join(", ")
        ));
    }
    out
}

fn shorten(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= BLOCK_PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(BLOCK_PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    }
}
