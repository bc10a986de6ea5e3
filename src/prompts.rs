//! Stage prompts and structured output schemas.
//!
//! Prompts use the same `{variable}` placeholders as templates and are rendered
//! with [`crate::template::interpolate`].

use crate::provider::OutputSchema;
use serde_json::json;

pub const SYSTEM_DIRECTIVE: &str = "You are an experienced writer producing a long-form article \
about \"{topic}\" in {language} for readers in {country}. Write in clear markdown. Never repeat \
a section you already wrote, never add headings unless asked, and keep a consistent voice \
across every answer in this conversation.";

/// Recorded as the result of the directive turn.
pub const SYSTEM_ACKNOWLEDGEMENT: &str =
    "Understood. I will follow these instructions for every request in this conversation.";

pub const AUDIENCE_INTENT_PROMPT: &str = "Who is the most likely target audience for an article \
about \"{topic}\" written in {language} for readers in {country}, and what is their search \
intent (informational, navigational, commercial or transactional)? Answer with a short \
audience description and the intent.";

pub const OUTLINE_PROMPT: &str = "Create the outline of an article about \"{topic}\" for \
{audience} with {intent} intent. Provide the article title, a URL slug, an SEO title of at most \
60 characters, an SEO description of at most 155 characters, and a list of headings. Headings \
may have child headings (at most two levels below the top level) and optional keywords.";

pub const INTRODUCTION_PROMPT: &str = "Write the introduction of the article following the \
outline above, for {audience}. Two or three paragraphs, no heading. Wrap the answer in a \
```markdown block.";

pub const SECTION_PROMPT: &str = "Write the body of the section \"{heading}\" of the article. \
Cover these keywords where they fit naturally: {keywords}. Do not repeat the section title and \
do not add headings. Wrap the answer in a ```markdown block.";

pub const CONCLUSION_PROMPT: &str = "Write the conclusion of the article, summarizing the key \
points for {audience}. One or two paragraphs, no heading. Wrap the answer in a ```markdown \
block.";

pub const SEO_PROMPT: &str = "Read the article below and produce its H1 heading, an SEO title \
of at most 60 characters, an SEO description of at most 155 characters and a URL slug.\n\n\
ARTICLE:\n{content}";

/// Default style directive for templates without a system block.
pub const TEMPLATE_DEFAULT_DIRECTIVE: &str = "You are an experienced writer. Follow each \
instruction exactly and answer with the requested content only, in markdown.";

/// Instruction appended to every template content block.
pub const TEMPLATE_CONTENT_SUFFIX: &str = "\n\nAnswer with the content only, wrapped in a \
```markdown block.";

pub fn audience_intent_schema() -> OutputSchema {
    OutputSchema {
        name: "audience_intent".to_string(),
        description: "Target audience and search intent of an article".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "audience": { "type": "string" },
                "intent": { "type": "string" }
            },
            "required": ["audience", "intent"]
        }),
    }
}

pub fn outline_schema() -> OutputSchema {
    let heading = json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "keywords": { "type": "array", "items": { "type": "string" } },
            "children": { "type": "array", "items": { "$ref": "#/$defs/heading" } }
        },
        "required": ["title"]
    });

    OutputSchema {
        name: "outline".to_string(),
        description: "Article outline with nested headings and SEO fields".to_string(),
        schema: json!({
            "type": "object",
            "$defs": { "heading": heading },
            "properties": {
                "title": { "type": "string" },
                "slug": { "type": "string" },
                "seoTitle": { "type": "string" },
                "seoDescription": { "type": "string" },
                "headings": { "type": "array", "items": { "$ref": "#/$defs/heading" } }
            },
            "required": ["title", "slug", "seoTitle", "seoDescription", "headings"]
        }),
    }
}

pub fn seo_schema() -> OutputSchema {
    OutputSchema {
        name: "seo_info".to_string(),
        description: "H1, SEO title, SEO description and slug of an article".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "h1": { "type": "string" },
                "seoTitle": { "type": "string" },
                "seoDescription": { "type": "string" },
                "slug": { "type": "string" }
            },
            "required": ["h1", "seoTitle", "seoDescription", "slug"]
        }),
    }
}
