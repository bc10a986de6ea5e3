//! Structured Output Validation
//!
//! Shape checks for the structured results returned by schema-constrained
//! model calls. The `is_valid_*` predicates are pure; the `parse_*` functions
//! report the first offending field and decode the value into its typed form.

use crate::error::PipelineError;
use crate::types::{AudienceIntent, Outline, SeoInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;

const OUTLINE_TEXT_FIELDS: [&str; 4] = ["title", "slug", "seoTitle", "seoDescription"];
const SEO_TEXT_FIELDS: [&str; 4] = ["h1", "seoTitle", "seoDescription", "slug"];
const AUDIENCE_TEXT_FIELDS: [&str; 2] = ["audience", "intent"];

pub fn is_valid_outline(value: &Value) -> bool {
    check_outline(value).is_ok()
}

pub fn is_valid_seo_info(value: &Value) -> bool {
    check_text_fields(value, &SEO_TEXT_FIELDS).is_ok()
}

pub fn is_valid_audience_intent(value: &Value) -> bool {
    check_audience_intent(value).is_ok()
}

/// Validate and decode an outline.
pub fn parse_outline(value: Value) -> Result<Outline, PipelineError> {
    let value = coerce_structured(value);
    check_outline(&value)?;
    decode(value, "outline")
}

/// Validate and decode SEO metadata.
pub fn parse_seo_info(value: Value) -> Result<SeoInfo, PipelineError> {
    let value = coerce_structured(value);
    check_text_fields(&value, &SEO_TEXT_FIELDS)?;
    decode(value, "seo")
}

/// Validate and decode an audience/intent pair.
pub fn parse_audience_intent(value: Value) -> Result<AudienceIntent, PipelineError> {
    let value = coerce_structured(value);
    check_audience_intent(&value)?;
    decode(value, "audienceIntent")
}

/// Structured results sometimes arrive as a JSON string, possibly inside a
/// code fence. Such strings are parsed; anything else is returned unchanged.
pub fn coerce_structured(value: Value) -> Value {
    match value {
        Value::String(text) => {
            let body = strip_code_fence(&text);
            serde_json::from_str(body).unwrap_or(Value::String(text))
        }
        other => other,
    }
}

const FENCE: &str = "```";

/// Info strings of fences that wrap a whole reply
const WRAPPING_FENCE_TAGS: [&str; 4] = ["", "markdown", "md", "json"];

/// Body of the reply's wrapping fence (```` ```markdown ````, ```` ```md ````,
/// ```` ```json ```` or bare ```` ``` ````), or the trimmed input when the reply
/// is not wrapped. Code blocks in other languages stay part of the text.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body_start) = wrapping_fence_body_start(trimmed) else {
        return trimmed;
    };
    let body = &trimmed[body_start..];
    // The outer fence closes last; fences in between belong to nested code.
    match body.rfind(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Offset just past the opening line of the first wrapping fence. Fenced
/// blocks in other languages are skipped together with their closing fence.
fn wrapping_fence_body_start(text: &str) -> Option<usize> {
    let mut inside_code = false;
    for (index, _) in text.match_indices(FENCE) {
        if inside_code {
            inside_code = false;
            continue;
        }
        let after = index + FENCE.len();
        let line_end = text[after..]
            .find('\n')
            .map(|i| after + i)
            .unwrap_or(text.len());
        let tag = text[after..line_end].trim().to_ascii_lowercase();
        if WRAPPING_FENCE_TAGS.contains(&tag.as_str()) {
            return Some((line_end + 1).min(text.len()));
        }
        inside_code = true;
    }
    None
}

fn check_outline(value: &Value) -> Result<(), PipelineError> {
    check_text_fields(value, &OUTLINE_TEXT_FIELDS)?;
    match value.get("headings") {
        Some(Value::Array(headings)) => check_headings(headings, "headings"),
        _ => Err(PipelineError::validation(
            Some("headings"),
            "headings must be an array",
        )),
    }
}

fn check_headings(headings: &[Value], path: &str) -> Result<(), PipelineError> {
    for (index, heading) in headings.iter().enumerate() {
        let here = format!("{}[{}]", path, index);
        if !matches!(heading.get("title"), Some(Value::String(_))) {
            let field = format!("{}.title", here);
            return Err(PipelineError::validation(
                Some(field.as_str()),
                "heading title must be text",
            ));
        }
        let children = heading.get("children").or_else(|| heading.get("subheadings"));
        match children {
            None | Some(Value::Null) => {}
            Some(Value::Array(children)) => {
                check_headings(children, &format!("{}.children", here))?
            }
            Some(_) => {
                let field = format!("{}.children", here);
                return Err(PipelineError::validation(
                    Some(field.as_str()),
                    "heading children must be an array",
                ));
            }
        }
    }
    Ok(())
}

fn check_audience_intent(value: &Value) -> Result<(), PipelineError> {
    check_text_fields(value, &AUDIENCE_TEXT_FIELDS)?;
    for field in AUDIENCE_TEXT_FIELDS {
        let blank = value
            .get(field)
            .and_then(Value::as_str)
            .map(|s| s.trim().is_empty())
            .unwrap_or(true);
        if blank {
            return Err(PipelineError::validation(
                Some(field),
                format!("{} must not be blank", field),
            ));
        }
    }
    Ok(())
}

fn check_text_fields(value: &Value, fields: &[&str]) -> Result<(), PipelineError> {
    if !value.is_object() {
        return Err(PipelineError::validation(
            None,
            "structured result must be an object",
        ));
    }
    for field in fields {
        if !matches!(value.get(*field), Some(Value::String(_))) {
            return Err(PipelineError::validation(
                Some(*field),
                format!("{} must be text", field),
            ));
        }
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, PipelineError> {
    serde_json::from_value(value)
        .map_err(|e| PipelineError::validation(Some(what), format!("malformed {}: {}", what, e)))
}
