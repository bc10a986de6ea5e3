//! Core data model shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One node of an outline's heading forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub title: String,

    #[serde(
        default,
        deserialize_with = "keywords_from_any",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub keywords: Vec<String>,

    #[serde(
        default,
        alias = "subheadings",
        deserialize_with = "children_or_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<Heading>,
}

impl Heading {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            keywords: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children(mut self, children: Vec<Heading>) -> Self {
        self.children = children;
        self
    }

    /// Content is generated only for headings without children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Models return keywords either as a list or as one comma-separated string.
fn keywords_from_any<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        List(Vec<String>),
        Joined(String),
        Missing(Option<()>),
    }

    Ok(match Keywords::deserialize(deserializer)? {
        Keywords::List(list) => list,
        Keywords::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Keywords::Missing(_) => Vec::new(),
    })
}

/// An explicit `null` child list means a leaf.
fn children_or_empty<'de, D>(deserializer: D) -> Result<Vec<Heading>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Heading>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Document outline produced once per auto-mode run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub title: String,
    pub slug: String,
    pub seo_title: String,
    pub seo_description: String,
    pub headings: Vec<Heading>,
}

impl Outline {
    /// Number of headings that will receive generated body text.
    pub fn leaf_count(&self) -> usize {
        fn count(headings: &[Heading]) -> usize {
            headings
                .iter()
                .map(|h| if h.is_leaf() { 1 } else { count(&h.children) })
                .sum()
        }
        count(&self.headings)
    }
}

/// Inferred target audience and search intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceIntent {
    pub audience: String,
    pub intent: String,
}

/// SEO metadata derived from an assembled document body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoInfo {
    pub h1: String,
    pub seo_title: String,
    pub seo_description: String,
    pub slug: String,
}

/// One successfully generated illustration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// URL or provider handle of the image
    pub url: String,
    /// Prompt as planned from the outline or template
    pub prompt: String,
    /// Prompt actually sent to the provider after optimization
    pub revised_prompt: String,
    /// Heading the image illustrates; `None` for the main document image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
}

/// Final result of one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    pub content: String,
    pub seo_title: String,
    pub seo_description: String,
    pub slug: String,
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    pub generated_at: DateTime<Utc>,
    /// Sections that fell back to the degraded-content sentinel
    #[serde(default)]
    pub degraded_sections: usize,
}

impl Document {
    pub fn is_degraded(&self) -> bool {
        self.degraded_sections > 0
    }
}
