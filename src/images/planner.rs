//! Decides which images a document gets.

use crate::formatter::{preorder, TOP_LEVEL_DEPTH};
use crate::types::{Heading, Outline};

/// Characters of body text passed to the optimizer as context
const CONTENT_CONTEXT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Lead image for the whole document
    Main,
    /// Illustration of one leaf section
    Section,
}

/// One planned image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub id: String,
    pub kind: ImageKind,
    /// Document or heading title the image illustrates
    pub title: String,
    pub prompt: String,
    /// Extra text handed to the prompt optimizer
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct ImagePlanner {
    images_per_section: u32,
}

impl ImagePlanner {
    /// `images_per_section == 0` plans the main image only.
    pub fn new(images_per_section: u32) -> Self {
        Self { images_per_section }
    }

    /// One main image, then `images_per_section` per leaf heading in pre-order.
    pub fn for_outline(&self, outline: &Outline) -> Vec<ImageRequest> {
        let mut requests = vec![ImageRequest {
            id: "main".to_string(),
            kind: ImageKind::Main,
            title: outline.title.clone(),
            prompt: describe(&outline.title, &[]),
            context: outline.seo_description.clone(),
        }];

        let leaves = preorder(&outline.headings, TOP_LEVEL_DEPTH)
            .into_iter()
            .filter(|(_, heading)| heading.is_leaf());

        for (section, (_, heading)) in leaves.enumerate() {
            for variant in 0..self.images_per_section {
                requests.push(self.section_request(outline, heading, section, variant));
            }
        }
        requests
    }

    /// Main image for a finished document.
    pub fn for_content(&self, title: &str, content: &str) -> Vec<ImageRequest> {
        vec![ImageRequest {
            id: "main".to_string(),
            kind: ImageKind::Main,
            title: title.to_string(),
            prompt: describe(title, &[]),
            context: content.chars().take(CONTENT_CONTEXT_CHARS).collect(),
        }]
    }

    /// Ad hoc request for a literal prompt, as used by template image blocks.
    pub fn single(id: impl Into<String>, prompt: &str, context: &str) -> ImageRequest {
        ImageRequest {
            id: id.into(),
            kind: ImageKind::Main,
            title: prompt.to_string(),
            prompt: prompt.to_string(),
            context: context.chars().take(CONTENT_CONTEXT_CHARS).collect(),
        }
    }

    fn section_request(
        &self,
        outline: &Outline,
        heading: &Heading,
        section: usize,
        variant: u32,
    ) -> ImageRequest {
        let mut prompt = describe(&heading.title, &heading.keywords);
        if variant > 0 {
            prompt.push_str(&format!(" Alternative composition #{}.", variant + 1));
        }
        ImageRequest {
            id: format!("section-{}-{}", section, variant),
            kind: ImageKind::Section,
            title: heading.title.clone(),
            prompt,
            context: format!("Part of an article titled \"{}\".", outline.title),
        }
    }
}

fn describe(title: &str, keywords: &[String]) -> String {
    if keywords.is_empty() {
        format!("An illustration for \"{}\".", title.trim())
    } else {
        format!(
            "An illustration for \"{}\" featuring {}.",
            title.trim(),
            keywords.join(", ")
        )
    }
}
