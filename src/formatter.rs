//! Content Formatter
//!
//! Turns an outline's heading forest into markdown. Headings are visited
//! pre-order, depth-first, in sibling order. Top-level headings render at depth
//! 2 (depth 1 is the document title) and each nesting level adds one. Only
//! leaf headings receive body text, produced by a [`LeafGenerator`] that is
//! invoked strictly one leaf at a time so each call observes everything
//! generated before it.

use crate::types::Heading;
use async_trait::async_trait;

/// Markdown depth of top-level outline headings
pub const TOP_LEVEL_DEPTH: usize = 2;

/// Produces body text for one leaf heading
#[async_trait]
pub trait LeafGenerator: Send {
    async fn generate(&mut self, heading: &Heading, depth: usize) -> String;
}

/// Pre-order walk of a heading forest, yielding `(depth, heading)` pairs.
pub fn preorder(headings: &[Heading], start_depth: usize) -> Vec<(usize, &Heading)> {
    let mut visited = Vec::new();
    // Siblings are pushed in reverse so the first one is popped first.
    let mut stack: Vec<(usize, &Heading)> =
        headings.iter().rev().map(|h| (start_depth, h)).collect();

    while let Some((depth, heading)) = stack.pop() {
        visited.push((depth, heading));
        stack.extend(heading.children.iter().rev().map(|child| (depth + 1, child)));
    }
    visited
}

/// Markdown heading line for `title` at `depth`.
pub fn heading_marker(depth: usize, title: &str) -> String {
    format!("{} {}\n\n", "#".repeat(depth), title.trim())
}

/// Render `headings` onto `accumulated`, generating leaf bodies in order.
pub async fn format_sections<G>(
    headings: &[Heading],
    accumulated: String,
    generator: &mut G,
) -> String
where
    G: LeafGenerator + ?Sized,
{
    let mut output = accumulated;
    for (depth, heading) in preorder(headings, TOP_LEVEL_DEPTH) {
        output.push_str(&heading_marker(depth, &heading.title));
        if heading.is_leaf() {
            let body = generator.generate(heading, depth).await;
            output.push_str(body.trim());
            output.push_str("\n\n");
        }
    }
    output
}
