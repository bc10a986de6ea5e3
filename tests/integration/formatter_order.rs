//! Content formatter ordering against a memory-backed leaf generator.

use async_trait::async_trait;
use quill::formatter::{format_sections, LeafGenerator};
use quill::memory::ConversationMemory;
use quill::types::Heading;

/// Records each leaf and reports how many turns it could see.
struct MemoryAwareWriter<'a> {
    memory: &'a ConversationMemory,
}

#[async_trait]
impl LeafGenerator for MemoryAwareWriter<'_> {
    async fn generate(&mut self, heading: &Heading, _depth: usize) -> String {
        let seen = self.memory.len();
        let text = format!("<text for {}> (after {} turns)", heading.title, seen);
        self.memory.append(&heading.title, &text);
        text
    }
}

struct Fixed;

#[async_trait]
impl LeafGenerator for Fixed {
    async fn generate(&mut self, heading: &Heading, _depth: usize) -> String {
        format!("<text for {}>", heading.title)
    }
}

#[tokio::test]
async fn test_nested_outline_renders_pre_order() {
    let headings = vec![
        Heading::new("A").with_children(vec![Heading::new("A1"), Heading::new("A2")]),
        Heading::new("B"),
    ];

    let markdown = format_sections(&headings, String::new(), &mut Fixed).await;
    assert_eq!(
        markdown,
        "## A\n\n### A1\n\n<text for A1>\n\n### A2\n\n<text for A2>\n\n## B\n\n<text for B>\n\n"
    );
}

#[tokio::test]
async fn test_each_leaf_sees_every_earlier_leaf() {
    let memory = ConversationMemory::new();
    let headings = vec![
        Heading::new("Setup").with_children(vec![
            Heading::new("Tools"),
            Heading::new("Space").with_children(vec![Heading::new("Light")]),
        ]),
        Heading::new("Practice"),
    ];

    let mut writer = MemoryAwareWriter { memory: &memory };
    let markdown = format_sections(&headings, "Intro\n\n".to_string(), &mut writer).await;

    assert!(markdown.starts_with("Intro\n\n## Setup\n\n### Tools\n\n"));
    assert!(markdown.contains("#### Light\n\n<text for Light> (after 1 turns)"));
    assert!(markdown.contains("## Practice\n\n<text for Practice> (after 2 turns)"));
    assert!(!markdown.contains("<text for Setup>"));
    assert!(!markdown.contains("<text for Space>"));

    let order: Vec<String> = memory.snapshot().into_iter().map(|t| t.instruction).collect();
    assert_eq!(order, vec!["Tools", "Light", "Practice"]);
}
