//! Template round-trip and substitution properties.

use proptest::prelude::*;
use quill::template::{SystemBlock, TemplateDocument};
use quill::PipelineError;

/// Literal text between blocks; never contains braces.
fn literal() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,\n#-]{0,24}"
}

/// Block body: words and `{identifier}` placeholders.
fn body() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof!["[a-z ]{1,12}", "[a-z]{1,6}".prop_map(|name| format!("{{{}}}", name))],
        1..4,
    )
    .prop_map(|parts| parts.concat())
}

fn generated_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .\n{}]{0,30}"
}

/// (literals, system body, content/image blocks as (is_image, body))
fn template_parts(
) -> impl Strategy<Value = (Vec<String>, String, Vec<(bool, String)>)> {
    (prop::collection::vec((any::<bool>(), body()), 1..6), body()).prop_flat_map(
        |(blocks, system)| {
            let count = blocks.len() + 2;
            (
                prop::collection::vec(literal(), count..=count),
                Just(system),
                Just(blocks),
            )
        },
    )
}

fn render(literals: &[String], system: &str, blocks: &[(bool, String)]) -> String {
    let mut source = literals[0].clone();
    source.push_str(&format!("{{{{s: {}}}}}", system));
    source.push_str(&literals[1]);
    for (index, (is_image, text)) in blocks.iter().enumerate() {
        let tag = if *is_image { 'i' } else { 'c' };
        source.push_str(&format!("{{{{{}: {}}}}}", tag, text));
        source.push_str(&literals[index + 2]);
    }
    source
}

proptest! {
    #[test]
    fn substitution_replaces_each_block_span(
        (literals, system, blocks) in template_parts(),
        seed in prop::collection::vec(generated_text(), 6),
    ) {
        // At least one content block keeps the template well formed.
        let mut blocks = blocks;
        blocks[0].0 = false;

        let source = render(&literals, &system, &blocks);
        let template = TemplateDocument::parse(source.clone()).unwrap();
        prop_assert_eq!(template.generation_blocks().count(), blocks.len());

        let generated: Vec<String> = seed.into_iter().take(blocks.len()).collect();
        let output = template.substitute(&generated, SystemBlock::Keep).unwrap();

        let mut expected = literals[0].clone();
        expected.push_str(&format!("{{{{s: {}}}}}", system));
        expected.push_str(&literals[1]);
        for (index, text) in generated.iter().enumerate() {
            expected.push_str(text);
            expected.push_str(&literals[index + 2]);
        }
        prop_assert_eq!(output, expected);
    }

    #[test]
    fn substitution_is_idempotent(
        (literals, system, blocks) in template_parts(),
        text in generated_text(),
    ) {
        let mut blocks = blocks;
        blocks[0].0 = false;
        let template = TemplateDocument::parse(render(&literals, &system, &blocks)).unwrap();
        let generated = vec![text; blocks.len()];

        let first = template.substitute(&generated, SystemBlock::Drop).unwrap();
        let second = template.substitute(&generated, SystemBlock::Drop).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn templates_without_system_or_content_are_malformed(
        literals in prop::collection::vec(literal(), 1..5),
        images in prop::collection::vec(body(), 0..4),
    ) {
        let mut source = String::new();
        for (index, literal) in literals.iter().enumerate() {
            source.push_str(literal);
            if let Some(image) = images.get(index) {
                source.push_str(&format!("{{{{i: {}}}}}", image));
            }
        }
        let result = TemplateDocument::parse(source);
        prop_assert!(matches!(result, Err(PipelineError::MalformedTemplate(_))));
    }
}
