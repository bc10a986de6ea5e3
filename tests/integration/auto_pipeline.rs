//! End-to-end topic-driven generation with fake capabilities.

use super::support::{fast_settings, CountingOptimizer, FakeImageProvider, ScriptedModel};
use quill::provider::MessageRole;
use quill::{AutoGenerator, GenerationConfig, PipelineError, DEGRADED_SECTION_SENTINEL};
use serde_json::json;
use std::sync::Arc;

fn outline() -> serde_json::Value {
    json!({
        "title": "Baking Sourdough at Home",
        "slug": "",
        "seoTitle": "Sourdough at home",
        "seoDescription": "A practical guide to baking sourdough",
        "headings": [
            { "title": "Starter", "keywords": "flour, water" },
            { "title": "Baking", "subheadings": [
                { "title": "Shaping" },
                { "title": "Scoring", "keywords": ["lame"] }
            ]}
        ]
    })
}

fn model() -> ScriptedModel {
    ScriptedModel::new()
        .structured("Create the outline", outline())
        .structured(
            "target audience",
            json!({ "audience": "home bakers", "intent": "informational" }),
        )
        .text("introduction", "```markdown\nWelcome, bakers.\n```")
        .text("\"Starter\"", "```markdown\nFeed it daily.\n```")
        .text("\"Shaping\"", "```markdown\nBuild tension.\n```")
        .text("\"Scoring\"", "Sure! ```markdown\nOne confident cut.\n```")
        .text("conclusion", "```markdown\nHappy baking.\n```")
}

#[tokio::test]
async fn test_topic_run_produces_complete_document() {
    let model = Arc::new(model());
    let provider = Arc::new(FakeImageProvider::new().failing_on("Shaping"));

    let mut config = GenerationConfig::for_topic("sourdough");
    config.infer_audience_intent = true;
    config.generate_images = true;

    let doc = AutoGenerator::new(model.clone())
        .with_settings(fast_settings())
        .with_images(provider, Arc::new(CountingOptimizer::default()))
        .generate(&config)
        .await
        .unwrap();

    assert_eq!(doc.title, "Baking Sourdough at Home");
    assert_eq!(doc.slug, "baking-sourdough-at-home");
    assert_eq!(doc.seo_title, "Sourdough at home");
    assert_eq!(
        doc.content,
        "Welcome, bakers.\n\n\
         ## Starter\n\nFeed it daily.\n\n\
         ## Baking\n\n### Shaping\n\nBuild tension.\n\n### Scoring\n\nOne confident cut.\n\n\
         Happy baking."
    );
    assert!(!doc.is_degraded());

    // Main image plus three leaves, minus the one the provider always rejects.
    let headings: Vec<Option<&str>> = doc.images.iter().map(|i| i.heading.as_deref()).collect();
    assert_eq!(headings, vec![None, Some("Starter"), Some("Scoring")]);

    let prompts = model.prompts();
    assert!(prompts[1].contains("for home bakers with informational intent"));
    assert!(prompts
        .iter()
        .any(|p| p.contains("\"Starter\"") && p.contains("flour, water")));
}

#[tokio::test]
async fn test_every_call_carries_the_transcript_so_far() {
    let model = Arc::new(model());
    AutoGenerator::new(model.clone())
        .with_settings(fast_settings())
        .generate(&GenerationConfig::for_topic("sourdough"))
        .await
        .unwrap();

    let calls = model.calls.lock();
    for pair in calls.windows(2) {
        assert_eq!(pair[1].history.len(), pair[0].history.len() + 2);
    }

    let last = calls.last().unwrap();
    assert!(last.prompt.contains("conclusion"));
    assert_eq!(last.history[0].role, MessageRole::User);
    assert!(last.history[0].content.contains("\"sourdough\""));
    assert!(last.history[3].content.contains("Baking Sourdough at Home"));
    let scoring = last
        .history
        .iter()
        .position(|m| m.content == "One confident cut.")
        .unwrap();
    assert_eq!(last.history[scoring].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_failed_text_stages_degrade_instead_of_aborting() {
    let model = Arc::new(
        ScriptedModel::new()
            .structured("Create the outline", outline())
            .text("\"Starter\"", "```markdown\nFeed it daily.\n```"),
    );

    let doc = AutoGenerator::new(model)
        .with_settings(fast_settings())
        .generate(&GenerationConfig::for_topic("sourdough"))
        .await
        .unwrap();

    // Introduction, two leaves and the conclusion had no usable reply.
    assert_eq!(doc.degraded_sections, 4);
    assert!(doc.content.starts_with(DEGRADED_SECTION_SENTINEL));
    assert!(doc.content.contains("Feed it daily."));
}

#[tokio::test]
async fn test_missing_outline_aborts_run() {
    let model = Arc::new(ScriptedModel::new().text("introduction", "unused"));

    let err = AutoGenerator::new(model.clone())
        .with_settings(fast_settings())
        .generate(&GenerationConfig::for_topic("sourdough"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::OutlineGeneration { .. }));
    assert!(err.is_retryable());
    assert_eq!(model.calls.lock().len(), 1, "no stage runs after the outline fails");
}

#[tokio::test]
async fn test_invalid_config_rejected_before_any_call() {
    let model = Arc::new(model());
    let mut config = GenerationConfig::for_topic("sourdough");
    config.temperature = 3.0;

    let err = AutoGenerator::new(model.clone())
        .generate(&config)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(model.calls.lock().is_empty());
}
