//! Image orchestration: bounded concurrency, dropped failures, prompt caching.

use super::support::{fast_retry, BrokenOptimizer, CountingOptimizer, FakeImageProvider};
use quill::config::ImageSettings;
use quill::images::{ImageKind, ImageOrchestrator, ImagePlanner};
use quill::types::{Heading, Outline};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn settings(concurrency: usize) -> ImageSettings {
    ImageSettings {
        concurrency,
        optimizer_cache_capacity: 16,
        max_attempts: 3,
    }
}

#[tokio::test]
async fn test_five_requests_one_always_failing() {
    let provider = Arc::new(FakeImageProvider::new().failing_on("forbidden"));
    let orchestrator = ImageOrchestrator::new(
        provider.clone(),
        Arc::new(CountingOptimizer::default()),
        settings(2),
        fast_retry(3),
    )
    .unwrap();

    let requests = ["harbor", "lighthouse", "forbidden cove", "fishing boat", "gulls"]
        .iter()
        .enumerate()
        .map(|(i, prompt)| ImagePlanner::single(format!("req-{}", i), prompt, ""))
        .collect();

    let result = orchestrator.run_requests(requests).await;

    assert_eq!(result.images.len(), 4);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].request_id, "req-2");
    assert!(result.failures[0].error.contains("3 attempts"));
    assert!(provider.peak() <= 2, "peak in flight was {}", provider.peak());
    // Four successes plus three attempts for the failing request.
    assert_eq!(provider.calls(), 7);
}

#[tokio::test]
async fn test_outline_images_cover_main_and_leaves() {
    let outline = Outline {
        title: "Coastal Walks".to_string(),
        slug: "coastal-walks".to_string(),
        seo_title: "Coastal Walks".to_string(),
        seo_description: "Walks by the sea".to_string(),
        headings: vec![
            Heading::new("North").with_children(vec![
                Heading::new("Cliffs").with_keywords(["chalk"]),
                Heading::new("Dunes"),
            ]),
            Heading::new("South"),
        ],
    };

    let orchestrator = ImageOrchestrator::new(
        Arc::new(FakeImageProvider::new()),
        Arc::new(CountingOptimizer::default()),
        settings(3),
        fast_retry(2),
    )
    .unwrap();

    let result = orchestrator.generate_for_outline(&outline, 1).await;
    let headings: Vec<Option<&str>> = result
        .images
        .iter()
        .map(|image| image.heading.as_deref())
        .collect();

    assert_eq!(headings, vec![None, Some("Cliffs"), Some("Dunes"), Some("South")]);
    assert!(result.images[1].revised_prompt.ends_with("(cinematic lighting)"));
    assert!(result.images[1].prompt.contains("chalk"));
}

#[tokio::test]
async fn test_repeated_prompts_hit_the_cache() {
    let optimizer = Arc::new(CountingOptimizer::default());
    let orchestrator = ImageOrchestrator::new(
        Arc::new(FakeImageProvider::new()),
        optimizer.clone(),
        settings(1),
        fast_retry(1),
    )
    .unwrap();

    for _ in 0..3 {
        orchestrator
            .generate_single("hero", "a red kite over a field", "spring")
            .await
            .unwrap();
    }
    assert_eq!(optimizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_optimizer_failure_falls_back_to_planned_prompt() {
    let orchestrator = ImageOrchestrator::new(
        Arc::new(FakeImageProvider::new()),
        Arc::new(BrokenOptimizer),
        settings(1),
        fast_retry(2),
    )
    .unwrap();

    let image = orchestrator
        .generate_single("hero", "a red kite", "")
        .await
        .unwrap();
    assert_eq!(image.revised_prompt, "a red kite");
}

#[tokio::test]
async fn test_content_pair_yields_main_image_only() {
    let orchestrator = ImageOrchestrator::new(
        Arc::new(FakeImageProvider::new()),
        Arc::new(CountingOptimizer::default()),
        settings(2),
        fast_retry(1),
    )
    .unwrap();

    let result = orchestrator
        .generate_for_content("Bread Baking", "Flour, water, salt and time.")
        .await;
    assert_eq!(result.images.len(), 1);
    assert_eq!(result.images[0].heading, None);

    let plan = ImagePlanner::new(2).for_content("Bread Baking", "x");
    assert_eq!(plan[0].kind, ImageKind::Main);
}
