//! Runs planned image requests against a provider.

use super::optimizer::CachingOptimizer;
use super::planner::{ImagePlanner, ImageRequest};
use crate::concurrency::{retry_with_backoff, run_batch, BatchOptions, RetryError, RetryPolicy};
use crate::config::ImageSettings;
use crate::error::ImageError;
use crate::provider::{ImageProvider, PromptOptimizer};
use crate::types::{GeneratedImage, Outline};
use std::sync::Arc;
use tracing::{info, warn};

/// A request that produced no image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub request_id: String,
    pub title: String,
    pub error: String,
}

/// Images produced by one batch plus the requests that were dropped
#[derive(Debug, Clone, Default)]
pub struct ImageBatchResult {
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<ImageFailure>,
}

/// Image orchestration for one generation run.
///
/// The optimizer cache lives as long as this value, so it is never shared
/// across runs.
pub struct ImageOrchestrator {
    provider: Arc<dyn ImageProvider>,
    optimizer: CachingOptimizer,
    settings: ImageSettings,
    retry: RetryPolicy,
}

impl ImageOrchestrator {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        optimizer: Arc<dyn PromptOptimizer>,
        settings: ImageSettings,
        retry: RetryPolicy,
    ) -> Result<Self, ImageError> {
        if settings.concurrency == 0 {
            return Err(ImageError::InvalidConfiguration(
                "image concurrency must be at least 1".to_string(),
            ));
        }
        if settings.max_attempts == 0 {
            return Err(ImageError::InvalidConfiguration(
                "image max_attempts must be at least 1".to_string(),
            ));
        }

        let retry = RetryPolicy {
            max_attempts: settings.max_attempts,
            ..retry
        };
        Ok(Self {
            provider,
            optimizer: CachingOptimizer::new(optimizer, settings.optimizer_cache_capacity),
            settings,
            retry,
        })
    }

    /// Main image plus `images_per_section` images per leaf heading.
    pub async fn generate_for_outline(
        &self,
        outline: &Outline,
        images_per_section: u32,
    ) -> ImageBatchResult {
        let requests = ImagePlanner::new(images_per_section).for_outline(outline);
        self.run_requests(requests).await
    }

    /// Main image for a finished document.
    pub async fn generate_for_content(&self, title: &str, content: &str) -> ImageBatchResult {
        let requests = ImagePlanner::new(0).for_content(title, content);
        self.run_requests(requests).await
    }

    /// One ad hoc image; `None` if it could not be produced.
    pub async fn generate_single(
        &self,
        id: &str,
        prompt: &str,
        context: &str,
    ) -> Option<GeneratedImage> {
        let request = ImagePlanner::single(id, prompt, context);
        match self.fulfil(&request).await {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(request_id = id, error = %err, "Image request failed; dropping it");
                None
            }
        }
    }

    /// Run requests with bounded concurrency. Failed requests are logged and
    /// reported in `failures`; they never abort the batch.
    pub async fn run_requests(&self, requests: Vec<ImageRequest>) -> ImageBatchResult {
        let requested = requests.len();
        let options = BatchOptions::with_concurrency(self.settings.concurrency);

        let report = run_batch(requests, &options, |request: ImageRequest| async move {
            self.fulfil(&request).await.map_err(|err| {
                warn!(
                    request_id = %request.id,
                    title = %request.title,
                    error = %err,
                    "Image request failed; dropping it"
                );
                ImageFailure {
                    request_id: request.id.clone(),
                    title: request.title.clone(),
                    error: err.to_string(),
                }
            })
        })
        .await;

        let mut result = ImageBatchResult::default();
        for outcome in report.outcomes {
            match outcome {
                crate::concurrency::BatchOutcome::Success(image) => result.images.push(image),
                crate::concurrency::BatchOutcome::Failure(failure) => result.failures.push(failure),
                crate::concurrency::BatchOutcome::Skipped => {}
            }
        }

        info!(
            requested,
            generated = result.images.len(),
            failed = result.failures.len(),
            provider = self.provider.provider_name(),
            "Image batch finished"
        );
        result
    }

    async fn fulfil(&self, request: &ImageRequest) -> Result<GeneratedImage, ImageError> {
        let optimizer = &self.optimizer;
        let optimized = match retry_with_backoff(&self.retry, |_| {
            optimizer.optimize(&request.prompt, &request.context)
        })
        .await
        {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(
                    request_id = %request.id,
                    error = %err,
                    "Prompt optimization failed; using the planned prompt"
                );
                request.prompt.clone()
            }
        };

        let provider = self.provider.as_ref();
        let prompt = optimized.as_str();
        let url = retry_with_backoff(&self.retry, move |_| provider.generate(prompt))
            .await
            .map_err(|err| match err {
                RetryError::Exhausted { attempts, last } => ImageError::Provider {
                    message: format!("gave up after {} attempts", attempts),
                    source: Some(Box::new(last)),
                },
                RetryError::NonRetryable(err) => err,
            })?;

        Ok(GeneratedImage {
            url,
            prompt: request.prompt.clone(),
            revised_prompt: optimized.clone(),
            heading: match request.kind {
                super::ImageKind::Main => None,
                super::ImageKind::Section => Some(request.title.clone()),
            },
        })
    }
}
