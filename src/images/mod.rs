//! Image Orchestration Layer
//!
//! Plans which images a document needs, optimizes each prompt, and requests
//! images from a provider with bounded concurrency and per-request retry.
//! Failures are logged and dropped: the layer never fails the run that
//! called it.

mod optimizer;
mod orchestrator;
mod planner;

pub use optimizer::{BoundedCache, CachingOptimizer};
pub use orchestrator::{ImageBatchResult, ImageFailure, ImageOrchestrator};
pub use planner::{ImageKind, ImagePlanner, ImageRequest};
