//! Layered settings loading: defaults, file, environment.

use quill::config::{ConfigLoader, GenerationConfig};
use quill::logging::LogFormat;
use quill::PipelineError;
use std::io::Write;
use std::sync::Mutex;

/// Serializes tests that touch process environment variables
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn settings_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn test_file_values_override_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = settings_file(
        "[logging]\nformat = \"json\"\n\n[images]\nconcurrency = 4\noptimizer_cache_capacity = 8\n",
    );

    let settings = ConfigLoader::load(Some(file.path())).unwrap();
    assert_eq!(settings.logging.format, LogFormat::Json);
    assert_eq!(settings.images.concurrency, 4);
    assert_eq!(settings.images.optimizer_cache_capacity, 8);
    assert_eq!(settings.images.max_attempts, 3);
    assert_eq!(settings.retry.max_attempts, 3);
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = settings_file("[retry]\nmax_attempts = 5\n");

    std::env::set_var("QUILL_RETRY__MAX_ATTEMPTS", "7");
    let result = ConfigLoader::load(Some(file.path()));
    std::env::remove_var("QUILL_RETRY__MAX_ATTEMPTS");

    assert_eq!(result.unwrap().retry.max_attempts, 7);
}

#[test]
fn test_invalid_settings_rejected() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = settings_file("[images]\nconcurrency = 0\n");
    let err = ConfigLoader::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn test_generation_config_from_json() {
    let config: GenerationConfig = serde_json::from_str(
        r#"{ "source": { "topic": "sourdough" }, "generate_images": true, "images_per_section": 2 }"#,
    )
    .unwrap();
    assert_eq!(config.topic(), Some("sourdough"));
    assert_eq!(config.language, "English");
    assert!(config.include_conclusion);
    assert!(config.validate().is_ok());
    assert_eq!(config.completion_options().model.as_deref(), Some("gpt-4o"));
}
