//! Memory store failures never abort a run.

use super::support::ScriptedModel;
use quill::error::PipelineError;
use quill::memory::{ConversationMemory, InMemoryStore, MemoryStore, Turn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Store that can be switched offline
struct SwitchableStore {
    inner: InMemoryStore,
    offline: Arc<AtomicBool>,
}

impl MemoryStore for SwitchableStore {
    fn push(&self, turn: Turn) -> Result<(), PipelineError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PipelineError::memory("store offline"));
        }
        self.inner.push(turn)
    }

    fn turns(&self) -> Result<Vec<Turn>, PipelineError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PipelineError::memory("store offline"));
        }
        self.inner.turns()
    }

    fn clear(&self) -> Result<(), PipelineError> {
        self.inner.clear()
    }
}

fn switchable() -> (ConversationMemory, Arc<AtomicBool>) {
    let offline = Arc::new(AtomicBool::new(false));
    let store = SwitchableStore {
        inner: InMemoryStore::default(),
        offline: offline.clone(),
    };
    (ConversationMemory::with_store(Box::new(store)), offline)
}

#[test]
fn test_failed_appends_do_not_corrupt_earlier_turns() {
    let (memory, offline) = switchable();
    memory.append("outline", "{\"title\":\"Dogs\"}");
    memory.append("intro", "Dogs are great.");

    offline.store(true, Ordering::SeqCst);
    memory.append("section", "lost");
    assert!(memory.snapshot().is_empty());
    assert!(memory.messages().is_empty());

    offline.store(false, Ordering::SeqCst);
    let turns = memory.snapshot();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].result, "Dogs are great.");
}

#[test]
fn test_strict_append_surfaces_failure() {
    let (memory, offline) = switchable();
    offline.store(true, Ordering::SeqCst);
    let err = memory.append_strict("intro", "text").unwrap_err();
    assert!(matches!(err, PipelineError::MemoryManagement { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_chain_call_proceeds_with_empty_history_when_store_is_down() {
    use quill::chain::{ChainBuilder, Extractor};
    use quill::provider::CompletionOptions;
    use quill::template::Variables;

    let (memory, offline) = switchable();
    memory.append("init", "ok");
    offline.store(true, Ordering::SeqCst);

    let model = ScriptedModel::new().text("hello", "world");
    let chain = ChainBuilder::new(&model, &memory, CompletionOptions::default());
    let text = chain
        .text("hello", &Variables::new(), &Extractor::Passthrough)
        .await
        .unwrap();

    assert_eq!(text, "world");
    assert!(model.calls.lock()[0].history.is_empty());
}
