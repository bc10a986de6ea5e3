//! Conversation Memory
//!
//! Ordered, append-only transcript of (instruction, result) turns recorded by
//! the orchestrators. Every model call receives the transcript as leading
//! history, which is what keeps later stages coherent with earlier ones.
//!
//! Memory improves coherence but is not required for a run to succeed:
//! [`ConversationMemory::append`] and [`ConversationMemory::snapshot`] log
//! store failures and carry on. Callers that want failures surfaced use
//! [`ConversationMemory::append_strict`].

use crate::error::PipelineError;
use crate::provider::ChatMessage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One recorded (instruction, result) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub instruction: String,
    pub result: String,
}

/// Backing storage for a transcript
pub trait MemoryStore: Send + Sync {
    fn push(&self, turn: Turn) -> Result<(), PipelineError>;
    fn turns(&self) -> Result<Vec<Turn>, PipelineError>;
    fn clear(&self) -> Result<(), PipelineError>;
}

/// Default process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    turns: RwLock<Vec<Turn>>,
}

impl MemoryStore for InMemoryStore {
    fn push(&self, turn: Turn) -> Result<(), PipelineError> {
        self.turns.write().push(turn);
        Ok(())
    }

    fn turns(&self) -> Result<Vec<Turn>, PipelineError> {
        Ok(self.turns.read().clone())
    }

    fn clear(&self) -> Result<(), PipelineError> {
        self.turns.write().clear();
        Ok(())
    }
}

/// Transcript owned by a single generation run
pub struct ConversationMemory {
    store: Box<dyn MemoryStore>,
    debug: bool,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::with_store(Box::new(InMemoryStore::default()))
    }

    pub fn with_store(store: Box<dyn MemoryStore>) -> Self {
        Self {
            store,
            debug: false,
        }
    }

    /// Log every recorded turn at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Record a turn. Store failures are logged and swallowed.
    pub fn append(&self, instruction: &str, result: &str) {
        if let Err(err) = self.append_strict(instruction, result) {
            warn!(error = %err, "Failed to record memory turn; continuing without it");
        }
    }

    /// Record a turn whose result is a structured value, serialized as JSON.
    pub fn append_value<T: Serialize>(&self, instruction: &str, result: &T) {
        match serde_json::to_string_pretty(result) {
            Ok(text) => self.append(instruction, &text),
            Err(err) => {
                warn!(error = %err, "Failed to serialize memory turn; continuing without it")
            }
        }
    }

    /// Record a turn, surfacing store failures as `MemoryManagement` errors.
    pub fn append_strict(&self, instruction: &str, result: &str) -> Result<(), PipelineError> {
        if self.debug {
            debug!(instruction, result, "Recording memory turn");
        }
        self.store
            .push(Turn {
                instruction: instruction.to_string(),
                result: result.to_string(),
            })
            .map_err(|err| match err {
                PipelineError::MemoryManagement { .. } => err,
                other => PipelineError::MemoryManagement {
                    message: "memory store rejected turn".to_string(),
                    source: Some(Box::new(other)),
                },
            })
    }

    /// All turns in append order; empty if the store cannot be read.
    pub fn snapshot(&self) -> Vec<Turn> {
        match self.store.turns() {
            Ok(turns) => turns,
            Err(err) => {
                warn!(error = %err, "Failed to read memory; using empty history");
                Vec::new()
            }
        }
    }

    /// Snapshot rendered as alternating user/assistant messages.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.snapshot()
            .into_iter()
            .flat_map(|turn| {
                [
                    ChatMessage::user(turn.instruction),
                    ChatMessage::assistant(turn.result),
                ]
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear memory");
        }
    }
}
