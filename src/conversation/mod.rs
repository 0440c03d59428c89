//! Conversation layer: turn vocabulary, the LLM interpreter, per-session
//! state and the manager that ties them to the outbox.

pub mod display;
pub mod interpreter;
pub mod manager;
pub mod prompt;
pub mod registry;
pub mod state;
pub mod types;

pub use interpreter::Interpreter;
pub use manager::{ConversationManager, ExecutionResult, TurnOutcome};
pub use registry::{SessionRegistry, SharedManager};
pub use state::{ConversationState, Exchange};
pub use types::{ActionKind, Entities, EntityValue, Intent, LlmTurn};
