// Library root: the binary entry point is src/main.rs; integration tests
// link against this crate.

pub mod comms;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod logger;
pub mod outbox;
pub mod runtime;
