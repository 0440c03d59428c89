//! Application-wide error types.

use thiserror::Error;

use crate::llm::ProviderError;
use crate::outbox::OutboxError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("llm error: {0}")]
    Llm(#[from] ProviderError),

    #[error("outbox error: {0}")]
    Outbox(#[from] OutboxError),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
