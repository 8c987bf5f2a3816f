use thiserror::Error;

/// Errors raised while building or running a chain
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("chain {0} has no tasks")]
    EmptyChain(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
