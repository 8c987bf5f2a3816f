pub mod chain;
pub mod context;
pub mod error;
pub mod runner;
pub mod session;
pub mod task;

// Re-export commonly used types
pub use chain::{Chain, ChainBuilder, ExecutionResult, ExecutionStatus};
pub use context::Context;
pub use error::{FlowError, Result};
pub use runner::FlowRunner;
pub use session::{InMemorySessionStorage, RunState, Session, SessionStorage};
pub use task::{NextAction, Task, TaskResult};
