//! FlowRunner: loads a run session, executes exactly **one** chain step, and
//! persists the updated session back to storage.
//!
//! Callers drive a run by calling [`FlowRunner::run`] until it reports
//! [`ExecutionStatus::Completed`](crate::ExecutionStatus::Completed). Between
//! steps the stored session shows the current [`RunState`](crate::RunState),
//! which is what progress reporting reads.
//!
//! A failed step is persisted too: the session is saved in its `Failed` state
//! before the error is handed back.

use std::sync::Arc;

use crate::{
    chain::{Chain, ExecutionResult},
    error::{FlowError, Result},
    session::SessionStorage,
};

/// Load → execute one step → save
#[derive(Clone)]
pub struct FlowRunner {
    chain: Arc<Chain>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(chain: Arc<Chain>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { chain, storage }
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;

        let result = self.chain.execute_session(&mut session).await;

        self.storage.save(session).await?;

        result
    }
}
