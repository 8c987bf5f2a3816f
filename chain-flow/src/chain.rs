use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    context::Context,
    error::{FlowError, Result},
    session::{RunState, Session},
    task::{NextAction, Task},
};

/// A fixed, ordered sequence of tasks.
///
/// Tasks run in the order they were added. There are no edges and no
/// conditions: a task either hands over to its successor or ends the run.
pub struct Chain {
    pub id: String,
    tasks: Vec<Arc<dyn Task>>,
}

impl Chain {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: Vec::new(),
        }
    }

    /// Append a task. A task whose id is already present is ignored.
    fn push_task(&mut self, task: Arc<dyn Task>) {
        if self.position(task.id()).is_some() {
            warn!(chain = %self.id, task = %task.id(), "duplicate task id ignored");
            return;
        }
        self.tasks.push(task);
    }

    fn position(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids of all tasks in execution order
    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.id()).collect()
    }

    pub fn start_task_id(&self) -> Option<&str> {
        self.tasks.first().map(|task| task.id())
    }

    /// The task that runs after `current_task_id`, if any
    pub fn next_task_id(&self, current_task_id: &str) -> Option<&str> {
        let index = self.position(current_task_id)?;
        self.tasks.get(index + 1).map(|task| task.id())
    }

    pub fn get_task(&self, task_id: &str) -> Option<Arc<dyn Task>> {
        self.position(task_id).map(|index| self.tasks[index].clone())
    }

    /// Create a `Pending` session positioned on the first task
    pub fn new_session(&self, session_id: impl Into<String>) -> Result<Session> {
        let start = self
            .start_task_id()
            .ok_or_else(|| FlowError::EmptyChain(self.id.clone()))?;
        Ok(Session::new_from_task(session_id.into(), &self.id, start))
    }

    /// Execute exactly one task of the session and advance its state.
    ///
    /// On failure the session is marked `Failed` before the error is returned,
    /// so callers that persist the session keep a record of where the run stopped.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        match &session.state {
            RunState::Complete => {
                return Ok(ExecutionResult {
                    response: None,
                    status: ExecutionStatus::Completed,
                    task_id: session.current_task_id.clone(),
                });
            }
            RunState::Failed { task_id, reason } => {
                return Err(FlowError::TaskExecutionFailed(format!(
                    "run {} already failed at {}: {}",
                    session.id, task_id, reason
                )));
            }
            _ => {}
        }

        let index = self
            .position(&session.current_task_id)
            .ok_or_else(|| FlowError::TaskNotFound(session.current_task_id.clone()))?;
        let task = self.tasks[index].clone();
        let task_id = task.id().to_string();

        debug!(chain = %self.id, session = %session.id, task = %task_id, "running task");

        let mut result = match task.run(session.context.clone()).await {
            Ok(result) => result,
            Err(e) => {
                error!(chain = %self.id, session = %session.id, task = %task_id, "task failed: {}", e);
                session.status_message = Some(format!("{} failed", task_id));
                session.state = RunState::Failed {
                    task_id,
                    reason: e.to_string(),
                };
                return Err(e);
            }
        };
        result.task_id = task_id.clone();
        session.status_message = result.status_message.clone();

        let next = match result.next_action {
            NextAction::Continue => self.tasks.get(index + 1),
            NextAction::End => None,
        };

        let status = match next {
            Some(next_task) => {
                session.current_task_id = next_task.id().to_string();
                session.state = RunState::StageDone {
                    stage: index + 1,
                    task_id: task_id.clone(),
                };
                ExecutionStatus::InProgress
            }
            None => {
                info!(chain = %self.id, session = %session.id, "run complete");
                session.state = RunState::Complete;
                ExecutionStatus::Completed
            }
        };

        Ok(ExecutionResult {
            response: result.response,
            status,
            task_id,
        })
    }

    /// Run every task from the first to the last against `context`.
    /// Returns the result of the final task.
    pub async fn execute(&self, context: Context) -> Result<ExecutionResult> {
        let mut session = self.new_session(format!("{}-inline", self.id))?;
        session.context = context;
        loop {
            let result = self.execute_session(&mut session).await?;
            if matches!(result.status, ExecutionStatus::Completed) {
                return Ok(result);
            }
        }
    }
}

/// Builder for creating chains
pub struct ChainBuilder {
    chain: Chain,
}

impl ChainBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            chain: Chain::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.chain.push_task(task);
        self
    }

    pub fn build(self) -> Chain {
        self.chain
    }
}

/// Outcome of a single step
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
    /// Task that ran in this step
    pub task_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// A task finished and another one is queued
    InProgress,
    /// The last task finished
    Completed,
}
