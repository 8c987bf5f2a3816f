//! Planner: runs one workflow against a caller-owned transcript.
//!
//! The transcript goes in by value and comes back out in either the
//! [`PlanOutcome`] or the [`PlanFailure`]; the planner keeps no state between
//! runs. What a failed run hands back is decided by [`TranscriptCommit`].

use chain_flow::{
    ExecutionStatus, FlowError, FlowRunner, InMemorySessionStorage, RunState, Session,
    SessionStorage,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::collaborators::Collaborators;
use crate::config::{Config, ConfigError};
use crate::models::{PlanOutcome, PlanRequest, WorkflowVariant};
use crate::tasks::session_keys;
use crate::transcript::{Transcript, TranscriptBudget};
use crate::workflow::build_workflow;

/// What a failed run does to the transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptCommit {
    /// Entries of a run are kept only if the whole run succeeds
    #[default]
    AtomicPerRun,
    /// Entries of stages that finished before the failure are kept
    AppendAsYouGo,
}

impl std::str::FromStr for TranscriptCommit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atomic" | "atomic_per_run" => Ok(TranscriptCommit::AtomicPerRun),
            "append" | "append_as_you_go" => Ok(TranscriptCommit::AppendAsYouGo),
            other => Err(format!("unknown transcript commit policy: {}", other)),
        }
    }
}

#[derive(Debug, Error)]
#[error("run {run_id} failed at {}: {source}", .failed_stage.as_deref().unwrap_or("setup"))]
pub struct PlanFailure {
    pub run_id: String,
    /// Stage that failed; `None` when the run broke down outside a stage
    pub failed_stage: Option<String>,
    pub source: FlowError,
    /// Transcript to keep, as selected by the commit policy
    pub transcript: Transcript,
}

pub struct Planner {
    base: FlowRunner,
    extended: FlowRunner,
    runs: Arc<InMemorySessionStorage>,
    commit: TranscriptCommit,
    budget: TranscriptBudget,
}

impl Planner {
    pub fn new(
        collaborators: &Collaborators,
        commit: TranscriptCommit,
        budget: TranscriptBudget,
    ) -> Self {
        let runs = Arc::new(InMemorySessionStorage::new());
        let storage: Arc<dyn SessionStorage> = runs.clone();

        Self {
            base: FlowRunner::new(
                Arc::new(build_workflow(WorkflowVariant::Base, collaborators)),
                storage.clone(),
            ),
            extended: FlowRunner::new(
                Arc::new(build_workflow(WorkflowVariant::Extended, collaborators)),
                storage,
            ),
            runs,
            commit,
            budget,
        }
    }

    pub fn from_config(config: &Config, collaborators: &Collaborators) -> Self {
        Self::new(collaborators, config.transcript_commit, config.transcript_budget)
    }

    /// Read configuration, then build collaborators and the planner.
    ///
    /// A configuration error is returned before any collaborator exists, so
    /// no stage can run without a credential.
    pub fn bootstrap<L, C>(lookup: L, collaborators: C) -> Result<(Config, Self), ConfigError>
    where
        L: Fn(&str) -> Option<String>,
        C: FnOnce(&Config) -> Collaborators,
    {
        let config = Config::from_lookup(lookup)?;
        let collaborators = collaborators(&config);
        let planner = Self::from_config(&config, &collaborators);
        Ok((config, planner))
    }

    pub fn commit_policy(&self) -> TranscriptCommit {
        self.commit
    }

    /// Runs currently executing
    pub fn active_runs(&self) -> usize {
        self.runs.len()
    }

    fn runner(&self, variant: WorkflowVariant) -> &FlowRunner {
        match variant {
            WorkflowVariant::Base => &self.base,
            WorkflowVariant::Extended => &self.extended,
        }
    }

    pub async fn plan(
        &self,
        request: PlanRequest,
        transcript: Transcript,
    ) -> Result<PlanOutcome, PlanFailure> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("plan_run", run_id = %run_id, variant = ?request.variant);
        self.plan_run(run_id, request, transcript)
            .instrument(span)
            .await
    }

    async fn plan_run(
        &self,
        run_id: String,
        request: PlanRequest,
        transcript: Transcript,
    ) -> Result<PlanOutcome, PlanFailure> {
        let runner = self.runner(request.variant);
        let setup_failure = |source: FlowError| PlanFailure {
            run_id: run_id.clone(),
            failed_stage: None,
            source,
            transcript: transcript.clone(),
        };

        let mut working = transcript.clone();
        working.set_budget(self.budget);

        let session = runner.chain().new_session(&run_id).map_err(setup_failure)?;
        seed_session(&session, &request, &working).await;
        runner.storage().save(session).await.map_err(setup_failure)?;

        info!(
            stages = runner.chain().len(),
            prior_entries = transcript.entry_count(),
            "starting workflow run"
        );

        let outcome = loop {
            match runner.run(&run_id).await {
                Ok(step) => {
                    info!(stage = %step.task_id, "stage complete");
                    if step.status == ExecutionStatus::Completed {
                        break Ok(());
                    }
                }
                Err(e) => break Err(e),
            }
        };

        let session = runner.storage().get(&run_id).await;
        if let Err(e) = runner.storage().delete(&run_id).await {
            warn!("failed to drop run session: {}", e);
        }
        let session = match session {
            Ok(Some(session)) => session,
            Ok(None) => return Err(setup_failure(FlowError::SessionNotFound(run_id.clone()))),
            Err(e) => return Err(setup_failure(e)),
        };

        match outcome {
            Ok(()) => collect_outcome(&run_id, request.variant, &session)
                .await
                .map_err(setup_failure),
            Err(source) => {
                let failed_stage = match &session.state {
                    RunState::Failed { task_id, .. } => Some(task_id.clone()),
                    _ => None,
                };
                error!(stage = ?failed_stage, "workflow run failed: {}", source);

                let transcript = match self.commit {
                    TranscriptCommit::AtomicPerRun => transcript.clone(),
                    TranscriptCommit::AppendAsYouGo => session
                        .context
                        .get(session_keys::TRANSCRIPT)
                        .await
                        .unwrap_or_else(|| transcript.clone()),
                };

                Err(PlanFailure {
                    run_id: run_id.clone(),
                    failed_stage,
                    source,
                    transcript,
                })
            }
        }
    }
}

async fn seed_session(session: &Session, request: &PlanRequest, transcript: &Transcript) {
    let context = &session.context;
    context.set(session_keys::PATIENT_INTAKE, &request.intake).await;
    context.set(session_keys::TRANSCRIPT, transcript).await;
    if let Some(document) = &request.lab_report {
        context.set(session_keys::LAB_DOCUMENT, document).await;
    }
}

async fn collect_outcome(
    run_id: &str,
    variant: WorkflowVariant,
    session: &Session,
) -> chain_flow::Result<PlanOutcome> {
    let context = &session.context;
    let required = |key: &'static str| async move {
        context
            .get::<String>(key)
            .await
            .ok_or_else(|| FlowError::ContextError(format!("{} missing after run", key)))
    };

    let outcome = PlanOutcome {
        run_id: run_id.to_string(),
        variant,
        diagnosis: required(session_keys::DIAGNOSIS).await?,
        treatments: required(session_keys::TREATMENTS).await?,
        compatibility: required(session_keys::COMPATIBILITY).await?,
        lab_content: context.get(session_keys::LAB_CONTENT).await,
        lab_summary: context.get(session_keys::LAB_SUMMARY).await,
        wiki_summary: context.get(session_keys::WIKI_SUMMARY).await,
        arxiv_summary: context.get(session_keys::ARXIV_SUMMARY).await,
        transcript: context
            .get(session_keys::TRANSCRIPT)
            .await
            .ok_or_else(|| FlowError::ContextError("transcript missing after run".to_string()))?,
    };

    info!(entries = outcome.transcript.entry_count(), "workflow run complete");
    Ok(outcome)
}
