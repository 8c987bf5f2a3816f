use async_trait::async_trait;
use chain_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::utils::{complete, load_transcript, record_entries, require};
use super::{labels, session_keys, stage_ids};
use crate::collaborators::CompletionBackend;
use crate::models::PatientIntake;
use crate::prompts::{CompatibilityPrompt, PromptTemplate};

/// Last stage of every workflow: checks the treatments against history and medications
pub struct CompatibilityTask {
    model: Arc<dyn CompletionBackend>,
}

impl CompatibilityTask {
    pub fn new(model: Arc<dyn CompletionBackend>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Task for CompatibilityTask {
    fn id(&self) -> &str {
        stage_ids::COMPATIBILITY
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("Checking treatment compatibility");

        let intake: PatientIntake = require(&context, session_keys::PATIENT_INTAKE).await?;
        let treatments: String = require(&context, session_keys::TREATMENTS).await?;
        let history = load_transcript(&context).await?.as_text();

        let prompt = CompatibilityPrompt {
            treatments: &treatments,
            medical_history: &intake.medical_history,
            current_medications: &intake.current_medications,
            history: &history,
        }
        .render();
        let compatibility = complete(self.model.as_ref(), self.id(), &prompt).await?;

        context.set(session_keys::COMPATIBILITY, &compatibility).await;
        record_entries(&context, &[(labels::COMPATIBILITY_CHECK, compatibility.as_str())]).await?;

        Ok(TaskResult::new_with_status(
            Some(compatibility),
            NextAction::End,
            Some("Treatment plan complete".to_string()),
        ))
    }
}
