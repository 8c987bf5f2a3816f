use async_trait::async_trait;
use chain_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::utils::{complete, load_transcript, record_entries, require};
use super::{labels, session_keys, stage_ids};
use crate::collaborators::CompletionBackend;
use crate::prompts::{PromptTemplate, TreatmentPrompt};

pub struct TreatmentTask {
    model: Arc<dyn CompletionBackend>,
}

impl TreatmentTask {
    pub fn new(model: Arc<dyn CompletionBackend>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Task for TreatmentTask {
    fn id(&self) -> &str {
        stage_ids::TREATMENT
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("Recommending treatments");

        let diagnosis: String = require(&context, session_keys::DIAGNOSIS).await?;
        let history = load_transcript(&context).await?.as_text();

        let prompt = TreatmentPrompt {
            diagnosis: &diagnosis,
            history: &history,
        }
        .render();
        let treatments = complete(self.model.as_ref(), self.id(), &prompt).await?;

        context.set(session_keys::TREATMENTS, &treatments).await;
        record_entries(&context, &[(labels::SUGGESTED_TREATMENTS, treatments.as_str())]).await?;

        Ok(TaskResult::new_with_status(
            Some(treatments),
            NextAction::Continue,
            Some("Treatments recommended".to_string()),
        ))
    }
}
