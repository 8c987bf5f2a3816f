use async_trait::async_trait;
use chain_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::{error, info};

use super::utils::{record_entries, require};
use super::{labels, session_keys, stage_ids};
use crate::collaborators::KnowledgeSource;
use crate::models::PatientIntake;

/// Queries the encyclopedic and preprint sources with the raw symptoms.
///
/// The two lookups are independent and run concurrently. Results are stored
/// untouched; either lookup failing fails the stage.
pub struct KnowledgeLookupTask {
    encyclopedia: Arc<dyn KnowledgeSource>,
    preprints: Arc<dyn KnowledgeSource>,
}

impl KnowledgeLookupTask {
    pub fn new(encyclopedia: Arc<dyn KnowledgeSource>, preprints: Arc<dyn KnowledgeSource>) -> Self {
        Self {
            encyclopedia,
            preprints,
        }
    }
}

#[async_trait]
impl Task for KnowledgeLookupTask {
    fn id(&self) -> &str {
        stage_ids::KNOWLEDGE_LOOKUP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let intake: PatientIntake = require(&context, session_keys::PATIENT_INTAKE).await?;

        info!(
            "Fetching information from {} and {}",
            self.encyclopedia.name(),
            self.preprints.name()
        );

        let (wiki_summary, arxiv_summary) = tokio::join!(
            self.encyclopedia.lookup(&intake.symptoms),
            self.preprints.lookup(&intake.symptoms)
        );

        let wiki_summary = wiki_summary.map_err(|e| lookup_failed(self.encyclopedia.name(), e))?;
        let arxiv_summary = arxiv_summary.map_err(|e| lookup_failed(self.preprints.name(), e))?;

        context.set(session_keys::WIKI_SUMMARY, &wiki_summary).await;
        context.set(session_keys::ARXIV_SUMMARY, &arxiv_summary).await;
        record_entries(
            &context,
            &[
                (labels::WIKIPEDIA_SUMMARY, wiki_summary.as_str()),
                (labels::ARXIV_SUMMARY, arxiv_summary.as_str()),
            ],
        )
        .await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::Continue,
            Some("Reference summaries fetched".to_string()),
        ))
    }
}

fn lookup_failed(source: &str, e: anyhow::Error) -> FlowError {
    error!("{} lookup failed: {}", source, e);
    FlowError::TaskExecutionFailed(format!("{} lookup failed: {}", source, e))
}
