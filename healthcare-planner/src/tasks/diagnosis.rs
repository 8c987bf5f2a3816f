use async_trait::async_trait;
use chain_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::utils::{complete, load_transcript, record_entries, require};
use super::{labels, session_keys, stage_ids};
use crate::collaborators::CompletionBackend;
use crate::models::PatientIntake;
use crate::prompts::{DiagnosisEvidence, DiagnosisPrompt, PromptTemplate};

pub struct DiagnosisTask {
    model: Arc<dyn CompletionBackend>,
    /// Read lab summary and knowledge summaries from the context
    with_evidence: bool,
}

impl DiagnosisTask {
    /// Diagnosis from symptoms and transcript only
    pub fn base(model: Arc<dyn CompletionBackend>) -> Self {
        Self {
            model,
            with_evidence: false,
        }
    }

    /// Diagnosis that also cites the lab summary and both knowledge lookups
    pub fn with_evidence(model: Arc<dyn CompletionBackend>) -> Self {
        Self {
            model,
            with_evidence: true,
        }
    }
}

#[async_trait]
impl Task for DiagnosisTask {
    fn id(&self) -> &str {
        stage_ids::DIAGNOSIS
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("Generating diagnosis");

        let intake: PatientIntake = require(&context, session_keys::PATIENT_INTAKE).await?;
        let history = load_transcript(&context).await?.as_text();

        let prompt = if self.with_evidence {
            let lab_report: String = require(&context, session_keys::LAB_SUMMARY).await?;
            let wiki_summary: String = require(&context, session_keys::WIKI_SUMMARY).await?;
            let arxiv_summary: String = require(&context, session_keys::ARXIV_SUMMARY).await?;

            DiagnosisPrompt {
                history: &history,
                symptoms: &intake.symptoms,
                evidence: Some(DiagnosisEvidence {
                    lab_report: &lab_report,
                    wiki_summary: &wiki_summary,
                    arxiv_summary: &arxiv_summary,
                }),
            }
            .render()
        } else {
            DiagnosisPrompt {
                history: &history,
                symptoms: &intake.symptoms,
                evidence: None,
            }
            .render()
        };

        let diagnosis = complete(self.model.as_ref(), self.id(), &prompt).await?;

        context.set(session_keys::DIAGNOSIS, &diagnosis).await;
        record_entries(&context, &[(labels::DIAGNOSIS, diagnosis.as_str())]).await?;

        Ok(TaskResult::new_with_status(
            Some(diagnosis),
            NextAction::Continue,
            Some("Diagnosis generated".to_string()),
        ))
    }
}
