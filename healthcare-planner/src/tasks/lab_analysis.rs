use anyhow::anyhow;
use async_trait::async_trait;
use chain_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::{info, warn};

use super::utils::{complete, record_entries};
use super::{labels, session_keys, stage_ids};
use crate::collaborators::{CompletionBackend, DocumentExtractor};
use crate::models::LabDocument;
use crate::prompts::{LabAnalysisPrompt, PromptTemplate};

/// Extracts the uploaded lab report, if any, and summarizes its findings
pub struct LabAnalysisTask {
    model: Arc<dyn CompletionBackend>,
    extractor: Arc<dyn DocumentExtractor>,
}

impl LabAnalysisTask {
    pub fn new(model: Arc<dyn CompletionBackend>, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { model, extractor }
    }
}

#[async_trait]
impl Task for LabAnalysisTask {
    fn id(&self) -> &str {
        stage_ids::LAB_ANALYSIS
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!("Analyzing the lab report");

        let document: Option<LabDocument> = context.get(session_keys::LAB_DOCUMENT).await;

        let lab_content = match document {
            Some(document) => extract_lab_text(self.extractor.clone(), &document)
                .await
                .map_err(|e| {
                    FlowError::TaskExecutionFailed(format!("Lab report extraction failed: {}", e))
                })?,
            None => {
                info!("No lab report uploaded");
                String::new()
            }
        };

        if lab_content.trim().is_empty() {
            warn!("Lab report content is empty, analyzing without findings");
        }
        context.set(session_keys::LAB_CONTENT, &lab_content).await;

        let prompt = LabAnalysisPrompt {
            lab_content: &lab_content,
        }
        .render();
        let lab_summary = complete(self.model.as_ref(), self.id(), &prompt).await?;

        context.set(session_keys::LAB_SUMMARY, &lab_summary).await;
        record_entries(&context, &[(labels::LAB_REPORT_SUMMARY, lab_summary.as_str())]).await?;

        Ok(TaskResult::new_with_status(
            Some(lab_summary),
            NextAction::Continue,
            Some("Lab report analyzed".to_string()),
        ))
    }
}

/// Decode the upload and run the extractor off the async scheduler
async fn extract_lab_text(
    extractor: Arc<dyn DocumentExtractor>,
    document: &LabDocument,
) -> anyhow::Result<String> {
    let bytes = document.decode()?;
    info!(
        "Extracting text from {} ({} bytes)",
        document.file_name,
        bytes.len()
    );

    let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
        .await
        .map_err(|e| anyhow!("extraction worker crashed: {}", e))??;

    info!("Extracted {} characters from lab report", text.len());
    Ok(text)
}
