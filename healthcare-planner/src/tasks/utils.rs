use chain_flow::{Context, FlowError, Result};
use serde::de::DeserializeOwned;
use tracing::info;

use super::session_keys;
use crate::collaborators::CompletionBackend;
use crate::transcript::Transcript;

/// Read a value every run is seeded with
pub async fn require<T: DeserializeOwned>(context: &Context, key: &str) -> Result<T> {
    context
        .get(key)
        .await
        .ok_or_else(|| FlowError::ContextError(format!("{} not found in context", key)))
}

pub async fn load_transcript(context: &Context) -> Result<Transcript> {
    require(context, session_keys::TRANSCRIPT).await
}

/// Append labeled entries to the run transcript, in the order given
pub async fn record_entries(context: &Context, entries: &[(&str, &str)]) -> Result<()> {
    let mut transcript = load_transcript(context).await?;
    for (label, output) in entries {
        transcript.record(label, output);
    }
    context.set(session_keys::TRANSCRIPT, transcript).await;
    Ok(())
}

/// Submit a rendered prompt and return the completion verbatim
pub async fn complete(model: &dyn CompletionBackend, stage: &str, prompt: &str) -> Result<String> {
    let completion = model
        .complete(prompt)
        .await
        .map_err(|e| FlowError::TaskExecutionFailed(format!("{} completion failed: {}", stage, e)))?;

    info!(stage = %stage, chars = completion.len(), "completion received");
    Ok(completion)
}
