//! External systems the workflow talks to.
//!
//! Each collaborator sits behind a narrow trait so tasks never depend on a
//! concrete provider. Production implementations live in the submodules.

pub mod knowledge;
pub mod llm;
pub mod pdf;

use async_trait::async_trait;
use std::sync::Arc;

pub use knowledge::{ArxivLookup, WikipediaLookup};
pub use llm::RigCompletionBackend;
pub use pdf::PdfTextExtractor;

use crate::config::Config;

/// Language model completion: prompt in, raw completion text out
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Plain-text extraction from an uploaded document, page texts concatenated
pub trait DocumentExtractor: Send + Sync {
    fn extract_text(&self, document: &[u8]) -> anyhow::Result<String>;
}

/// Free-text reference lookup. No match is a successful, possibly empty, answer.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, query: &str) -> anyhow::Result<String>;
}

/// The full set of collaborators a workflow is built from
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn CompletionBackend>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub encyclopedia: Arc<dyn KnowledgeSource>,
    pub preprints: Arc<dyn KnowledgeSource>,
}

impl Collaborators {
    /// Production collaborators for the configured provider and endpoints
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::new();
        Self {
            model: Arc::new(RigCompletionBackend::from_config(config)),
            extractor: Arc::new(PdfTextExtractor),
            encyclopedia: Arc::new(WikipediaLookup::new(http.clone(), &config.wikipedia_url)),
            preprints: Arc::new(ArxivLookup::new(http, &config.arxiv_url)),
        }
    }
}
