//! Stub collaborators for unit tests.

use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::collaborators::{Collaborators, CompletionBackend, DocumentExtractor, KnowledgeSource};

/// Text that only the diagnosis prompt contains
pub const DIAGNOSIS_MARKER: &str = "What are the possible diagnoses?";
pub const TREATMENT_MARKER: &str = "what are the recommended treatments?";
pub const COMPATIBILITY_MARKER: &str = "Provide a compatibility check.";
pub const LAB_MARKER: &str = "Analyze the following lab report";

/// Model that echoes every prompt back, optionally failing on prompts containing a marker
#[derive(Default)]
pub struct StubModel {
    prompts: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl StubModel {
    pub fn echo() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(marker: &'static str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            fail_on: Some(marker),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn calls_containing(&self, marker: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(marker)).count()
    }
}

#[async_trait]
impl CompletionBackend for StubModel {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.fail_on {
            Some(marker) if prompt.contains(marker) => Err(anyhow!("model backend unreachable")),
            _ => Ok(prompt.to_string()),
        }
    }
}

pub struct StubExtractor {
    text: Option<String>,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentExtractor for StubExtractor {
    fn extract_text(&self, _document: &[u8]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| anyhow!("document is unreadable"))
    }
}

pub struct StubSource {
    name: &'static str,
    reply: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn replying(name: &'static str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Some(reply.to_string()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeSource for StubSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn lookup(&self, query: &str) -> anyhow::Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        self.reply
            .clone()
            .ok_or_else(|| anyhow!("{} is unreachable", self.name))
    }
}

/// Echo model, empty-text extractor and fixed knowledge sources
pub fn stub_collaborators() -> Collaborators {
    collaborators_with(StubModel::echo(), StubExtractor::returning(""))
}

pub fn collaborators_with(
    model: Arc<StubModel>,
    extractor: Arc<StubExtractor>,
) -> Collaborators {
    Collaborators {
        model,
        extractor,
        encyclopedia: StubSource::replying("wikipedia", "Page: Fever\nSummary: A rise in body temperature."),
        preprints: StubSource::replying("arxiv", "Title: Fever screening"),
    }
}
