use async_trait::async_trait;
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::Prompt,
    providers::{groq, openrouter},
};
use tracing::debug;

use super::CompletionBackend;
use crate::config::{Config, LlmProvider};

enum ProviderAgent {
    Groq(Agent<groq::CompletionModel>),
    OpenRouter(Agent<openrouter::CompletionModel>),
}

/// Completion backend on top of a rig agent
pub struct RigCompletionBackend {
    agent: ProviderAgent,
    model: String,
}

impl RigCompletionBackend {
    pub fn from_config(config: &Config) -> Self {
        let agent = match config.provider {
            LlmProvider::Groq => {
                let client = groq::Client::new(&config.api_key);
                ProviderAgent::Groq(client.agent(&config.model).build())
            }
            LlmProvider::OpenRouter => {
                let client = openrouter::Client::new(&config.api_key);
                ProviderAgent::OpenRouter(client.agent(&config.model).build())
            }
        };

        Self {
            agent,
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl CompletionBackend for RigCompletionBackend {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");
        let response = match &self.agent {
            ProviderAgent::Groq(agent) => agent.prompt(prompt).await?,
            ProviderAgent::OpenRouter(agent) => agent.prompt(prompt).await?,
        };
        Ok(response)
    }
}
