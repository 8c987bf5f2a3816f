use thiserror::Error;

use crate::planner::TranscriptCommit;
use crate::transcript::TranscriptBudget;

pub const DEFAULT_WIKIPEDIA_URL: &str = "https://en.wikipedia.org";
pub const DEFAULT_ARXIV_URL: &str = "http://export.arxiv.org";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} environment variable is required")]
    MissingApiKey { var: &'static str },

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Groq,
    OpenRouter,
}

impl LlmProvider {
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "llama-3.1-8b-instant",
            LlmProvider::OpenRouter => "openai/gpt-4o-mini",
        }
    }
}

/// Process configuration, read once at startup
#[derive(Clone)]
pub struct Config {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub transcript_commit: TranscriptCommit,
    pub transcript_budget: TranscriptBudget,
    pub wikipedia_url: String,
    pub arxiv_url: String,
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("transcript_commit", &self.transcript_commit)
            .field("transcript_budget", &self.transcript_budget)
            .field("wikipedia_url", &self.wikipedia_url)
            .field("arxiv_url", &self.arxiv_url)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            None => LlmProvider::Groq,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "groq" => LlmProvider::Groq,
                "openrouter" => LlmProvider::OpenRouter,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "LLM_PROVIDER",
                        value,
                    });
                }
            },
        };

        let api_key = get(provider.api_key_var()).ok_or(ConfigError::MissingApiKey {
            var: provider.api_key_var(),
        })?;

        let model = get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let transcript_commit = match get("TRANSCRIPT_COMMIT") {
            None => TranscriptCommit::default(),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    var: "TRANSCRIPT_COMMIT",
                    value,
                })?,
        };

        let transcript_budget = TranscriptBudget {
            max_entries: parse_limit(&get, "TRANSCRIPT_MAX_ENTRIES")?,
            max_chars: parse_limit(&get, "TRANSCRIPT_MAX_CHARS")?,
        };

        let port = parse_optional(&get, "PORT")?.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            provider,
            api_key,
            model,
            transcript_commit,
            transcript_budget,
            wikipedia_url: get("WIKIPEDIA_API_URL").unwrap_or_else(|| DEFAULT_WIKIPEDIA_URL.to_string()),
            arxiv_url: get("ARXIV_API_URL").unwrap_or_else(|| DEFAULT_ARXIV_URL.to_string()),
            port,
        })
    }
}

fn parse_optional<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

/// A transcript limit must leave room for at least one entry
fn parse_limit<G>(get: &G, var: &'static str) -> Result<Option<usize>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse_optional(get, var)? {
        Some(0) => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
        }),
        limit => Ok(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_key_is_reported() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey { var: "GROQ_API_KEY" });

        let err = Config::from_lookup(lookup(&[("GROQ_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey { var: "GROQ_API_KEY" });

        let err = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "openrouter"),
            ("GROQ_API_KEY", "gsk"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingApiKey {
                var: "OPENROUTER_API_KEY"
            }
        );
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("GROQ_API_KEY", "gsk_test")])).unwrap();
        assert_eq!(config.provider, LlmProvider::Groq);
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.transcript_commit, TranscriptCommit::AtomicPerRun);
        assert!(config.transcript_budget.is_unbounded());
        assert_eq!(config.wikipedia_url, DEFAULT_WIKIPEDIA_URL);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!format!("{:?}", config).contains("gsk_test"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "OpenRouter"),
            ("OPENROUTER_API_KEY", "or-key"),
            ("LLM_MODEL", "meta-llama/llama-3.2-1b-instruct"),
            ("TRANSCRIPT_COMMIT", "append"),
            ("TRANSCRIPT_MAX_ENTRIES", "12"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.provider, LlmProvider::OpenRouter);
        assert_eq!(config.model, "meta-llama/llama-3.2-1b-instruct");
        assert_eq!(config.transcript_commit, TranscriptCommit::AppendAsYouGo);
        assert_eq!(config.transcript_budget.max_entries, Some(12));
        assert_eq!(config.transcript_budget.max_chars, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("GROQ_API_KEY", "k"),
            ("TRANSCRIPT_MAX_CHARS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TRANSCRIPT_MAX_CHARS", .. }));

        let err = Config::from_lookup(lookup(&[
            ("GROQ_API_KEY", "k"),
            ("TRANSCRIPT_MAX_ENTRIES", "0"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "TRANSCRIPT_MAX_ENTRIES",
                value: "0".to_string()
            }
        );

        let err = Config::from_lookup(lookup(&[
            ("GROQ_API_KEY", "k"),
            ("TRANSCRIPT_MAX_CHARS", " 0 "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TRANSCRIPT_MAX_CHARS", .. }));

        let err = Config::from_lookup(lookup(&[("LLM_PROVIDER", "ollama")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "LLM_PROVIDER", .. }));
    }
}
