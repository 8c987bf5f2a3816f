pub mod collaborators;
pub mod config;
pub mod consultations;
pub mod models;
pub mod planner;
pub mod prompts;
pub mod service;
pub mod tasks;
pub mod transcript;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use collaborators::Collaborators;
pub use config::{Config, ConfigError, LlmProvider};
pub use consultations::{Consultation, ConsultationStore};
pub use models::*;
pub use planner::{PlanFailure, Planner, TranscriptCommit};
pub use service::{AppState, create_app};
pub use transcript::{Transcript, TranscriptBudget};
pub use workflow::{build_base_workflow, build_extended_workflow, build_workflow};
