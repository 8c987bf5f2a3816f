use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::transcript::{Transcript, TranscriptBudget};

/// A user session: owns the transcript across workflow runs
#[derive(Debug, Clone)]
pub struct Consultation {
    pub id: String,
    pub transcript: Transcript,
    /// Bumped on every commit
    pub revision: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("consultation {0} not found")]
    NotFound(String),

    #[error("consultation changed while the run was in flight (revision {current})")]
    Stale { current: u64 },
}

/// In-memory consultation store.
///
/// Commits are checked against the revision the run started from, so two
/// overlapping runs cannot interleave their entries.
pub struct ConsultationStore {
    consultations: DashMap<String, Consultation>,
    budget: TranscriptBudget,
}

impl ConsultationStore {
    pub fn new(budget: TranscriptBudget) -> Self {
        Self {
            consultations: DashMap::new(),
            budget,
        }
    }

    pub fn create(&self) -> Consultation {
        let consultation = Consultation {
            id: Uuid::new_v4().to_string(),
            transcript: Transcript::with_budget(self.budget),
            revision: 0,
            created_at: Utc::now(),
        };
        self.consultations
            .insert(consultation.id.clone(), consultation.clone());
        consultation
    }

    pub fn get(&self, id: &str) -> Option<Consultation> {
        self.consultations.get(id).map(|entry| entry.clone())
    }

    pub fn commit(
        &self,
        id: &str,
        expected_revision: u64,
        transcript: Transcript,
    ) -> Result<Consultation, CommitError> {
        let mut entry = self
            .consultations
            .get_mut(id)
            .ok_or_else(|| CommitError::NotFound(id.to_string()))?;

        if entry.revision != expected_revision {
            return Err(CommitError::Stale {
                current: entry.revision,
            });
        }

        entry.transcript = transcript;
        entry.revision += 1;
        Ok(entry.clone())
    }

    pub fn delete(&self, id: &str) -> bool {
        self.consultations.remove(id).is_some()
    }
}
