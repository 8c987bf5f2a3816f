use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

/// Free-text patient input collected by the presentation layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientIntake {
    pub symptoms: String,
    pub medical_history: String,
    pub current_medications: String,
}

/// An uploaded lab report, carried as base64 so it can live in the run context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabDocument {
    pub file_name: String,
    pub content_base64: String,
}

impl LabDocument {
    pub fn from_bytes(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            content_base64: STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> anyhow::Result<Vec<u8>> {
        STANDARD
            .decode(self.content_base64.as_bytes())
            .map_err(|e| anyhow::anyhow!("lab report {} is not valid base64: {}", self.file_name, e))
    }

    /// Only PDF uploads are accepted
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowVariant {
    /// Diagnosis, treatment, compatibility
    Base,
    /// Lab analysis and knowledge lookup ahead of the base stages
    #[default]
    Extended,
}

impl std::str::FromStr for WorkflowVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(WorkflowVariant::Base),
            "extended" => Ok(WorkflowVariant::Extended),
            other => Err(format!("unknown workflow variant: {}", other)),
        }
    }
}

/// Everything one planner run needs besides the transcript
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub intake: PatientIntake,
    pub lab_report: Option<LabDocument>,
    pub variant: WorkflowVariant,
}

/// Outputs of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub run_id: String,
    pub variant: WorkflowVariant,
    pub diagnosis: String,
    pub treatments: String,
    pub compatibility: String,
    /// Text extracted from the lab report, extended variant only
    pub lab_content: Option<String>,
    pub lab_summary: Option<String>,
    pub wiki_summary: Option<String>,
    pub arxiv_summary: Option<String>,
    pub transcript: Transcript,
}

// HTTP request/response bodies

#[derive(Debug, Deserialize)]
pub struct PlanRequestBody {
    pub symptoms: String,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default)]
    pub current_medications: String,
    pub lab_report: Option<LabDocument>,
    pub variant: Option<WorkflowVariant>,
}

impl PlanRequestBody {
    pub fn into_request(self) -> PlanRequest {
        PlanRequest {
            intake: PatientIntake {
                symptoms: self.symptoms,
                medical_history: self.medical_history,
                current_medications: self.current_medications,
            },
            lab_report: self.lab_report,
            variant: self.variant.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultationResponse {
    pub consultation_id: String,
    pub transcript: String,
    pub entries: Vec<String>,
    pub revision: u64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    pub consultation_id: String,
    pub run_id: String,
    pub status: String,
    pub diagnosis: String,
    pub treatments: String,
    pub compatibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiki_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arxiv_summary: Option<String>,
    pub transcript: String,
    pub revision: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_document_round_trips_bytes() {
        let document = LabDocument::from_bytes("report.PDF", b"%PDF-1.4 data");
        assert!(document.is_pdf());
        assert_eq!(document.decode().unwrap(), b"%PDF-1.4 data");

        let bogus = LabDocument {
            file_name: "notes.txt".to_string(),
            content_base64: "***".to_string(),
        };
        assert!(!bogus.is_pdf());
        assert!(bogus.decode().is_err());
    }

    #[test]
    fn plan_body_defaults_to_extended() {
        let body: PlanRequestBody = serde_json::from_str(r#"{"symptoms": "fever"}"#).unwrap();
        let request = body.into_request();
        assert_eq!(request.variant, WorkflowVariant::Extended);
        assert_eq!(request.intake.medical_history, "");
        assert!(request.lab_report.is_none());

        let body: PlanRequestBody =
            serde_json::from_str(r#"{"symptoms": "fever", "variant": "base"}"#).unwrap();
        assert_eq!(body.into_request().variant, WorkflowVariant::Base);
    }
}
