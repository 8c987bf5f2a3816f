//! Prompt templates for each stage.
//!
//! Every template is a struct whose fields are exactly the values it
//! interpolates, so a missing or misspelled field is a compile error rather
//! than a malformed prompt.

/// Renders a stage's fields into prompt text
pub trait PromptTemplate {
    fn render(&self) -> String;
}

pub struct LabAnalysisPrompt<'a> {
    pub lab_content: &'a str,
}

impl PromptTemplate for LabAnalysisPrompt<'_> {
    fn render(&self) -> String {
        format!(
            "Analyze the following lab report and summarize the key findings: {}",
            self.lab_content
        )
    }
}

/// Supporting material the extended workflow gathers before diagnosing
pub struct DiagnosisEvidence<'a> {
    pub lab_report: &'a str,
    pub wiki_summary: &'a str,
    pub arxiv_summary: &'a str,
}

pub struct DiagnosisPrompt<'a> {
    pub history: &'a str,
    pub symptoms: &'a str,
    pub evidence: Option<DiagnosisEvidence<'a>>,
}

impl PromptTemplate for DiagnosisPrompt<'_> {
    fn render(&self) -> String {
        match &self.evidence {
            None => format!(
                "Based on the previous conversation: {}, \
                 the patient now presents with the following symptoms: {}. \
                 What are the possible diagnoses?",
                self.history, self.symptoms
            ),
            Some(evidence) => format!(
                "Based on the previous conversation: {}, \
                 the patient now presents with the following symptoms: {}. \
                 The following lab report details were provided: {}. \
                 In addition, a summary from Wikipedia: {} and from arXiv: {}. \
                 What are the possible diagnoses?",
                self.history,
                self.symptoms,
                evidence.lab_report,
                evidence.wiki_summary,
                evidence.arxiv_summary
            ),
        }
    }
}

pub struct TreatmentPrompt<'a> {
    pub diagnosis: &'a str,
    pub history: &'a str,
}

impl PromptTemplate for TreatmentPrompt<'_> {
    fn render(&self) -> String {
        format!(
            "Given the diagnosis: {} and the patient's previous data: {}, \
             what are the recommended treatments?",
            self.diagnosis, self.history
        )
    }
}

pub struct CompatibilityPrompt<'a> {
    pub treatments: &'a str,
    pub medical_history: &'a str,
    pub current_medications: &'a str,
    pub history: &'a str,
}

impl PromptTemplate for CompatibilityPrompt<'_> {
    fn render(&self) -> String {
        format!(
            "From the previous context: {}, the patient's medical history includes: {}. \
             They are currently taking: {}. Are these treatments safe: {}? \
             Provide a compatibility check.",
            self.history, self.medical_history, self.current_medications, self.treatments
        )
    }
}
