pub mod compatibility;
pub mod diagnosis;
pub mod knowledge_lookup;
pub mod lab_analysis;
pub mod treatment;
pub mod utils;

pub use compatibility::CompatibilityTask;
pub use diagnosis::DiagnosisTask;
pub use knowledge_lookup::KnowledgeLookupTask;
pub use lab_analysis::LabAnalysisTask;
pub use treatment::TreatmentTask;

/// Keys under which tasks exchange data in the run context
pub mod session_keys {
    pub const PATIENT_INTAKE: &str = "patient_intake";
    pub const LAB_DOCUMENT: &str = "lab_document";
    pub const TRANSCRIPT: &str = "transcript";
    pub const LAB_CONTENT: &str = "lab_content";
    pub const LAB_SUMMARY: &str = "lab_summary";
    pub const WIKI_SUMMARY: &str = "wiki_summary";
    pub const ARXIV_SUMMARY: &str = "arxiv_summary";
    pub const DIAGNOSIS: &str = "diagnosis";
    pub const TREATMENTS: &str = "treatments";
    pub const COMPATIBILITY: &str = "compatibility";
}

/// Stage ids, as they appear in run states and failure reports
pub mod stage_ids {
    pub const LAB_ANALYSIS: &str = "lab_analysis";
    pub const KNOWLEDGE_LOOKUP: &str = "knowledge_lookup";
    pub const DIAGNOSIS: &str = "diagnosis";
    pub const TREATMENT: &str = "treatment";
    pub const COMPATIBILITY: &str = "compatibility";
}

/// Transcript entry labels
pub mod labels {
    pub const LAB_REPORT_SUMMARY: &str = "Lab Report Summary";
    pub const WIKIPEDIA_SUMMARY: &str = "Wikipedia Summary";
    pub const ARXIV_SUMMARY: &str = "arXiv Summary";
    pub const DIAGNOSIS: &str = "Diagnosis";
    pub const SUGGESTED_TREATMENTS: &str = "Suggested Treatments";
    pub const COMPATIBILITY_CHECK: &str = "Compatibility Check";
}
