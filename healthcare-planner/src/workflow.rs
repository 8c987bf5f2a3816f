use crate::collaborators::Collaborators;
use crate::models::WorkflowVariant;
use crate::tasks::*;
use chain_flow::{Chain, ChainBuilder};
use std::sync::Arc;

pub const BASE_CHAIN_ID: &str = "healthcare_base";
pub const EXTENDED_CHAIN_ID: &str = "healthcare_extended";

/// Diagnosis → treatment → compatibility
pub fn build_base_workflow(collaborators: &Collaborators) -> Chain {
    ChainBuilder::new(BASE_CHAIN_ID)
        .add_task(Arc::new(DiagnosisTask::base(collaborators.model.clone())))
        .add_task(Arc::new(TreatmentTask::new(collaborators.model.clone())))
        .add_task(Arc::new(CompatibilityTask::new(collaborators.model.clone())))
        .build()
}

/// Lab analysis → knowledge lookup → diagnosis → treatment → compatibility
pub fn build_extended_workflow(collaborators: &Collaborators) -> Chain {
    ChainBuilder::new(EXTENDED_CHAIN_ID)
        .add_task(Arc::new(LabAnalysisTask::new(
            collaborators.model.clone(),
            collaborators.extractor.clone(),
        )))
        .add_task(Arc::new(KnowledgeLookupTask::new(
            collaborators.encyclopedia.clone(),
            collaborators.preprints.clone(),
        )))
        .add_task(Arc::new(DiagnosisTask::with_evidence(
            collaborators.model.clone(),
        )))
        .add_task(Arc::new(TreatmentTask::new(collaborators.model.clone())))
        .add_task(Arc::new(CompatibilityTask::new(collaborators.model.clone())))
        .build()
}

pub fn build_workflow(variant: WorkflowVariant, collaborators: &Collaborators) -> Chain {
    match variant {
        WorkflowVariant::Base => build_base_workflow(collaborators),
        WorkflowVariant::Extended => build_extended_workflow(collaborators),
    }
}

/// Number of transcript entries a successful run of `variant` appends
pub fn entries_per_run(variant: WorkflowVariant) -> usize {
    match variant {
        WorkflowVariant::Base => 3,
        // the knowledge lookup stage records two entries
        WorkflowVariant::Extended => 6,
    }
}
