//! orchestrator-rs
//!
//! Multi-agent predictive-maintenance pipeline for the FleetPred fleet.
//! One reported occurrence flows through classification, technical
//! diagnosis, history analysis, optional planning and financial
//! justification, and a final consolidation into a [`FinalDiagnosis`].
//! When the model-backed pipeline fails, a deterministic rule-table
//! fallback answers instead, so [`orchestrate`] never fails visibly.

pub mod agent;
pub mod fallback;
pub mod pipeline;

pub use agent::{AgentError, SpecialistAgent};
pub use fallback::{generate_fallback_diagnostic, generate_with_rng, MOCK_MODEL_VERSION};
pub use pipeline::{
    orchestrate, orchestrate_with, DiagnosticPipeline, PipelineError, PipelineState, PipelineStep,
};

pub use fleet_types_rs::{FinalDiagnosis, OccurrenceRequest, Severity};
