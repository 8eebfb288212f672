//! Diagnosis request accepted by the orchestration pipeline

use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// One reported occurrence, immutable once accepted by the pipeline.
///
/// Field names match the occurrence payload produced by the intake layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceRequest {
    /// Vehicle the occurrence was reported against
    pub veiculo_id: i64,
    /// Affected system (e.g. "Motor", "Freios", "Arrefecimento")
    pub sistema: String,
    /// Symptom labels as reported, order preserved
    pub sintomas: Vec<String>,
    /// Free-text description from the reporter
    pub descricao: String,
    /// Reported severity
    pub severidade: Severity,
    /// Odometer reading at the time of the occurrence, in km
    pub km: f64,
}

impl OccurrenceRequest {
    pub fn new(
        veiculo_id: i64,
        sistema: impl Into<String>,
        sintomas: Vec<String>,
        descricao: impl Into<String>,
        severidade: Severity,
        km: f64,
    ) -> Self {
        Self {
            veiculo_id,
            sistema: sistema.into(),
            sintomas,
            descricao: descricao.into(),
            severidade,
            km,
        }
    }
}
