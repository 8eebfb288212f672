//! Diagnostic Pipeline Module
//!
//! Walks a fixed step graph from classification to consolidation:
//! classify, diagnose, analyze history, then (for high-severity
//! occurrences) plan and justify financially, and finally consolidate
//! every opinion into one record. Advisory specialists may fail without
//! aborting the run; classification and consolidation failures abort it
//! and route the request to the deterministic fallback.

use std::sync::Arc;
use std::time::Instant;

use log::{error, info, warn};
use serde_json::json;
use thiserror::Error;

use fleet_store_rs::{create_fleet_store, FleetStore, StoreConfig, StoreError};
use fleet_tools_rs::{register_fleet_tools, ToolError, ToolRegistry};
use fleet_types_rs::{AgentOutput, FinalDiagnosis, OccurrenceRequest, Severity};
use llm_client_rs::{LlmClient, LlmError};

use crate::agent::{AgentError, SpecialistAgent};
use crate::fallback::generate_fallback_diagnostic;

/// Steps of the diagnostic pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Classify,
    Diagnose,
    AnalyzeHistory,
    Plan,
    AnalyzeFinancial,
    Consolidate,
}

impl PipelineStep {
    /// Successor of this step. The history analysis branches on severity:
    /// alta and critica take the planning detour, lower severities go
    /// straight to consolidation.
    pub fn next(self, severidade: Severity) -> Option<PipelineStep> {
        match self {
            PipelineStep::Classify => Some(PipelineStep::Diagnose),
            PipelineStep::Diagnose => Some(PipelineStep::AnalyzeHistory),
            PipelineStep::AnalyzeHistory => {
                if severidade.requires_planning() {
                    Some(PipelineStep::Plan)
                } else {
                    Some(PipelineStep::Consolidate)
                }
            }
            PipelineStep::Plan => Some(PipelineStep::AnalyzeFinancial),
            PipelineStep::AnalyzeFinancial => Some(PipelineStep::Consolidate),
            PipelineStep::Consolidate => None,
        }
    }
}

/// State threaded through the pipeline. Specialist outputs start empty
/// and stay empty for steps that were skipped or failed.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub request: OccurrenceRequest,
    pub modelo_veiculo: String,
    pub diagnostico: AgentOutput,
    pub historico: AgentOutput,
    pub planejamento: AgentOutput,
    pub financeiro: AgentOutput,
    pub resultado_final: AgentOutput,
}

impl PipelineState {
    fn new(request: OccurrenceRequest) -> Self {
        Self {
            request,
            modelo_veiculo: String::new(),
            diagnostico: AgentOutput::new(),
            historico: AgentOutput::new(),
            planejamento: AgentOutput::new(),
            financeiro: AgentOutput::new(),
            resultado_final: AgentOutput::new(),
        }
    }
}

/// Pipeline failure reasons. Any of these aborts the run; the caller
/// answers with the deterministic fallback instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("LLM client error: {0}")]
    Client(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tool setup failed: {0}")]
    ToolSetup(#[from] ToolError),

    #[error("Consolidation failed: {0}")]
    Consolidation(#[from] AgentError),
}

/// Executes the step graph against one model client, one fleet store and
/// one tool registry.
pub struct DiagnosticPipeline<'a> {
    client: &'a LlmClient,
    store: Arc<dyn FleetStore>,
    registry: &'a ToolRegistry,
}

impl<'a> DiagnosticPipeline<'a> {
    pub fn new(
        client: &'a LlmClient,
        store: Arc<dyn FleetStore>,
        registry: &'a ToolRegistry,
    ) -> Self {
        Self {
            client,
            store,
            registry,
        }
    }

    /// Walk the graph from classification to consolidation.
    pub async fn run(&self, request: OccurrenceRequest) -> Result<PipelineState, PipelineError> {
        let mut state = PipelineState::new(request);

        let mut step = Some(PipelineStep::Classify);
        while let Some(current) = step {
            self.execute_step(current, &mut state).await?;
            step = current.next(state.request.severidade);
        }

        Ok(state)
    }

    async fn execute_step(
        &self,
        step: PipelineStep,
        state: &mut PipelineState,
    ) -> Result<(), PipelineError> {
        match step {
            PipelineStep::Classify => self.classify(state).await?,
            PipelineStep::Diagnose => {
                let agent = SpecialistAgent::diagnostician(self.registry);
                let message = format!(
                    "Sistema: {}\nSintomas: {}\nVeículo ID: {}\nKM atual: {}",
                    state.request.sistema,
                    state.request.sintomas.join(", "),
                    state.request.veiculo_id,
                    state.request.km,
                );
                state.diagnostico = self.run_specialist(&agent, message).await;
            }
            PipelineStep::AnalyzeHistory => {
                let agent = SpecialistAgent::historian(self.registry);
                let message = format!(
                    "Sistema: {}\nSintomas: {}\nVeículo ID: {}",
                    state.request.sistema,
                    state.request.sintomas.join(", "),
                    state.request.veiculo_id,
                );
                state.historico = self.run_specialist(&agent, message).await;
            }
            PipelineStep::Plan => {
                let agent = SpecialistAgent::planner();
                let message = format!(
                    "Diagnóstico técnico:\n{}\n\nAnálise histórica:\n{}",
                    pretty(&state.diagnostico),
                    pretty(&state.historico),
                );
                state.planejamento = self.run_specialist(&agent, message).await;
            }
            PipelineStep::AnalyzeFinancial => {
                // The diagnosed component narrows the cost lookup; without
                // one the whole system is priced.
                let componente = state
                    .diagnostico
                    .get("componente")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or(&state.request.sistema)
                    .to_string();

                let agent = SpecialistAgent::financial(self.registry);
                let message = format!(
                    "Sistema: {}\nComponente: {}\nModelo do veículo: {}",
                    state.request.sistema, componente, state.modelo_veiculo,
                );
                state.financeiro = self.run_specialist(&agent, message).await;
            }
            PipelineStep::Consolidate => self.consolidate(state).await?,
        }

        Ok(())
    }

    /// Resolve the vehicle model. A missing vehicle is not an error, the
    /// pipeline continues with a placeholder model.
    async fn classify(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let vehicle = self.store.get_vehicle(state.request.veiculo_id).await?;
        state.modelo_veiculo = vehicle
            .map(|v| v.modelo)
            .unwrap_or_else(|| "Desconhecido".to_string());

        info!(
            "Veículo {} — modelo: {}",
            state.request.veiculo_id, state.modelo_veiculo
        );
        Ok(())
    }

    /// Run one advisory specialist. Its failure degrades the final answer
    /// but never aborts the pipeline.
    async fn run_specialist(&self, agent: &SpecialistAgent<'_>, message: String) -> AgentOutput {
        match agent.run(self.client, message).await {
            Ok(output) => output,
            Err(e) => {
                warn!("[{}] falhou, seguindo sem essa análise: {}", agent.role(), e);
                AgentOutput::new()
            }
        }
    }

    /// Merge every opinion into the final record. Consolidation failures
    /// abort the run.
    async fn consolidate(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let context = json!({
            "sistema": state.request.sistema,
            "sintomas": state.request.sintomas,
            "severidade": state.request.severidade,
            "km": state.request.km,
            "modelo_veiculo": state.modelo_veiculo,
            "diagnostico": state.diagnostico,
            "historico": state.historico,
            "planejamento": state.planejamento,
            "financeiro": state.financeiro,
        });

        let agent = SpecialistAgent::consolidator();
        let message = serde_json::to_string_pretty(&context).unwrap_or_default();
        state.resultado_final = agent.run(self.client, message).await?;
        Ok(())
    }
}

fn pretty(output: &AgentOutput) -> String {
    serde_json::to_string_pretty(output).unwrap_or_default()
}

/// Run the full diagnostic flow for one occurrence.
///
/// Total by construction: any pipeline failure is logged and answered
/// with a synthetic diagnosis from the rule table, so the caller always
/// receives a complete record.
pub async fn orchestrate(
    veiculo_id: i64,
    sistema: String,
    sintomas: Vec<String>,
    descricao: String,
    severidade: Severity,
    km: f64,
) -> FinalDiagnosis {
    let request = OccurrenceRequest::new(veiculo_id, sistema, sintomas, descricao, severidade, km);

    let start = Instant::now();
    info!(
        "Iniciando diagnóstico — veículo {}, sistema {}",
        request.veiculo_id, request.sistema
    );

    let result = run_env_pipeline(&request).await;
    conclude(result, &request, start)
}

/// [`orchestrate`] against caller-supplied client and store. Used by the
/// service layer and by tests to avoid touching process environment.
pub async fn orchestrate_with(
    client: &LlmClient,
    store: Arc<dyn FleetStore>,
    request: OccurrenceRequest,
) -> FinalDiagnosis {
    let start = Instant::now();
    info!(
        "Iniciando diagnóstico — veículo {}, sistema {}",
        request.veiculo_id, request.sistema
    );

    let result = run_pipeline(client, store, &request).await;
    conclude(result, &request, start)
}

/// Build client, store and tools from the environment, then run.
async fn run_env_pipeline(request: &OccurrenceRequest) -> Result<PipelineState, PipelineError> {
    let client = LlmClient::from_env()?;
    let store = create_fleet_store(&StoreConfig::default()).await?;
    run_pipeline(&client, store, request).await
}

async fn run_pipeline(
    client: &LlmClient,
    store: Arc<dyn FleetStore>,
    request: &OccurrenceRequest,
) -> Result<PipelineState, PipelineError> {
    let registry = register_fleet_tools(store.clone())?;
    let pipeline = DiagnosticPipeline::new(client, store, &registry);
    pipeline.run(request.clone()).await
}

fn conclude(
    result: Result<PipelineState, PipelineError>,
    request: &OccurrenceRequest,
    start: Instant,
) -> FinalDiagnosis {
    match result {
        Ok(state) => {
            info!(
                "Diagnóstico completo em {:.1}s",
                start.elapsed().as_secs_f64()
            );
            FinalDiagnosis::from_consolidated(&state.resultado_final, request)
        }
        Err(e) => {
            error!("Erro após {:.1}s: {}", start.elapsed().as_secs_f64(), e);
            warn!("Usando fallback determinístico");
            generate_fallback_diagnostic(&request.sistema, &request.sintomas, request.km)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_graph_for_low_severity() {
        for severidade in [Severity::Baixa, Severity::Media] {
            let mut steps = vec![PipelineStep::Classify];
            while let Some(next) = steps.last().unwrap().next(severidade) {
                steps.push(next);
            }
            assert_eq!(
                steps,
                vec![
                    PipelineStep::Classify,
                    PipelineStep::Diagnose,
                    PipelineStep::AnalyzeHistory,
                    PipelineStep::Consolidate,
                ]
            );
        }
    }

    #[test]
    fn test_step_graph_for_high_severity() {
        for severidade in [Severity::Alta, Severity::Critica] {
            let mut steps = vec![PipelineStep::Classify];
            while let Some(next) = steps.last().unwrap().next(severidade) {
                steps.push(next);
            }
            assert_eq!(
                steps,
                vec![
                    PipelineStep::Classify,
                    PipelineStep::Diagnose,
                    PipelineStep::AnalyzeHistory,
                    PipelineStep::Plan,
                    PipelineStep::AnalyzeFinancial,
                    PipelineStep::Consolidate,
                ]
            );
        }
    }

    #[test]
    fn test_consolidate_is_terminal() {
        assert_eq!(PipelineStep::Consolidate.next(Severity::Critica), None);
    }
}
