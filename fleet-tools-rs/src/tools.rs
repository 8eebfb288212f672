//! Tool Implementations
//!
//! The four diagnostic tools over the fleet database. Each mirrors the
//! conventions the agents expect: successful calls return the data
//! object, data problems come back in-band as `{"erro": ...}` so the
//! model can read and react to them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use fleet_store_rs::FleetStore;

use crate::registry::{
    FleetTool, ParameterDefinition, ToolDefinition, ToolError, ToolRegistry,
};

/// In-band error object, the shape agents are prompted to recognize.
fn erro(message: impl std::fmt::Display) -> Value {
    json!({ "erro": message.to_string() })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Argument extraction
// ============================================================================

/// Integer argument, tolerating the numeric strings some models emit.
fn require_i64(args: &Map<String, Value>, tool: &str, name: &str) -> Result<i64, ToolError> {
    let value = args.get(name).ok_or_else(|| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("missing required parameter: {}", name),
    })?;

    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("{} must be an integer", name),
        })
}

fn require_str<'a>(
    args: &'a Map<String, Value>,
    tool: &str,
    name: &str,
) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("{} must be a string", name),
        })
}

fn require_string_list(
    args: &Map<String, Value>,
    tool: &str,
    name: &str,
) -> Result<Vec<String>, ToolError> {
    let value = args.get(name).ok_or_else(|| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("missing required parameter: {}", name),
    })?;

    match value {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Value::String(single) => Ok(vec![single.clone()]),
        _ => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("{} must be a list of strings", name),
        }),
    }
}

fn optional_u32(args: &Map<String, Value>, name: &str, default: u32) -> u32 {
    args.get(name)
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .map(|v| v as u32)
        .unwrap_or(default)
}

// ============================================================================
// consultar_historico_veiculo
// ============================================================================

/// Maintenance history of one vehicle, newest first.
pub struct VehicleHistoryTool {
    store: Arc<dyn FleetStore>,
    definition: ToolDefinition,
}

impl VehicleHistoryTool {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self {
            store,
            definition: ToolDefinition {
                name: "consultar_historico_veiculo".to_string(),
                description: "Busca as últimas N manutenções de um veículo específico. \
                              Usar quando precisar entender o histórico de manutenção de um \
                              veículo para identificar padrões de falha recorrentes ou avaliar \
                              o estado geral."
                    .to_string(),
                parameters: vec![
                    ParameterDefinition {
                        name: "veiculo_id".to_string(),
                        description: "ID do veículo".to_string(),
                        required: true,
                        param_type: "integer".to_string(),
                        default: None,
                    },
                    ParameterDefinition {
                        name: "limite".to_string(),
                        description: "Quantidade máxima de manutenções a retornar".to_string(),
                        required: false,
                        param_type: "integer".to_string(),
                        default: Some(json!(10)),
                    },
                ],
            },
        }
    }
}

#[async_trait]
impl FleetTool for VehicleHistoryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let veiculo_id = require_i64(args, &self.definition.name, "veiculo_id")?;
        let limite = optional_u32(args, "limite", 10);

        let veiculo = match self.store.get_vehicle(veiculo_id).await {
            Ok(Some(veiculo)) => veiculo,
            Ok(None) => return Ok(erro(format!("Veículo {} não encontrado", veiculo_id))),
            Err(e) => return Ok(erro(e)),
        };

        let manutencoes = match self.store.maintenance_history(veiculo_id, limite).await {
            Ok(records) => records,
            Err(e) => return Ok(erro(e)),
        };

        let lista: Vec<Value> = manutencoes
            .iter()
            .map(|m| {
                json!({
                    "tipo": m.tipo,
                    "descricao": m.descricao,
                    "data": m.data_realizada,
                    "custo": m.custo,
                    "pecas": m.pecas,
                })
            })
            .collect();

        Ok(json!({
            "veiculo": {
                "placa": veiculo.placa,
                "modelo": veiculo.modelo,
                "km_atual": veiculo.km_atual,
            },
            "manutencoes": lista,
        }))
    }
}

// ============================================================================
// buscar_padroes_frota
// ============================================================================

/// Occurrences across the fleet with the same system and overlapping
/// symptoms, with diagnosis outcome where one exists.
pub struct FleetPatternsTool {
    store: Arc<dyn FleetStore>,
    definition: ToolDefinition,
}

impl FleetPatternsTool {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self {
            store,
            definition: ToolDefinition {
                name: "buscar_padroes_frota".to_string(),
                description: "Busca ocorrências de outros veículos com o mesmo sistema afetado \
                              e sintomas parecidos, incluindo o diagnóstico e resultado quando \
                              disponível. Usar quando precisar comparar uma ocorrência atual com \
                              casos similares na frota para identificar padrões de falha comuns."
                    .to_string(),
                parameters: vec![
                    ParameterDefinition {
                        name: "sistema".to_string(),
                        description: "Sistema do veículo afetado (ex: Motor, Freios)".to_string(),
                        required: true,
                        param_type: "string".to_string(),
                        default: None,
                    },
                    ParameterDefinition {
                        name: "sintomas".to_string(),
                        description: "Sintomas reportados para comparação".to_string(),
                        required: true,
                        param_type: "array".to_string(),
                        default: None,
                    },
                ],
            },
        }
    }
}

#[async_trait]
impl FleetTool for FleetPatternsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let sistema = require_str(args, &self.definition.name, "sistema")?;
        let sintomas = require_string_list(args, &self.definition.name, "sintomas")?;

        let ocorrencias = match self.store.occurrences_by_system(sistema).await {
            Ok(occurrences) => occurrences,
            Err(e) => return Ok(erro(e)),
        };

        let buscados: Vec<String> = sintomas.iter().map(|s| s.to_lowercase()).collect();

        let mut casos_similares = Vec::new();
        for oc in &ocorrencias {
            // Keep only occurrences sharing at least one reported symptom.
            // Comparison and the reported overlap are both lowercase.
            let em_comum: Vec<String> = oc
                .sintomas
                .iter()
                .map(|s| s.to_lowercase())
                .filter(|s| buscados.contains(s))
                .collect();
            if em_comum.is_empty() {
                continue;
            }

            casos_similares.push(json!({
                "veiculo": format!("{} ({})", oc.placa, oc.modelo),
                "data": oc.data_ocorrencia,
                "sintomas": oc.sintomas,
                "sintomas_em_comum": em_comum,
                "severidade": oc.severidade,
                "km": oc.km_ocorrencia,
                "status": oc.status,
                "diagnostico": oc.componente,
                "probabilidade_falha": oc.probabilidade_falha,
                "recomendacao": oc.recomendacao,
            }));
        }

        Ok(json!({
            "casos_similares": casos_similares,
            "total": casos_similares.len(),
        }))
    }
}

// ============================================================================
// consultar_saude_componentes
// ============================================================================

/// Health percentage of every monitored component of one vehicle.
pub struct ComponentHealthTool {
    store: Arc<dyn FleetStore>,
    definition: ToolDefinition,
}

impl ComponentHealthTool {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self {
            store,
            definition: ToolDefinition {
                name: "consultar_saude_componentes".to_string(),
                description: "Retorna a saúde percentual de cada componente de um veículo. \
                              Usar quando precisar avaliar o estado atual dos componentes para \
                              correlacionar sintomas reportados com degradação real do \
                              equipamento."
                    .to_string(),
                parameters: vec![ParameterDefinition {
                    name: "veiculo_id".to_string(),
                    description: "ID do veículo".to_string(),
                    required: true,
                    param_type: "integer".to_string(),
                    default: None,
                }],
            },
        }
    }
}

#[async_trait]
impl FleetTool for ComponentHealthTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let veiculo_id = require_i64(args, &self.definition.name, "veiculo_id")?;

        let componentes = match self.store.component_health(veiculo_id).await {
            Ok(components) => components,
            Err(e) => return Ok(erro(e)),
        };

        if componentes.is_empty() {
            return Ok(erro(format!(
                "Nenhum componente encontrado para veículo {}",
                veiculo_id
            )));
        }

        let lista: Vec<Value> = componentes
            .iter()
            .map(|c| {
                json!({
                    "nome": c.nome,
                    "saude_pct": c.saude_pct,
                    "ultima_inspecao": c.ultima_inspecao,
                })
            })
            .collect();

        Ok(json!({ "componentes": lista }))
    }
}

// ============================================================================
// calcular_economia
// ============================================================================

struct MarketEstimate {
    preventiva: i64,
    corretiva: i64,
}

/// Market rates for heavy mining trucks, used when the database has too
/// few records to trust.
fn market_estimate(sistema: &str) -> MarketEstimate {
    let (preventiva, corretiva) = match sistema {
        "Motor" => (4500, 28000),
        "Freios" => (2800, 12000),
        "Arrefecimento" => (1800, 9500),
        "Transmissão" => (5500, 35000),
        "Suspensão" => (3200, 15000),
        "Sistema Elétrico" => (1500, 7000),
        "Pneus" => (4000, 8000),
        _ => (3000, 15000),
    };
    MarketEstimate {
        preventiva,
        corretiva,
    }
}

/// Preventive versus corrective cost comparison for one component.
pub struct CostSavingsTool {
    store: Arc<dyn FleetStore>,
    definition: ToolDefinition,
}

impl CostSavingsTool {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self {
            store,
            definition: ToolDefinition {
                name: "calcular_economia".to_string(),
                description: "Calcula a economia estimada de manutenção preventiva vs corretiva \
                              para um componente, baseado em dados históricos reais do banco. \
                              Usar quando precisar justificar financeiramente uma intervenção \
                              preventiva ou preditiva comparando com o custo de uma falha \
                              corretiva."
                    .to_string(),
                parameters: vec![
                    ParameterDefinition {
                        name: "sistema".to_string(),
                        description: "Sistema do veículo (ex: Motor, Freios)".to_string(),
                        required: true,
                        param_type: "string".to_string(),
                        default: None,
                    },
                    ParameterDefinition {
                        name: "componente".to_string(),
                        description: "Componente avaliado".to_string(),
                        required: true,
                        param_type: "string".to_string(),
                        default: None,
                    },
                    ParameterDefinition {
                        name: "modelo_veiculo".to_string(),
                        description: "Modelo do veículo".to_string(),
                        required: true,
                        param_type: "string".to_string(),
                        default: None,
                    },
                ],
            },
        }
    }
}

#[async_trait]
impl FleetTool for CostSavingsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let sistema = require_str(args, &self.definition.name, "sistema")?;
        let componente = require_str(args, &self.definition.name, "componente")?;
        let modelo_veiculo = require_str(args, &self.definition.name, "modelo_veiculo")?;

        let preventivas = match self.store.cost_aggregate("preventiva", sistema).await {
            Ok(aggregate) => aggregate,
            Err(e) => return Ok(erro(e)),
        };
        let corretivas = match self.store.cost_aggregate("corretiva", sistema).await {
            Ok(aggregate) => aggregate,
            Err(e) => return Ok(erro(e)),
        };

        let estimativa = market_estimate(sistema);

        // Real averages only count with at least two records behind them.
        let prev_historico = preventivas
            .custo_medio
            .filter(|_| preventivas.is_trustworthy())
            .map(round2);
        let corr_historico = corretivas
            .custo_medio
            .filter(|_| corretivas.is_trustworthy())
            .map(round2);

        let custo_prev = prev_historico.unwrap_or(estimativa.preventiva as f64);
        let custo_corr = corr_historico.unwrap_or(estimativa.corretiva as f64);

        let economia = round2(custo_corr - custo_prev);
        let fator = if custo_prev > 0.0 {
            format!("{:.1}x", custo_corr / custo_prev)
        } else {
            "0x".to_string()
        };

        let fonte_prev = match prev_historico {
            Some(_) => format!("histórico ({} registros)", preventivas.total),
            None => "estimativa de mercado".to_string(),
        };
        let fonte_corr = match corr_historico {
            Some(_) => format!("histórico ({} registros)", corretivas.total),
            None => "estimativa de mercado".to_string(),
        };

        let custo_prev_valor = match prev_historico {
            Some(valor) => json!(valor),
            None => json!(estimativa.preventiva),
        };
        let custo_corr_valor = match corr_historico {
            Some(valor) => json!(valor),
            None => json!(estimativa.corretiva),
        };

        Ok(json!({
            "custo_preventiva": custo_prev_valor,
            "custo_corretiva": custo_corr_valor,
            "economia": economia,
            "fator_multiplicador": fator,
            "fonte_dados": {
                "preventiva": fonte_prev,
                "corretiva": fonte_corr,
            },
            "modelo_veiculo": modelo_veiculo,
            "sistema": sistema,
            "componente": componente,
        }))
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Build a registry with every diagnostic tool wired to the given store.
pub fn register_fleet_tools(store: Arc<dyn FleetStore>) -> Result<ToolRegistry, ToolError> {
    let registry = ToolRegistry::new();

    registry.register(Arc::new(VehicleHistoryTool::new(store.clone())))?;
    registry.register(Arc::new(FleetPatternsTool::new(store.clone())))?;
    registry.register(Arc::new(ComponentHealthTool::new(store.clone())))?;
    registry.register(Arc::new(CostSavingsTool::new(store)))?;

    log::info!("Fleet diagnostic tools registered");
    Ok(registry)
}
