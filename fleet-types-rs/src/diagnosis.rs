//! Final diagnosis record and the untyped agent output bag
//!
//! Agent outputs stay schemaless until the very end of the pipeline; only
//! when a consolidated bag is turned into a [`FinalDiagnosis`] are missing
//! or mistyped keys replaced by their named defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::OccurrenceRequest;
use crate::severity::Severity;

/// Structured opinion produced by one specialist agent: a free-form JSON
/// object keyed by whatever the model chose to emit. Empty when extraction
/// from the model text failed.
pub type AgentOutput = serde_json::Map<String, Value>;

/// Canonical diagnosis record handed downstream. All nine diagnosis fields
/// are always populated; `modelo_versao` is set only on synthetic
/// (rule-table) diagnoses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDiagnosis {
    pub componente: String,
    pub probabilidade_falha: f64,
    pub horizonte_dias: i64,
    pub severidade: Severity,
    pub sintomas_correlacionados: Vec<String>,
    pub recomendacao: String,
    pub pecas_sugeridas: Vec<String>,
    pub economia_estimada: f64,
    pub base_historica: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modelo_versao: Option<String>,
}

impl FinalDiagnosis {
    /// Build the final record from the consolidated agent bag, substituting
    /// the named default for every key the consolidation model omitted or
    /// mistyped.
    pub fn from_consolidated(consolidated: &AgentOutput, request: &OccurrenceRequest) -> Self {
        let componente = str_field(consolidated, "componente").unwrap_or_else(|| {
            format!("{} — componente não identificado", request.sistema)
        });

        let probabilidade_falha = consolidated
            .get("probabilidade_falha")
            .and_then(Value::as_f64)
            .unwrap_or(0.5);

        let horizonte_dias = consolidated
            .get("horizonte_dias")
            .and_then(Value::as_i64)
            .unwrap_or(15);

        let severidade = str_field(consolidated, "severidade")
            .and_then(|s| s.parse::<Severity>().ok())
            .unwrap_or(request.severidade);

        let sintomas_correlacionados = string_list(consolidated, "sintomas_correlacionados")
            .unwrap_or_else(|| request.sintomas.clone());

        let recomendacao = str_field(consolidated, "recomendacao").unwrap_or_else(|| {
            format!(
                "Realizar inspeção do sistema de {}.",
                request.sistema.to_lowercase()
            )
        });

        let pecas_sugeridas = string_list(consolidated, "pecas_sugeridas").unwrap_or_default();

        let economia_estimada = consolidated
            .get("economia_estimada")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let base_historica = str_field(consolidated, "base_historica")
            .unwrap_or_else(|| "Análise realizada por IA multi-agente".to_string());

        Self {
            componente,
            probabilidade_falha,
            horizonte_dias,
            severidade,
            sintomas_correlacionados,
            recomendacao,
            pecas_sugeridas,
            economia_estimada,
            base_historica,
            modelo_versao: None,
        }
    }
}

fn str_field(bag: &AgentOutput, key: &str) -> Option<String> {
    bag.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(bag: &AgentOutput, key: &str) -> Option<Vec<String>> {
    bag.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> OccurrenceRequest {
        OccurrenceRequest::new(
            1,
            "Freios",
            vec!["ruído metálico".to_string(), "vibração".to_string()],
            "Ruído forte ao frear",
            Severity::Alta,
            250_000.0,
        )
    }

    #[test]
    fn test_empty_bag_takes_every_default() {
        let bag = AgentOutput::new();
        let diag = FinalDiagnosis::from_consolidated(&bag, &sample_request());

        assert_eq!(diag.componente, "Freios — componente não identificado");
        assert_eq!(diag.probabilidade_falha, 0.5);
        assert_eq!(diag.horizonte_dias, 15);
        assert_eq!(diag.severidade, Severity::Alta);
        assert_eq!(
            diag.sintomas_correlacionados,
            vec!["ruído metálico", "vibração"]
        );
        assert_eq!(diag.recomendacao, "Realizar inspeção do sistema de freios.");
        assert!(diag.pecas_sugeridas.is_empty());
        assert_eq!(diag.economia_estimada, 0.0);
        assert_eq!(diag.base_historica, "Análise realizada por IA multi-agente");
        assert!(diag.modelo_versao.is_none());
    }

    #[test]
    fn test_populated_bag_wins_over_defaults() {
        let bag: AgentOutput = serde_json::from_str(
            r#"{
                "componente": "Pastilhas e discos de freio",
                "probabilidade_falha": 0.8,
                "horizonte_dias": 5,
                "severidade": "critica",
                "sintomas_correlacionados": ["ruído metálico"],
                "recomendacao": "Substituição imediata de pastilhas.",
                "pecas_sugeridas": ["Kit pastilhas", "Discos"],
                "economia_estimada": 4200.0,
                "base_historica": "523 casos na frota"
            }"#,
        )
        .unwrap();

        let diag = FinalDiagnosis::from_consolidated(&bag, &sample_request());
        assert_eq!(diag.componente, "Pastilhas e discos de freio");
        assert_eq!(diag.probabilidade_falha, 0.8);
        assert_eq!(diag.horizonte_dias, 5);
        assert_eq!(diag.severidade, Severity::Critica);
        assert_eq!(diag.pecas_sugeridas, vec!["Kit pastilhas", "Discos"]);
        assert_eq!(diag.economia_estimada, 4200.0);
    }

    #[test]
    fn test_mistyped_keys_fall_back_to_defaults() {
        let bag: AgentOutput = serde_json::from_str(
            r#"{
                "componente": 12,
                "probabilidade_falha": "alta",
                "horizonte_dias": "breve",
                "severidade": "urgente",
                "pecas_sugeridas": "nenhuma"
            }"#,
        )
        .unwrap();

        let req = sample_request();
        let diag = FinalDiagnosis::from_consolidated(&bag, &req);
        assert_eq!(diag.componente, "Freios — componente não identificado");
        assert_eq!(diag.probabilidade_falha, 0.5);
        assert_eq!(diag.horizonte_dias, 15);
        assert_eq!(diag.severidade, req.severidade);
        assert!(diag.pecas_sugeridas.is_empty());
    }

    #[test]
    fn test_modelo_versao_omitted_from_json_when_none() {
        let diag = FinalDiagnosis::from_consolidated(&AgentOutput::new(), &sample_request());
        let value = serde_json::to_value(&diag).unwrap();
        assert!(value.get("modelo_versao").is_none());
        assert_eq!(value.as_object().unwrap().len(), 9);
    }
}
