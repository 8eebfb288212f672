//! Read-only projections of the fleet database rows consumed by the pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Vehicle master record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub placa: String,
    pub modelo: String,
    pub ano: i32,
    pub km_atual: f64,
    pub motor: String,
    pub status: String,
}

/// Component health snapshot for one vehicle component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub nome: String,
    /// Health percentage, 0-100
    pub saude_pct: i64,
    pub ultima_inspecao: Option<NaiveDate>,
}

/// One completed or scheduled maintenance entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// `preventiva`, `preditiva` or `corretiva`
    pub tipo: String,
    pub descricao: Option<String>,
    pub data_realizada: Option<NaiveDate>,
    pub custo: Option<f64>,
    /// Parts list, persisted as a JSON array in the store
    pub pecas: Vec<String>,
}

/// An occurrence joined with its vehicle and any linked diagnosis, as used by
/// the fleet pattern search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: i64,
    pub veiculo_id: i64,
    pub data_ocorrencia: NaiveDate,
    pub sistema: String,
    pub sintomas: Vec<String>,
    pub descricao: Option<String>,
    pub severidade: Severity,
    pub km_ocorrencia: Option<f64>,
    pub status: String,
    pub placa: String,
    pub modelo: String,
    pub componente: Option<String>,
    pub probabilidade_falha: Option<f64>,
    pub recomendacao: Option<String>,
}

/// Aggregate over historical maintenance costs for one maintenance type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostAggregate {
    pub custo_medio: Option<f64>,
    pub total: i64,
}

impl CostAggregate {
    /// Averages over fewer than 2 records are not trusted; callers fall back
    /// to the market estimate table instead.
    pub fn is_trustworthy(&self) -> bool {
        self.total >= 2 && self.custo_medio.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_aggregate_trust_threshold() {
        let none = CostAggregate {
            custo_medio: None,
            total: 0,
        };
        let single = CostAggregate {
            custo_medio: Some(1200.0),
            total: 1,
        };
        let enough = CostAggregate {
            custo_medio: Some(1450.0),
            total: 2,
        };

        assert!(!none.is_trustworthy());
        assert!(!single.is_trustworthy());
        assert!(enough.is_trustworthy());
    }
}
