// Read-only access to the fleet maintenance database.
//
// Every query the diagnostic tools need goes through the `FleetStore`
// trait. The production backend opens the SQLite file written by the
// fleet management system; the in-memory backend exists for tests and
// for running the pipeline without a database file.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::RwLock;

use fleet_types_rs::{
    ComponentHealth, CostAggregate, MaintenanceRecord, Occurrence, Severity, Vehicle,
};

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// Read-only queries over the fleet database.
///
/// All methods take `&self` and never mutate the underlying store; the
/// diagnostic pipeline only ever observes fleet state.
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Fetch a vehicle by id.
    async fn get_vehicle(&self, veiculo_id: i64) -> Result<Option<Vehicle>, StoreError>;

    /// Component health for a vehicle, worst health first.
    async fn component_health(&self, veiculo_id: i64)
        -> Result<Vec<ComponentHealth>, StoreError>;

    /// Most recent maintenance records for a vehicle, newest first.
    async fn maintenance_history(
        &self,
        veiculo_id: i64,
        limit: u32,
    ) -> Result<Vec<MaintenanceRecord>, StoreError>;

    /// All occurrences registered for a system across the whole fleet,
    /// newest first, with vehicle identification and any linked
    /// diagnosis attached.
    async fn occurrences_by_system(&self, sistema: &str) -> Result<Vec<Occurrence>, StoreError>;

    /// Average cost and sample size of past maintenance of a given type
    /// whose description mentions the system.
    async fn cost_aggregate(
        &self,
        tipo: &str,
        sistema: &str,
    ) -> Result<CostAggregate, StoreError>;

    /// Check that the backend can serve queries.
    async fn health_check(&self) -> bool;
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Backend over the SQLite file maintained by the fleet system.
///
/// The pool holds a single connection and the file is opened read-only;
/// each pipeline run builds its own store so runs never share
/// connection state.
pub struct SqliteFleetStore {
    pool: SqlitePool,
}

impl SqliteFleetStore {
    pub async fn connect(database_path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!(
                    "cannot open fleet database at {}: {}",
                    database_path, e
                ))
            })?;

        log::info!("Fleet store connected (sqlite at {})", database_path);
        Ok(Self { pool })
    }

    fn parse_severity(raw: &str) -> Result<Severity, StoreError> {
        raw.parse::<Severity>()
            .map_err(|e| StoreError::InvalidValue(e.to_string()))
    }

    /// Part lists and symptom lists are stored as JSON text columns.
    fn parse_string_list(raw: Option<String>) -> Vec<String> {
        raw.and_then(|text| serde_json::from_str::<Vec<String>>(&text).ok())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FleetStore for SqliteFleetStore {
    async fn get_vehicle(&self, veiculo_id: i64) -> Result<Option<Vehicle>, StoreError> {
        let row = sqlx::query(
            "SELECT id, placa, modelo, ano, km_atual, motor, status
             FROM veiculos WHERE id = ?",
        )
        .bind(veiculo_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Vehicle {
                id: row.try_get("id")?,
                placa: row.try_get("placa")?,
                modelo: row.try_get("modelo")?,
                ano: row.try_get("ano")?,
                km_atual: row.try_get("km_atual")?,
                motor: row.try_get("motor")?,
                status: row.try_get("status")?,
            })),
            None => Ok(None),
        }
    }

    async fn component_health(
        &self,
        veiculo_id: i64,
    ) -> Result<Vec<ComponentHealth>, StoreError> {
        let rows = sqlx::query(
            "SELECT nome, saude_pct, ultima_inspecao
             FROM componentes
             WHERE veiculo_id = ?
             ORDER BY saude_pct ASC",
        )
        .bind(veiculo_id)
        .fetch_all(&self.pool)
        .await?;

        let mut components = Vec::with_capacity(rows.len());
        for row in rows {
            components.push(ComponentHealth {
                nome: row.try_get("nome")?,
                saude_pct: row.try_get("saude_pct")?,
                ultima_inspecao: row.try_get::<Option<NaiveDate>, _>("ultima_inspecao")?,
            });
        }
        Ok(components)
    }

    async fn maintenance_history(
        &self,
        veiculo_id: i64,
        limit: u32,
    ) -> Result<Vec<MaintenanceRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT tipo, descricao, data_realizada, custo, pecas
             FROM manutencoes
             WHERE veiculo_id = ?
             ORDER BY data_realizada DESC
             LIMIT ?",
        )
        .bind(veiculo_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(MaintenanceRecord {
                tipo: row.try_get("tipo")?,
                descricao: row.try_get("descricao")?,
                data_realizada: row.try_get::<Option<NaiveDate>, _>("data_realizada")?,
                custo: row.try_get("custo")?,
                pecas: Self::parse_string_list(row.try_get("pecas")?),
            });
        }
        Ok(records)
    }

    async fn occurrences_by_system(&self, sistema: &str) -> Result<Vec<Occurrence>, StoreError> {
        let rows = sqlx::query(
            "SELECT o.id, o.veiculo_id, o.data_ocorrencia, o.sistema, o.sintomas,
                    o.descricao, o.severidade, o.km_ocorrencia, o.status,
                    v.placa, v.modelo,
                    d.componente, d.probabilidade_falha, d.recomendacao
             FROM ocorrencias o
             JOIN veiculos v ON v.id = o.veiculo_id
             LEFT JOIN diagnosticos d ON d.ocorrencia_id = o.id
             WHERE o.sistema = ?
             ORDER BY o.data_ocorrencia DESC",
        )
        .bind(sistema)
        .fetch_all(&self.pool)
        .await?;

        let mut occurrences = Vec::with_capacity(rows.len());
        for row in rows {
            let severidade: String = row.try_get("severidade")?;
            occurrences.push(Occurrence {
                id: row.try_get("id")?,
                veiculo_id: row.try_get("veiculo_id")?,
                data_ocorrencia: row.try_get("data_ocorrencia")?,
                sistema: row.try_get("sistema")?,
                sintomas: Self::parse_string_list(row.try_get("sintomas")?),
                descricao: row.try_get("descricao")?,
                severidade: Self::parse_severity(&severidade)?,
                km_ocorrencia: row.try_get("km_ocorrencia")?,
                status: row.try_get("status")?,
                placa: row.try_get("placa")?,
                modelo: row.try_get("modelo")?,
                componente: row.try_get("componente")?,
                probabilidade_falha: row.try_get("probabilidade_falha")?,
                recomendacao: row.try_get("recomendacao")?,
            });
        }
        Ok(occurrences)
    }

    async fn cost_aggregate(
        &self,
        tipo: &str,
        sistema: &str,
    ) -> Result<CostAggregate, StoreError> {
        let row = sqlx::query(
            "SELECT AVG(m.custo) AS custo_medio, COUNT(*) AS total
             FROM manutencoes m
             JOIN veiculos v ON v.id = m.veiculo_id
             WHERE m.tipo = ? AND m.custo IS NOT NULL AND m.descricao LIKE ?",
        )
        .bind(tipo)
        .bind(format!("%{}%", sistema))
        .fetch_one(&self.pool)
        .await?;

        Ok(CostAggregate {
            custo_medio: row.try_get("custo_medio")?,
            total: row.try_get("total")?,
        })
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
struct FleetData {
    vehicles: HashMap<i64, Vehicle>,
    components: HashMap<i64, Vec<ComponentHealth>>,
    maintenance: HashMap<i64, Vec<MaintenanceRecord>>,
    occurrences: Vec<Occurrence>,
}

/// In-memory backend for tests and database-less runs.
pub struct InMemoryFleetStore {
    data: Arc<RwLock<FleetData>>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(FleetData::default())),
        }
    }

    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        let mut data = self.data.write().await;
        data.vehicles.insert(vehicle.id, vehicle);
    }

    pub async fn insert_component(&self, veiculo_id: i64, component: ComponentHealth) {
        let mut data = self.data.write().await;
        data.components.entry(veiculo_id).or_default().push(component);
    }

    pub async fn insert_maintenance(&self, veiculo_id: i64, record: MaintenanceRecord) {
        let mut data = self.data.write().await;
        data.maintenance.entry(veiculo_id).or_default().push(record);
    }

    pub async fn insert_occurrence(&self, occurrence: Occurrence) {
        let mut data = self.data.write().await;
        data.occurrences.push(occurrence);
    }
}

impl Default for InMemoryFleetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn get_vehicle(&self, veiculo_id: i64) -> Result<Option<Vehicle>, StoreError> {
        let data = self.data.read().await;
        Ok(data.vehicles.get(&veiculo_id).cloned())
    }

    async fn component_health(
        &self,
        veiculo_id: i64,
    ) -> Result<Vec<ComponentHealth>, StoreError> {
        let data = self.data.read().await;
        let mut components = data
            .components
            .get(&veiculo_id)
            .cloned()
            .unwrap_or_default();
        components.sort_by_key(|c| c.saude_pct);
        Ok(components)
    }

    async fn maintenance_history(
        &self,
        veiculo_id: i64,
        limit: u32,
    ) -> Result<Vec<MaintenanceRecord>, StoreError> {
        let data = self.data.read().await;
        let mut records = data
            .maintenance
            .get(&veiculo_id)
            .cloned()
            .unwrap_or_default();
        // Newest first, undated records last, like the SQL ORDER BY DESC.
        records.sort_by(|a, b| b.data_realizada.cmp(&a.data_realizada));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn occurrences_by_system(&self, sistema: &str) -> Result<Vec<Occurrence>, StoreError> {
        let data = self.data.read().await;
        let mut matches: Vec<Occurrence> = data
            .occurrences
            .iter()
            .filter(|o| o.sistema == sistema)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.data_ocorrencia.cmp(&a.data_ocorrencia));
        Ok(matches)
    }

    async fn cost_aggregate(
        &self,
        tipo: &str,
        sistema: &str,
    ) -> Result<CostAggregate, StoreError> {
        let data = self.data.read().await;
        // ASCII-only fold, like SQLite LIKE: accented letters stay
        // case-sensitive on both backends.
        let needle = sistema.to_ascii_lowercase();
        let costs: Vec<f64> = data
            .maintenance
            .values()
            .flatten()
            .filter(|m| m.tipo == tipo)
            .filter(|m| {
                m.descricao
                    .as_deref()
                    .map(|d| d.to_ascii_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .filter_map(|m| m.custo)
            .collect();

        let total = costs.len() as i64;
        let custo_medio = if total > 0 {
            Some(costs.iter().sum::<f64>() / total as f64)
        } else {
            None
        };
        Ok(CostAggregate { custo_medio, total })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Storage backend selection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// "sqlite" or "memory".
    pub backend_type: String,
    /// Path to the SQLite file; defaults to the configured fleet
    /// database path when absent.
    pub database_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend_type: "sqlite".to_string(),
            database_path: None,
        }
    }
}

/// Build a store from configuration.
pub async fn create_fleet_store(config: &StoreConfig) -> Result<Arc<dyn FleetStore>, StoreError> {
    match config.backend_type.as_str() {
        "memory" => {
            log::info!("Using in-memory fleet store");
            Ok(Arc::new(InMemoryFleetStore::new()))
        }
        "sqlite" => {
            let path = config
                .database_path
                .clone()
                .unwrap_or_else(config_rs::get_database_path);
            let store = SqliteFleetStore::connect(&path).await?;
            Ok(Arc::new(store))
        }
        other => Err(StoreError::Unavailable(format!(
            "unknown storage backend: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(id: i64) -> Vehicle {
        Vehicle {
            id,
            placa: format!("ABC-{:04}", id),
            modelo: "Volvo FH 540".to_string(),
            ano: 2020,
            km_atual: 250_000.0,
            motor: "D13".to_string(),
            status: "ativo".to_string(),
        }
    }

    fn component(nome: &str, saude_pct: i64) -> ComponentHealth {
        ComponentHealth {
            nome: nome.to_string(),
            saude_pct,
            ultima_inspecao: NaiveDate::from_ymd_opt(2025, 10, 1),
        }
    }

    fn maintenance(tipo: &str, descricao: &str, custo: f64, date: (i32, u32, u32)) -> MaintenanceRecord {
        MaintenanceRecord {
            tipo: tipo.to_string(),
            descricao: Some(descricao.to_string()),
            data_realizada: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            custo: Some(custo),
            pecas: vec!["filtro".to_string()],
        }
    }

    fn occurrence(id: i64, sistema: &str, date: (i32, u32, u32)) -> Occurrence {
        Occurrence {
            id,
            veiculo_id: 1,
            data_ocorrencia: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            sistema: sistema.to_string(),
            sintomas: vec!["ruído".to_string()],
            descricao: Some("Relato do motorista".to_string()),
            severidade: Severity::Media,
            km_ocorrencia: Some(240_000.0),
            status: "aberta".to_string(),
            placa: "ABC-0001".to_string(),
            modelo: "Volvo FH 540".to_string(),
            componente: None,
            probabilidade_falha: None,
            recomendacao: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_vehicle_lookup() {
        let store = InMemoryFleetStore::new();
        store.insert_vehicle(vehicle(1)).await;

        let found = store.get_vehicle(1).await.unwrap();
        assert_eq!(found.unwrap().placa, "ABC-0001");
        assert!(store.get_vehicle(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_components_sorted_by_health() {
        let store = InMemoryFleetStore::new();
        store.insert_component(1, component("Bateria", 85)).await;
        store.insert_component(1, component("Pastilhas de freio", 40)).await;
        store.insert_component(1, component("Radiador", 62)).await;

        let components = store.component_health(1).await.unwrap();
        let healths: Vec<i64> = components.iter().map(|c| c.saude_pct).collect();
        assert_eq!(healths, vec![40, 62, 85]);
    }

    #[tokio::test]
    async fn test_in_memory_maintenance_newest_first_with_limit() {
        let store = InMemoryFleetStore::new();
        store
            .insert_maintenance(1, maintenance("preventiva", "Revisão geral", 1200.0, (2025, 1, 10)))
            .await;
        store
            .insert_maintenance(1, maintenance("corretiva", "Troca de freios", 2800.0, (2025, 6, 2)))
            .await;
        store
            .insert_maintenance(1, maintenance("preventiva", "Troca de óleo", 600.0, (2024, 11, 20)))
            .await;

        let records = store.maintenance_history(1, 2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].descricao.as_deref(), Some("Troca de freios"));
        assert_eq!(records[1].descricao.as_deref(), Some("Revisão geral"));
    }

    #[tokio::test]
    async fn test_in_memory_occurrences_filtered_by_system() {
        let store = InMemoryFleetStore::new();
        store.insert_occurrence(occurrence(1, "Motor", (2025, 3, 1))).await;
        store.insert_occurrence(occurrence(2, "Freios", (2025, 4, 1))).await;
        store.insert_occurrence(occurrence(3, "Motor", (2025, 5, 1))).await;

        let motor = store.occurrences_by_system("Motor").await.unwrap();
        assert_eq!(motor.len(), 2);
        assert_eq!(motor[0].id, 3);
        assert_eq!(motor[1].id, 1);
        assert!(store.occurrences_by_system("Suspensão").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_cost_aggregate_matches_type_and_system() {
        let store = InMemoryFleetStore::new();
        store
            .insert_maintenance(1, maintenance("corretiva", "Reparo no sistema de freios", 3000.0, (2025, 1, 5)))
            .await;
        store
            .insert_maintenance(2, maintenance("corretiva", "Troca de pastilhas de freios", 2000.0, (2025, 2, 5)))
            .await;
        store
            .insert_maintenance(3, maintenance("preventiva", "Revisão de freios", 900.0, (2025, 3, 5)))
            .await;

        let aggregate = store.cost_aggregate("corretiva", "Freios").await.unwrap();
        assert_eq!(aggregate.total, 2);
        assert_eq!(aggregate.custo_medio, Some(2500.0));
        assert!(aggregate.is_trustworthy());

        let missing = store.cost_aggregate("corretiva", "Transmissão").await.unwrap();
        assert_eq!(missing.total, 0);
        assert!(missing.custo_medio.is_none());
        assert!(!missing.is_trustworthy());
    }

    #[tokio::test]
    async fn test_in_memory_cost_aggregate_folds_ascii_case_only() {
        let store = InMemoryFleetStore::new();
        store
            .insert_maintenance(1, maintenance("corretiva", "Reparo na TRANSMISSÃO", 7000.0, (2025, 4, 5)))
            .await;
        store
            .insert_maintenance(2, maintenance("corretiva", "Ajuste da transmissão", 5000.0, (2025, 5, 5)))
            .await;

        // SQLite LIKE treats the upper-case Ã as a different letter, so
        // only the second record matches.
        let aggregate = store.cost_aggregate("corretiva", "Transmissão").await.unwrap();
        assert_eq!(aggregate.total, 1);
        assert_eq!(aggregate.custo_medio, Some(5000.0));
    }

    #[tokio::test]
    async fn test_create_fleet_store_memory_backend() {
        let config = StoreConfig {
            backend_type: "memory".to_string(),
            database_path: None,
        };
        let store = create_fleet_store(&config).await.unwrap();
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_create_fleet_store_rejects_unknown_backend() {
        let config = StoreConfig {
            backend_type: "cassandra".to_string(),
            database_path: None,
        };
        assert!(create_fleet_store(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet-test.db");
        let path_str = path.to_str().unwrap().to_string();

        // Populate a database the way the fleet system would.
        let setup = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true),
            )
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE veiculos (
                 id INTEGER PRIMARY KEY,
                 placa TEXT NOT NULL,
                 modelo TEXT NOT NULL,
                 ano INTEGER NOT NULL,
                 km_atual REAL NOT NULL,
                 motor TEXT NOT NULL,
                 status TEXT NOT NULL
             )",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE componentes (
                 id INTEGER PRIMARY KEY,
                 veiculo_id INTEGER NOT NULL,
                 nome TEXT NOT NULL,
                 saude_pct INTEGER NOT NULL,
                 ultima_inspecao TEXT
             )",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE manutencoes (
                 id INTEGER PRIMARY KEY,
                 veiculo_id INTEGER NOT NULL,
                 tipo TEXT NOT NULL,
                 descricao TEXT,
                 data_realizada TEXT,
                 custo REAL,
                 pecas TEXT
             )",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE ocorrencias (
                 id INTEGER PRIMARY KEY,
                 veiculo_id INTEGER NOT NULL,
                 data_ocorrencia TEXT NOT NULL,
                 sistema TEXT NOT NULL,
                 sintomas TEXT,
                 descricao TEXT,
                 severidade TEXT NOT NULL,
                 km_ocorrencia REAL,
                 status TEXT NOT NULL
             )",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE diagnosticos (
                 id INTEGER PRIMARY KEY,
                 ocorrencia_id INTEGER NOT NULL,
                 componente TEXT,
                 probabilidade_falha REAL,
                 recomendacao TEXT
             )",
        )
        .execute(&setup)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO veiculos (id, placa, modelo, ano, km_atual, motor, status)
             VALUES (1, 'RTA-2B41', 'Scania R450', 2019, 310000.0, 'DC13', 'ativo')",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO componentes (veiculo_id, nome, saude_pct, ultima_inspecao)
             VALUES (1, 'Turbina', 55, '2025-09-12'), (1, 'Alternador', 80, NULL)",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO manutencoes (veiculo_id, tipo, descricao, data_realizada, custo, pecas)
             VALUES (1, 'corretiva', 'Reparo no motor', '2025-05-20', 4200.0, '[\"turbina\"]'),
                    (1, 'corretiva', 'Retífica do motor', '2025-07-02', 9100.0, '[]')",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO ocorrencias (id, veiculo_id, data_ocorrencia, sistema, sintomas,
                                      descricao, severidade, km_ocorrencia, status)
             VALUES (7, 1, '2025-06-15', 'Motor', '[\"fumaça azul\"]',
                     'Fumaça ao acelerar', 'alta', 305000.0, 'resolvida')",
        )
        .execute(&setup)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO diagnosticos (ocorrencia_id, componente, probabilidade_falha, recomendacao)
             VALUES (7, 'Turbocompressor', 0.82, 'Substituir turbina')",
        )
        .execute(&setup)
        .await
        .unwrap();
        setup.close().await;

        let store = SqliteFleetStore::connect(&path_str).await.unwrap();
        assert!(store.health_check().await);

        let vehicle = store.get_vehicle(1).await.unwrap().unwrap();
        assert_eq!(vehicle.placa, "RTA-2B41");
        assert_eq!(vehicle.ano, 2019);

        let components = store.component_health(1).await.unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].nome, "Turbina");
        assert!(components[1].ultima_inspecao.is_none());

        let records = store.maintenance_history(1, 10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].descricao.as_deref(), Some("Retífica do motor"));
        assert_eq!(records[0].pecas, Vec::<String>::new());
        assert_eq!(records[1].pecas, vec!["turbina".to_string()]);

        let occurrences = store.occurrences_by_system("Motor").await.unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].severidade, Severity::Alta);
        assert_eq!(occurrences[0].componente.as_deref(), Some("Turbocompressor"));
        assert_eq!(occurrences[0].probabilidade_falha, Some(0.82));

        let aggregate = store.cost_aggregate("corretiva", "motor").await.unwrap();
        assert_eq!(aggregate.total, 2);
        assert_eq!(aggregate.custo_medio, Some(6650.0));
    }
}
