//! Diagnostic tools for the FleetPred agents.
//!
//! Four read-only functions over the fleet database, exposed to the
//! language model as callable tools:
//! - consultar_historico_veiculo
//! - buscar_padroes_frota
//! - consultar_saude_componentes
//! - calcular_economia

pub mod registry;
pub mod tools;

pub use registry::{FleetTool, ParameterDefinition, ToolDefinition, ToolError, ToolRegistry};
pub use tools::register_fleet_tools;
