//! Tool Registry Module
//!
//! Central registry for the diagnostic tools an agent may call during a
//! pipeline run. Holds tool definitions, generates the function schemas
//! sent to the language model, and dispatches calls by name.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use llm_client_rs::ToolSchema;

/// Tool parameter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Parameter name
    pub name: String,
    /// Parameter description shown to the model
    pub description: String,
    /// Whether the parameter is required
    pub required: bool,
    /// JSON schema type (string, integer, array, ...)
    pub param_type: String,
    /// Default value, if any
    pub default: Option<Value>,
}

/// Tool definition: identity plus the parameters it accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name the model uses to call the tool
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// Accepted parameters
    pub parameters: Vec<ParameterDefinition>,
}

impl ToolDefinition {
    /// Render the definition as an OpenAI-style function schema.
    pub fn schema(&self) -> ToolSchema {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".to_string(), json!(param.param_type));
            property.insert("description".to_string(), json!(param.description));
            if param.param_type == "array" {
                property.insert("items".to_string(), json!({ "type": "string" }));
            }
            if let Some(default) = &param.default {
                property.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(property));

            if param.required {
                required.push(json!(param.name));
            }
        }

        ToolSchema::function(
            &self.name,
            &self.description,
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }
}

/// Tool registry error types
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Tool already exists: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Tool interface trait
///
/// Execution never fails at this boundary for data reasons: tools that
/// hit a missing vehicle or a storage problem report it in-band as an
/// `{"erro": ...}` object so the model can react to it. `ToolError` is
/// reserved for malformed calls.
#[async_trait]
pub trait FleetTool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with the arguments supplied by the model
    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError>;
}

/// Registry of the tools available to one pipeline run.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn FleetTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool under its definition name.
    pub fn register(&self, tool: Arc<dyn FleetTool>) -> Result<(), ToolError> {
        let name = tool.definition().name.clone();
        let mut tools = self.tools.write().unwrap();

        if tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }

        tools.insert(name.clone(), tool);
        debug!("Tool {} registered", name);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn FleetTool>, ToolError> {
        let tools = self.tools.read().unwrap();
        match tools.get(name) {
            Some(tool) => Ok(tool.clone()),
            None => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// Function schemas for every registered tool, for the model request.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let tools = self.tools.read().unwrap();
        let mut schemas: Vec<ToolSchema> = tools
            .values()
            .map(|tool| tool.definition().schema())
            .collect();
        schemas.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        schemas
    }

    /// Names of the registered tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let tools = self.tools.read().unwrap();
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute a tool by name, timing the call.
    pub async fn execute(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let tool = self.get(name)?;

        let start_time = Instant::now();
        let result = tool.execute(args).await;
        let duration_ms = start_time.elapsed().as_millis();

        match &result {
            Ok(_) => info!("Tool {} executed in {}ms", name, duration_ms),
            Err(e) => info!("Tool {} rejected call after {}ms: {}", name, duration_ms, e),
        }
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        definition: ToolDefinition,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                definition: ToolDefinition {
                    name: "echo".to_string(),
                    description: "Repeats its input".to_string(),
                    parameters: vec![
                        ParameterDefinition {
                            name: "texto".to_string(),
                            description: "Text to repeat".to_string(),
                            required: true,
                            param_type: "string".to_string(),
                            default: None,
                        },
                        ParameterDefinition {
                            name: "vezes".to_string(),
                            description: "Repetitions".to_string(),
                            required: false,
                            param_type: "integer".to_string(),
                            default: Some(json!(1)),
                        },
                    ],
                },
            }
        }
    }

    #[async_trait]
    impl FleetTool for EchoTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
            let texto = args
                .get("texto")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArguments {
                    tool: "echo".to_string(),
                    reason: "texto must be a string".to_string(),
                })?;
            Ok(json!({ "texto": texto }))
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).unwrap();

        let mut args = Map::new();
        args.insert("texto".to_string(), json!("oi"));

        let result = registry.execute("echo", &args).await.unwrap();
        assert_eq!(result, json!({ "texto": "oi" }));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).unwrap();

        let result = registry.register(Arc::new(EchoTool::new()));
        assert!(matches!(result, Err(ToolError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nao_existe", &Map::new()).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }

    #[test]
    fn test_schema_generation() {
        let tool = EchoTool::new();
        let schema = tool.definition().schema();

        assert_eq!(schema.function.name, "echo");
        let params = &schema.function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["texto"]["type"], "string");
        assert_eq!(params["properties"]["vezes"]["default"], 1);
        assert_eq!(params["required"], json!(["texto"]));
    }

    #[test]
    fn test_invalid_argument_reporting() {
        let err = ToolError::InvalidArguments {
            tool: "echo".to_string(),
            reason: "texto must be a string".to_string(),
        };
        assert!(err.to_string().contains("echo"));
        assert!(err.to_string().contains("texto"));
    }
}
