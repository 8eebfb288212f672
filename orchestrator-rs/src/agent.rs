//! Specialist Agent Module
//!
//! One parameterized agent type covers every specialist role in the
//! pipeline: role name, system prompt, temperature and bound tools are
//! configuration, the conversation loop is shared. An agent sends its
//! instruction plus one user message, serves any tool calls the model
//! issues, and extracts a JSON object from the final answer.

use std::time::{Duration, Instant};

use log::{info, warn};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::time::timeout;

use fleet_tools_rs::ToolRegistry;
use fleet_types_rs::AgentOutput;
use llm_client_rs::{
    extract_json_object, ChatCompletionResponse, ChatMessage, LlmClient, LlmError, ToolCall,
    ToolSchema,
};

const DIAGNOSTICIAN_PROMPT: &str = include_str!("../prompts/diagnostician.txt");
const HISTORIAN_PROMPT: &str = include_str!("../prompts/historian.txt");
const PLANNER_PROMPT: &str = include_str!("../prompts/planner.txt");
const FINANCIAL_PROMPT: &str = include_str!("../prompts/financial.txt");
const CONSOLIDATOR_PROMPT: &str = include_str!("../prompts/orchestrator.txt");

/// Agent execution error types
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("{role} timed out after {seconds}s waiting for the model")]
    RoundTimeout { role: &'static str, seconds: u64 },
}

/// A single-role wrapper around one model conversation.
///
/// Tool execution failures are reported back to the model in-band as
/// `{"erro": ...}` observations; only model transport failures and round
/// timeouts surface as [`AgentError`].
pub struct SpecialistAgent<'a> {
    role: &'static str,
    system_prompt: &'static str,
    temperature: f32,
    registry: Option<&'a ToolRegistry>,
    tool_names: &'static [&'static str],
    max_tool_rounds: u32,
    round_timeout: Duration,
}

impl<'a> SpecialistAgent<'a> {
    fn new(
        role: &'static str,
        system_prompt: &'static str,
        temperature: f32,
        registry: Option<&'a ToolRegistry>,
        tool_names: &'static [&'static str],
    ) -> Self {
        Self {
            role,
            system_prompt,
            temperature,
            registry,
            tool_names,
            max_tool_rounds: config_rs::get_agent_max_tool_rounds(),
            round_timeout: config_rs::get_agent_round_timeout(),
        }
    }

    /// Technical diagnosis from symptoms plus measured component health.
    pub fn diagnostician(registry: &'a ToolRegistry) -> Self {
        Self::new(
            "Diagnostician",
            DIAGNOSTICIAN_PROMPT,
            0.2,
            Some(registry),
            &["consultar_saude_componentes"],
        )
    }

    /// Recurrence analysis over the vehicle's and the fleet's history.
    pub fn historian(registry: &'a ToolRegistry) -> Self {
        Self::new(
            "Historian",
            HISTORIAN_PROMPT,
            0.1,
            Some(registry),
            &["consultar_historico_veiculo", "buscar_padroes_frota"],
        )
    }

    /// Intervention planning for high-severity occurrences. No tools.
    pub fn planner() -> Self {
        Self::new("Planner", PLANNER_PROMPT, 0.3, None, &[])
    }

    /// Preventive-versus-corrective cost justification.
    pub fn financial(registry: &'a ToolRegistry) -> Self {
        Self::new(
            "Financial",
            FINANCIAL_PROMPT,
            0.1,
            Some(registry),
            &["calcular_economia"],
        )
    }

    /// Final consolidation of all specialist opinions. No tools.
    pub fn consolidator() -> Self {
        Self::new("Consolidator", CONSOLIDATOR_PROMPT, 0.1, None, &[])
    }

    /// Override the tool-round cap and per-round timeout.
    pub fn with_limits(mut self, max_tool_rounds: u32, round_timeout: Duration) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self.round_timeout = round_timeout;
        self
    }

    pub fn role(&self) -> &'static str {
        self.role
    }

    /// Run the conversation to completion and extract the structured
    /// opinion. An unparseable final answer yields an empty output, not
    /// an error.
    pub async fn run(
        &self,
        client: &LlmClient,
        user_message: String,
    ) -> Result<AgentOutput, AgentError> {
        let start = Instant::now();

        let tools = self.bound_schemas();
        let mut messages = vec![
            ChatMessage::system(self.system_prompt),
            ChatMessage::user(user_message),
        ];

        let mut response = self.call_model(client, messages.clone(), tools.clone()).await?;

        let mut rounds = 0;
        while !response.message().requested_tool_calls().is_empty() {
            rounds += 1;
            if rounds > self.max_tool_rounds {
                warn!(
                    "[{}] limite de {} rodadas de ferramentas atingido, encerrando conversa",
                    self.role, self.max_tool_rounds
                );
                break;
            }

            let assistant = response.message().clone();
            let calls = assistant.requested_tool_calls().to_vec();
            messages.push(assistant);

            for call in &calls {
                let observation = self.serve_tool_call(call).await;
                messages.push(ChatMessage::tool(call.id.clone(), observation));
            }

            response = self.call_model(client, messages.clone(), tools.clone()).await?;
        }

        let output = extract_json_object(response.message().text()).into_map();
        info!("[{}] concluído em {:.1}s", self.role, start.elapsed().as_secs_f64());
        Ok(output)
    }

    /// Schemas for this role's tools only.
    fn bound_schemas(&self) -> Option<Vec<ToolSchema>> {
        let registry = self.registry?;
        let schemas: Vec<ToolSchema> = registry
            .schemas()
            .into_iter()
            .filter(|schema| self.tool_names.contains(&schema.function.name.as_str()))
            .collect();

        if schemas.is_empty() {
            None
        } else {
            Some(schemas)
        }
    }

    async fn call_model(
        &self,
        client: &LlmClient,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolSchema>>,
    ) -> Result<ChatCompletionResponse, AgentError> {
        match timeout(self.round_timeout, client.chat(messages, tools, self.temperature)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AgentError::RoundTimeout {
                role: self.role,
                seconds: self.round_timeout.as_secs(),
            }),
        }
    }

    /// Execute one requested tool call, always producing an observation
    /// string the model can read.
    async fn serve_tool_call(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();

        let args: Map<String, Value> = match serde_json::from_str::<Value>(&call.function.arguments)
        {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!("[{}] argumentos inválidos para {}", self.role, name);
                return json!({ "erro": format!("Argumentos inválidos para {}", name) })
                    .to_string();
            }
        };

        let registry = match self.registry {
            Some(registry) if self.tool_names.contains(&name) => registry,
            _ => {
                warn!("[{}] ferramenta desconhecida solicitada: {}", self.role, name);
                return json!({ "erro": format!("Ferramenta desconhecida: {}", name) })
                    .to_string();
            }
        };

        match registry.execute(name, &args).await {
            Ok(value) => value.to_string(),
            Err(e) => json!({ "erro": e.to_string() }).to_string(),
        }
    }
}
