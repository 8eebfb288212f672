//! config-rs/lib.rs
//! Shared configuration utilities for consistent pipeline configuration
//! Provides standardized environment-variable access with typed defaults

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Read an environment variable and parse it into `T`, falling back to the
/// provided default when the variable is unset or malformed.
///
/// # Arguments
/// * `name` - The environment variable name
/// * `default` - The value to use when the variable is unset or unparsable
///
/// # Returns
/// The parsed value, or `default`
pub fn get_env_var<T: FromStr>(name: &str, default: T) -> T
where
    T: std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value in {}, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

/// Read a string environment variable with a default.
pub fn get_env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Path of the fleet SQLite database file.
///
/// Override with `FLEET_DB_PATH`; defaults to `fleetpred.db` in the working
/// directory.
pub fn get_database_path() -> String {
    get_env_string("FLEET_DB_PATH", "fleetpred.db")
}

/// API key for the generative model provider.
///
/// `GEMINI_API_KEY` takes precedence; `LLM_API_KEY` is accepted as a generic
/// fallback so the client can point at any OpenAI-compatible endpoint.
pub fn get_llm_api_key() -> Option<String> {
    env::var("GEMINI_API_KEY")
        .or_else(|_| env::var("LLM_API_KEY"))
        .ok()
        .filter(|key| !key.is_empty())
}

/// Model identifier sent with every chat completion request.
pub fn get_llm_model() -> String {
    get_env_string("LLM_MODEL", "gemini-2.5-flash")
}

/// Chat-completions endpoint URL.
///
/// Defaults to the Gemini OpenAI-compatibility endpoint; any
/// OpenAI-compatible URL works (`LLM_API_URL`).
pub fn get_llm_api_url() -> String {
    get_env_string(
        "LLM_API_URL",
        "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
    )
}

/// Per-request HTTP timeout for the model client.
pub fn get_llm_request_timeout() -> Duration {
    Duration::from_secs(get_env_var("LLM_REQUEST_TIMEOUT_SECS", 60u64))
}

/// Maximum retry attempts for retryable model-client errors.
pub fn get_llm_max_retries() -> u32 {
    get_env_var("LLM_MAX_RETRIES", 3u32)
}

/// Initial backoff delay between model-client retries, in milliseconds.
pub fn get_llm_initial_retry_delay_ms() -> u64 {
    get_env_var("LLM_INITIAL_RETRY_DELAY_MS", 1000u64)
}

/// Maximum backoff delay between model-client retries, in milliseconds.
pub fn get_llm_max_retry_delay_ms() -> u64 {
    get_env_var("LLM_MAX_RETRY_DELAY_MS", 30000u64)
}

/// Hard cap on tool-calling round trips per specialist agent run, counted
/// after the opening model call.
pub fn get_agent_max_tool_rounds() -> u32 {
    get_env_var("AGENT_MAX_TOOL_ROUNDS", 5u32)
}

/// Wall-clock budget for a single model round inside an agent's tool loop.
pub fn get_agent_round_timeout() -> Duration {
    Duration::from_secs(get_env_var("AGENT_ROUND_TIMEOUT_SECS", 45u64))
}
