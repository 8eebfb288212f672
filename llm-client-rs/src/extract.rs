//! Best-effort JSON extraction from model output
//!
//! Models are asked to answer with a single JSON object but routinely wrap
//! it in code fences or prose. Extraction is two-stage: direct parse of the
//! fence-stripped text, then a parse of the widest `{...}` window. Anything
//! else yields [`Extraction::Empty`] - extraction never fails.

use serde_json::{Map, Value};

/// Tagged result of extracting a JSON object from model text.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A top-level JSON object was recovered
    Object(Map<String, Value>),
    /// No parseable object in the text
    Empty,
}

impl Extraction {
    /// Collapse into a key-value bag; `Empty` becomes an empty map.
    pub fn into_map(self) -> Map<String, Value> {
        match self {
            Extraction::Object(map) => map,
            Extraction::Empty => Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Extraction::Empty)
    }
}

/// Extract the JSON object from a model response.
///
/// Only top-level objects count; scalars and arrays are treated as absent.
pub fn extract_json_object(text: &str) -> Extraction {
    let candidate = strip_code_fences(text);

    if let Some(map) = parse_object(candidate) {
        return Extraction::Object(map);
    }

    // Widest brace window: first '{' through last '}'. Mirrors a greedy
    // multi-line scan, so stray text between two objects defeats it.
    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            if let Some(map) = parse_object(&candidate[start..=end]) {
                return Extraction::Object(map);
            }
        }
    }

    Extraction::Empty
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Strip one enclosing fence pair, tolerating an info string (```json).
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };

    let body = rest[newline + 1..].trim_end();
    body.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}
