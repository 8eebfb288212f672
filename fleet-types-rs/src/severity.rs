//! Occurrence severity levels
//!
//! Wire representation uses the lowercase Portuguese labels persisted by the
//! fleet database (`baixa`, `media`, `alta`, `critica`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity of a reported occurrence, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Baixa,
    Media,
    Alta,
    Critica,
}

#[derive(Debug, Error)]
#[error("Invalid severity label: {0}")]
pub struct ParseSeverityError(pub String);

impl Severity {
    /// Wire label as stored in the occurrence record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Baixa => "baixa",
            Severity::Media => "media",
            Severity::Alta => "alta",
            Severity::Critica => "critica",
        }
    }

    /// High-severity occurrences get the full planning + financial treatment
    /// before consolidation; lower severities skip straight to consolidation.
    pub fn requires_planning(&self) -> bool {
        matches!(self, Severity::Alta | Severity::Critica)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixa" => Ok(Severity::Baixa),
            "media" => Ok(Severity::Media),
            "alta" => Ok(Severity::Alta),
            "critica" => Ok(Severity::Critica),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}
