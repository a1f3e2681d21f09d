//! # Severity Scale
//!
//! The five-level severity carried by policies and copied onto violations.
//! Declaration order is the reporting order: `Critical` sorts first, so a
//! plain ascending sort yields CRITICAL → INFO.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::RgovError;

/// Severity of a policy and of the violations it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Must be addressed immediately; typically paired with PREVENT.
    Critical,
    /// Significant exposure.
    High,
    /// Moderate exposure.
    Medium,
    /// Minor exposure.
    Low,
    /// Informational finding.
    Info,
}

impl Severity {
    /// All severities, most severe first.
    pub fn all() -> &'static [Severity] {
        &[
            Self::Critical,
            Self::High,
            Self::Medium,
            Self::Low,
            Self::Info,
        ]
    }

    /// Wire label for this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Info => "INFO",
        }
    }

    /// Reporting rank, 0 for CRITICAL up to 4 for INFO.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Info => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RgovError;

    /// Parse a severity label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "INFO" => Ok(Self::Info),
            _ => Err(RgovError::UnknownSeverity(s.to_string())),
        }
    }
}
