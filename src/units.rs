//! Turnover units
//!
//! Exchange feeds report turnover in different magnitudes (the full bhavcopy
//! uses lakhs, other sources use plain rupees). Each source declares its unit
//! when it ingests; everything stored and scored is in rupees.

use serde::{Deserialize, Serialize};

/// 1 lakh = 100,000 rupees
pub const LAKH: f64 = 100_000.0;

/// 1 crore = 10,000,000 rupees
pub const CRORE: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnoverUnit {
    Rupees,
    Lakhs,
    Crores,
}

impl TurnoverUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnoverUnit::Rupees => "rupees",
            TurnoverUnit::Lakhs => "lakhs",
            TurnoverUnit::Crores => "crores",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rupees" | "inr" => Some(TurnoverUnit::Rupees),
            "lakhs" | "lacs" | "lakh" => Some(TurnoverUnit::Lakhs),
            "crores" | "crore" | "cr" => Some(TurnoverUnit::Crores),
            _ => None,
        }
    }

    /// Convert a value reported in this unit to rupees
    pub fn to_rupees(&self, value: f64) -> f64 {
        match self {
            TurnoverUnit::Rupees => value,
            TurnoverUnit::Lakhs => value * LAKH,
            TurnoverUnit::Crores => value * CRORE,
        }
    }
}
