//! Job code to role classification.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// Lookup Table
// ============================================================================

const TANK_JOBS: &[&str] = &["PLD", "GLA", "WAR", "MRD", "DRK", "GNB"];

const HEAL_JOBS: &[&str] = &["WHM", "CNJ", "SCH", "AST", "SGE"];

const DPS_JOBS: &[&str] = &[
    "MNK", "PGL", "DRG", "LNC", "NIN", "ROG", "SAM", "RPR", "VPR", "BRD", "ARC", "MCH", "DNC",
    "BLM", "THM", "SMN", "ACN", "RDM", "PCT", "BLU",
];

// ============================================================================
// JobRole
// ============================================================================

/// Party role derived from a job code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobRole {
    Dps,
    Heal,
    Tank,
    /// Crafters, gatherers and unknown codes.
    Others,
}

impl JobRole {
    /// Classifies a three-to-four letter job code, ignoring case.
    #[must_use]
    pub fn from_job(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        let code = code.as_str();

        if TANK_JOBS.contains(&code) {
            Self::Tank
        } else if HEAL_JOBS.contains(&code) {
            Self::Heal
        } else if DPS_JOBS.contains(&code) {
            Self::Dps
        } else {
            Self::Others
        }
    }

    /// Returns the lowercase category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dps => "dps",
            Self::Heal => "heal",
            Self::Tank => "tank",
            Self::Others => "others",
        }
    }
}

impl fmt::Display for JobRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
