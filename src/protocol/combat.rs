//! Typed records for the raw `CombatData` broadcast.
//!
//! The host sends nearly every statistic as a string, occasionally as a
//! number, and omits fields freely. Every field here decodes leniently:
//! strings, numbers, booleans and `null` all become text, and a missing
//! field becomes empty. Nothing in a combat payload fails decoding unless
//! the top level is not an object.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "CombatData",
//!   "isActive": "true",
//!   "Encounter": { "title": "Striking Dummy", "ENCDPS": "1234.56", ... },
//!   "Combatant": {
//!     "YOU": { "name": "YOU", "Job": "Blm", "maxhit": "Fire IV-24011", ... }
//!   }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// RawCombatData
// ============================================================================

/// Top-level `CombatData` message as sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawCombatData {
    /// `"true"` while an encounter is in progress.
    #[serde(rename = "isActive", deserialize_with = "lenient_string")]
    pub is_active: String,

    /// Encounter-level aggregates.
    #[serde(rename = "Encounter", deserialize_with = "null_as_default")]
    pub encounter: RawEncounter,

    /// Combatants keyed by name.
    #[serde(rename = "Combatant", deserialize_with = "null_as_default")]
    pub combatants: BTreeMap<String, RawCombatant>,
}

impl RawCombatData {
    /// Decodes a `CombatData` value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if `value` is not an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }
}

// ============================================================================
// RawEncounter
// ============================================================================

/// Encounter statistics, all as host-formatted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawEncounter {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(rename = "CurrentZoneName", deserialize_with = "lenient_string")]
    pub current_zone_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub duration: String,
    #[serde(rename = "DURATION", deserialize_with = "lenient_string")]
    pub duration_secs: String,
    #[serde(deserialize_with = "lenient_string")]
    pub damage: String,
    #[serde(deserialize_with = "lenient_string")]
    pub healed: String,
    #[serde(deserialize_with = "lenient_string")]
    pub encdps: String,
    #[serde(deserialize_with = "lenient_string")]
    pub enchps: String,
    #[serde(rename = "ENCDPS", deserialize_with = "lenient_string")]
    pub encdps_rounded: String,
    #[serde(rename = "ENCHPS", deserialize_with = "lenient_string")]
    pub enchps_rounded: String,
    #[serde(rename = "Last10DPS", deserialize_with = "lenient_string")]
    pub last10_dps: String,
    #[serde(rename = "Last30DPS", deserialize_with = "lenient_string")]
    pub last30_dps: String,
    #[serde(rename = "Last60DPS", deserialize_with = "lenient_string")]
    pub last60_dps: String,
    #[serde(deserialize_with = "lenient_string")]
    pub kills: String,
    #[serde(deserialize_with = "lenient_string")]
    pub deaths: String,
    #[serde(rename = "damagetaken", deserialize_with = "lenient_string")]
    pub damage_taken: String,
}

// ============================================================================
// RawCombatant
// ============================================================================

/// Per-combatant statistics, all as host-formatted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawCombatant {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "Job", deserialize_with = "lenient_string")]
    pub job: String,
    #[serde(deserialize_with = "lenient_string")]
    pub damage: String,
    #[serde(rename = "damage%", deserialize_with = "lenient_string")]
    pub damage_pct: String,
    #[serde(deserialize_with = "lenient_string")]
    pub healed: String,
    #[serde(rename = "healed%", deserialize_with = "lenient_string")]
    pub healed_pct: String,
    #[serde(deserialize_with = "lenient_string")]
    pub encdps: String,
    #[serde(deserialize_with = "lenient_string")]
    pub enchps: String,
    #[serde(rename = "OverHealPct", deserialize_with = "lenient_string")]
    pub overheal_pct: String,
    #[serde(rename = "crithit%", deserialize_with = "lenient_string")]
    pub crit_pct: String,
    #[serde(rename = "DirectHitPct", deserialize_with = "lenient_string")]
    pub direct_hit_pct: String,
    #[serde(rename = "CritDirectHitPct", deserialize_with = "lenient_string")]
    pub crit_direct_hit_pct: String,
    #[serde(deserialize_with = "lenient_string")]
    pub deaths: String,
    #[serde(deserialize_with = "lenient_string")]
    pub hits: String,
    #[serde(deserialize_with = "lenient_string")]
    pub misses: String,
    #[serde(deserialize_with = "lenient_string")]
    pub swings: String,
    #[serde(rename = "damagetaken", deserialize_with = "lenient_string")]
    pub damage_taken: String,
    #[serde(rename = "healstaken", deserialize_with = "lenient_string")]
    pub heals_taken: String,
    #[serde(rename = "Last10DPS", deserialize_with = "lenient_string")]
    pub last10_dps: String,
    #[serde(rename = "Last30DPS", deserialize_with = "lenient_string")]
    pub last30_dps: String,
    #[serde(rename = "Last60DPS", deserialize_with = "lenient_string")]
    pub last60_dps: String,
    /// Composite `"<part>-<part>"` text.
    #[serde(rename = "maxhit", deserialize_with = "lenient_string")]
    pub max_hit: String,
    /// Composite `"<part>-<part>"` text.
    #[serde(rename = "maxheal", deserialize_with = "lenient_string")]
    pub max_heal: String,
}

// ============================================================================
// Lenient Decoding
// ============================================================================

/// Decodes any scalar (or `null`) as text.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_decodes_strings_and_numbers() {
        let value = json!({
            "type": "CombatData",
            "isActive": true,
            "Encounter": { "title": "Dummy", "ENCDPS": 1500, "damage": "45000" },
            "Combatant": {
                "YOU": { "name": "YOU", "Job": "Blm", "damage%": "100%", "deaths": 0 }
            }
        });

        let raw = RawCombatData::from_value(&value).expect("decode");
        assert_eq!(raw.is_active, "true");
        assert_eq!(raw.encounter.title, "Dummy");
        assert_eq!(raw.encounter.encdps_rounded, "1500");
        assert_eq!(raw.encounter.damage, "45000");

        let you = &raw.combatants["YOU"];
        assert_eq!(you.job, "Blm");
        assert_eq!(you.damage_pct, "100%");
        assert_eq!(you.deaths, "0");
        assert_eq!(you.max_heal, "");
    }

    #[test]
    fn test_missing_and_null_sections_default() {
        let raw = RawCombatData::from_value(&json!({ "type": "CombatData", "Combatant": null }))
            .expect("decode");
        assert!(raw.combatants.is_empty());
        assert_eq!(raw.encounter, RawEncounter::default());
        assert_eq!(raw.is_active, "");
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(RawCombatData::from_value(&json!("CombatData")).is_err());
    }
}
