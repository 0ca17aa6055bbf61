//! Payload enrichment.
//!
//! Reshapes the verbose, string-typed `CombatData` broadcast into a flat,
//! numeric view. Every other event type passes through untouched.
//!
//! # Example
//!
//! ```ignore
//! use overlay_bridge::enrich::{enrich, CombatantRecord};
//! use overlay_bridge::EventPayload;
//!
//! let payload = enrich("CombatData", overlay_bridge::fake::sample_combat_data());
//! if let EventPayload::CombatData(view) = payload {
//!     println!("{} dps", view.encounter.dps);
//! }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Job code to role classification.
pub mod job;

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::protocol::combat::{RawCombatData, RawCombatant, RawEncounter};
use crate::protocol::{EventKind, EventPayload};

pub use job::JobRole;

// ============================================================================
// Constants
// ============================================================================

/// Pseudo-combatant that accounts party limit break damage.
pub const LIMIT_BREAK_NAME: &str = "Limit Break";

// ============================================================================
// Views
// ============================================================================

/// Flattened `CombatData`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatDataView {
    pub is_active: bool,
    pub encounter: EncounterSummary,
    pub combatants: BTreeMap<String, CombatantRecord>,
}

/// Encounter-level aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterSummary {
    pub title: String,
    pub zone_name: String,
    /// Host-formatted `mm:ss`.
    pub duration: String,
    pub duration_secs: f64,
    pub damage: f64,
    pub healed: f64,
    pub dps: f64,
    pub hps: f64,
    pub last10_dps: f64,
    pub last30_dps: f64,
    pub last60_dps: f64,
    pub kills: f64,
    pub deaths: f64,
    pub damage_taken: f64,
}

/// Per-combatant record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CombatantRecord {
    /// The party limit break pseudo-combatant.
    LimitBreak(LimitBreakRecord),
    /// A real combatant.
    Player(Box<PlayerRecord>),
}

impl CombatantRecord {
    /// Returns the combatant's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::LimitBreak(lb) => &lb.name,
            Self::Player(player) => &player.name,
        }
    }

    /// Returns the damage dealt.
    #[must_use]
    pub fn damage(&self) -> f64 {
        match self {
            Self::LimitBreak(lb) => lb.damage,
            Self::Player(player) => player.damage,
        }
    }
}

/// Reduced record for limit break usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitBreakRecord {
    pub name: String,
    pub damage: f64,
    pub damage_pct: f64,
    pub dps: f64,
}

/// Full per-combatant record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub name: String,
    /// Upper-cased job code.
    pub job: String,
    pub role: JobRole,
    pub damage: f64,
    pub damage_pct: f64,
    pub dps: f64,
    pub healed: f64,
    pub healed_pct: f64,
    pub hps: f64,
    pub overheal_pct: f64,
    pub crit_pct: f64,
    pub direct_hit_pct: f64,
    pub crit_direct_hit_pct: f64,
    pub deaths: f64,
    pub hits: f64,
    pub misses: f64,
    pub swings: f64,
    pub damage_taken: f64,
    pub heals_taken: f64,
    pub last10_dps: f64,
    pub last30_dps: f64,
    pub last60_dps: f64,
    pub max_hit: String,
    pub max_hit_damage: String,
    pub max_heal: String,
    pub max_heal_damage: String,
}

// ============================================================================
// Enrichment
// ============================================================================

/// Enriches a broadcast body according to its declared type.
///
/// Only `CombatData` is reshaped. Other types, and `CombatData` bodies that
/// are not JSON objects, come back as [`EventPayload::Raw`].
#[must_use]
pub fn enrich(event_type: &str, body: Value) -> EventPayload {
    if event_type != EventKind::CombatData.as_str() {
        return EventPayload::Raw(body);
    }

    match RawCombatData::from_value(&body) {
        Ok(raw) => EventPayload::CombatData(Box::new(enrich_combat_data(&raw))),
        Err(e) => {
            warn!(error = %e, "CombatData payload not enrichable, passing through");
            EventPayload::Raw(body)
        }
    }
}

/// Builds the flattened view from decoded raw records.
#[must_use]
pub fn enrich_combat_data(raw: &RawCombatData) -> CombatDataView {
    let combatants = raw
        .combatants
        .iter()
        .map(|(key, combatant)| (key.clone(), enrich_combatant(key, combatant)))
        .collect();

    CombatDataView {
        is_active: raw.is_active.trim().eq_ignore_ascii_case("true"),
        encounter: enrich_encounter(&raw.encounter),
        combatants,
    }
}

fn enrich_encounter(raw: &RawEncounter) -> EncounterSummary {
    EncounterSummary {
        title: raw.title.clone(),
        zone_name: raw.current_zone_name.clone(),
        duration: raw.duration.clone(),
        duration_secs: parse_number(&raw.duration_secs),
        damage: parse_number(&raw.damage),
        healed: parse_number(&raw.healed),
        dps: parse_first(&raw.encdps, &raw.encdps_rounded),
        hps: parse_first(&raw.enchps, &raw.enchps_rounded),
        last10_dps: parse_number(&raw.last10_dps),
        last30_dps: parse_number(&raw.last30_dps),
        last60_dps: parse_number(&raw.last60_dps),
        kills: parse_number(&raw.kills),
        deaths: parse_number(&raw.deaths),
        damage_taken: parse_number(&raw.damage_taken),
    }
}

fn enrich_combatant(key: &str, raw: &RawCombatant) -> CombatantRecord {
    let name = if raw.name.is_empty() {
        key.to_string()
    } else {
        raw.name.clone()
    };

    if name.eq_ignore_ascii_case(LIMIT_BREAK_NAME) {
        return CombatantRecord::LimitBreak(LimitBreakRecord {
            name,
            damage: parse_number(&raw.damage),
            damage_pct: parse_number(&raw.damage_pct),
            dps: parse_number(&raw.encdps),
        });
    }

    let (max_hit, max_hit_damage) = split_composite(&raw.max_hit);
    let (max_heal, max_heal_damage) = split_composite(&raw.max_heal);

    CombatantRecord::Player(Box::new(PlayerRecord {
        name,
        job: raw.job.trim().to_ascii_uppercase(),
        role: JobRole::from_job(&raw.job),
        damage: parse_number(&raw.damage),
        damage_pct: parse_number(&raw.damage_pct),
        dps: parse_number(&raw.encdps),
        healed: parse_number(&raw.healed),
        healed_pct: parse_number(&raw.healed_pct),
        hps: parse_number(&raw.enchps),
        overheal_pct: parse_number(&raw.overheal_pct),
        crit_pct: parse_number(&raw.crit_pct),
        direct_hit_pct: parse_number(&raw.direct_hit_pct),
        crit_direct_hit_pct: parse_number(&raw.crit_direct_hit_pct),
        deaths: parse_number(&raw.deaths),
        hits: parse_number(&raw.hits),
        misses: parse_number(&raw.misses),
        swings: parse_number(&raw.swings),
        damage_taken: parse_number(&raw.damage_taken),
        heals_taken: parse_number(&raw.heals_taken),
        last10_dps: parse_number(&raw.last10_dps),
        last30_dps: parse_number(&raw.last30_dps),
        last60_dps: parse_number(&raw.last60_dps),
        max_hit,
        max_hit_damage,
        max_heal,
        max_heal_damage,
    }))
}

// ============================================================================
// Field Helpers
// ============================================================================

/// Splits `"a-b"` into `("a", "b")`. Fewer than two parts yields two empty
/// strings.
#[must_use]
pub fn split_composite(text: &str) -> (String, String) {
    let mut parts = text.split('-');
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) => (first.to_string(), second.to_string()),
        _ => (String::new(), String::new()),
    }
}

/// Parses host-formatted numbers such as `"12,345"` or `"42.5%"`.
///
/// Placeholders like `"---"` or `"∞"` parse as `0.0`.
#[must_use]
pub fn parse_number(text: &str) -> f64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '%' && *c != ',')
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or_default()
}

fn parse_first(preferred: &str, fallback: &str) -> f64 {
    if preferred.trim().is_empty() {
        parse_number(fallback)
    } else {
        parse_number(preferred)
    }
}

// ============================================================================
// Tests
// ============================================================================
