//! Sample data for simulation mode.
//!
//! A complete `CombatData` broadcast for a short party encounter, shaped
//! like what the host emits so overlays can be developed without a game
//! client.

use serde_json::{Value, json};

/// Returns a well-formed `CombatData` broadcast.
#[must_use]
pub fn sample_combat_data() -> Value {
    json!({
        "type": "CombatData",
        "isActive": "true",
        "Encounter": {
            "title": "Striking Dummy",
            "CurrentZoneName": "Middle La Noscea",
            "duration": "02:05",
            "DURATION": "125",
            "damage": "402813",
            "healed": "61240",
            "encdps": "3222.50",
            "enchps": "489.92",
            "ENCDPS": "3223",
            "ENCHPS": "490",
            "Last10DPS": "3518",
            "Last30DPS": "3390",
            "Last60DPS": "3301",
            "kills": "0",
            "deaths": "0",
            "damagetaken": "18340"
        },
        "Combatant": {
            "YOU": {
                "name": "YOU",
                "Job": "Blm",
                "damage": "151230",
                "damage%": "38%",
                "healed": "0",
                "healed%": "0%",
                "encdps": "1209.84",
                "enchps": "0.00",
                "OverHealPct": "0%",
                "crithit%": "21%",
                "DirectHitPct": "33%",
                "CritDirectHitPct": "7%",
                "deaths": "0",
                "hits": "58",
                "misses": "0",
                "swings": "58",
                "damagetaken": "2210",
                "healstaken": "2210",
                "Last10DPS": "1388",
                "Last30DPS": "1302",
                "Last60DPS": "1251",
                "maxhit": "Fire IV-9984",
                "maxheal": ""
            },
            "Alphinaud": {
                "name": "Alphinaud",
                "Job": "Sge",
                "damage": "48201",
                "damage%": "12%",
                "healed": "58110",
                "healed%": "95%",
                "encdps": "385.61",
                "enchps": "464.88",
                "OverHealPct": "31%",
                "crithit%": "14%",
                "DirectHitPct": "22%",
                "CritDirectHitPct": "3%",
                "deaths": "0",
                "hits": "41",
                "misses": "0",
                "swings": "41",
                "damagetaken": "3120",
                "healstaken": "1150",
                "Last10DPS": "402",
                "Last30DPS": "391",
                "Last60DPS": "388",
                "maxhit": "Dosis III-3310",
                "maxheal": "Pneuma-7420"
            },
            "Thancred": {
                "name": "Thancred",
                "Job": "Gnb",
                "damage": "121870",
                "damage%": "30%",
                "healed": "3130",
                "healed%": "5%",
                "encdps": "974.96",
                "enchps": "25.04",
                "OverHealPct": "12%",
                "crithit%": "17%",
                "DirectHitPct": "26%",
                "CritDirectHitPct": "5%",
                "deaths": "0",
                "hits": "87",
                "misses": "1",
                "swings": "88",
                "damagetaken": "13010",
                "healstaken": "12200",
                "Last10DPS": "1105",
                "Last30DPS": "1034",
                "Last60DPS": "998",
                "maxhit": "Double Down-6120",
                "maxheal": "Aurora-1200"
            },
            "Limit Break": {
                "name": "Limit Break",
                "Job": "",
                "damage": "81512",
                "damage%": "20%",
                "encdps": "652.10",
                "maxhit": "Meteor-81512"
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::enrich::{CombatantRecord, JobRole};
    use crate::protocol::{EventPayload, is_recognized_broadcast};

    #[test]
    fn test_sample_is_recognized() {
        assert!(is_recognized_broadcast(&sample_combat_data()));
    }

    #[test]
    fn test_sample_enriches_cleanly() {
        let EventPayload::CombatData(view) =
            crate::enrich::enrich("CombatData", sample_combat_data())
        else {
            panic!("expected enriched payload");
        };

        assert_eq!(view.combatants.len(), 4);
        assert!(matches!(
            view.combatants["Limit Break"],
            CombatantRecord::LimitBreak(_)
        ));

        let CombatantRecord::Player(sage) = &view.combatants["Alphinaud"] else {
            panic!("expected player");
        };
        assert_eq!(sage.role, JobRole::Heal);
        assert_eq!(sage.max_heal, "Pneuma");
        assert_eq!(sage.max_heal_damage, "7420");
    }
}
