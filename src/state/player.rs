//! The persisted player record.
//!
//! Field names serialize in camelCase to match the save schema. Every struct
//! carries `#[serde(default)]` so a snapshot that lacks a field still decodes.

use crate::character::progression::xp_for_level;
use crate::combat::math::DamageFormula;
use crate::combat::stance::Stance;
use crate::core::bignum::BigNum;
use crate::core::config::GameConfig;
use crate::core::constants::SAVE_SCHEMA_VERSION;
use crate::items::types::{EquipmentSlot, Stack, StackKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cheat-style modifiers the player can unlock and toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cheat {
    /// Boosts loot drop chance.
    LootMagnet,
    /// Merges full stacks into their next-tier item.
    AutoMerge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    #[serde(rename = "str")]
    pub strength: f64,
    #[serde(rename = "def")]
    pub defense: f64,
    /// Base max HP before equipment and buffs.
    pub hp: f64,
    pub regen: f64,
    #[serde(rename = "agi")]
    pub agility: f64,
    pub level: u32,
    pub xp: BigNum,
    #[serde(rename = "xpToNext")]
    pub xp_to_next: BigNum,
}

impl PlayerStats {
    pub fn new(config: &GameConfig) -> Self {
        let start = &config.starting_stats;
        Self {
            strength: start.strength,
            defense: start.defense,
            hp: start.hp,
            regen: start.regen,
            agility: start.agility,
            level: 1,
            xp: BigNum::zero(),
            xp_to_next: xp_for_level(1, config),
        }
    }
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AreaProgress {
    pub furthest_zone: u32,
    pub bosses_defeated: BTreeSet<u32>,
    /// Kills per zone counted toward that zone's boss threshold.
    pub zone_clear_kills: BTreeMap<u32, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timestamps {
    /// Unix seconds.
    pub last_save: i64,
    /// Unix seconds.
    pub last_online: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    pub schema_version: u32,
    pub gold: BigNum,
    pub fragments: BigNum,
    pub player_stats: PlayerStats,
    pub current_hp: f64,
    pub equipped: BTreeMap<EquipmentSlot, Option<StackKey>>,
    pub inventory_stacks: BTreeMap<StackKey, Stack>,
    pub purchased_upgrades: BTreeMap<String, u32>,
    pub total_kills: u64,
    pub current_area: u32,
    pub current_zone: u32,
    pub area_progress: BTreeMap<u32, AreaProgress>,
    pub prestige_count: u32,
    pub unlocked_cheats: BTreeSet<Cheat>,
    pub active_cheats: BTreeMap<Cheat, bool>,
    pub flags: BTreeMap<String, bool>,
    pub timestamps: Timestamps,
    pub damage_tier: DamageFormula,
    pub stance: Stance,
    /// Lifetime kills per enemy id, checked by territory requirements.
    pub enemy_kills: BTreeMap<String, u64>,
    pub conquered_territories: BTreeSet<String>,
    /// Scripted crit waiting to be consumed by the next attack.
    pub forced_crit: bool,
}

impl PlayerState {
    /// Fresh level 1 state in area 1, zone 1.
    pub fn new(config: &GameConfig) -> Self {
        let player_stats = PlayerStats::new(config);
        let current_hp = player_stats.hp;
        let mut area_progress = BTreeMap::new();
        area_progress.insert(
            1,
            AreaProgress {
                furthest_zone: 1,
                ..Default::default()
            },
        );
        Self {
            schema_version: SAVE_SCHEMA_VERSION,
            gold: BigNum::zero(),
            fragments: BigNum::zero(),
            player_stats,
            current_hp,
            equipped: EquipmentSlot::all().into_iter().map(|s| (s, None)).collect(),
            inventory_stacks: BTreeMap::new(),
            purchased_upgrades: BTreeMap::new(),
            total_kills: 0,
            current_area: 1,
            current_zone: 1,
            area_progress,
            prestige_count: 0,
            unlocked_cheats: BTreeSet::new(),
            active_cheats: BTreeMap::new(),
            flags: BTreeMap::new(),
            timestamps: Timestamps::default(),
            damage_tier: DamageFormula::Linear,
            stance: Stance::Balanced,
            enemy_kills: BTreeMap::new(),
            conquered_territories: BTreeSet::new(),
            forced_crit: false,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn cheat_active(&self, cheat: Cheat) -> bool {
        self.unlocked_cheats.contains(&cheat)
            && self.active_cheats.get(&cheat).copied().unwrap_or(false)
    }

    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.purchased_upgrades.get(id).copied().unwrap_or(0)
    }

    /// Highest zone reached in any area.
    pub fn furthest_zone(&self) -> u32 {
        self.area_progress
            .values()
            .map(|p| p.furthest_zone)
            .max()
            .unwrap_or(self.current_zone)
            .max(self.current_zone)
    }

    pub fn zone_kills(&self, area: u32, zone: u32) -> u32 {
        self.area_progress
            .get(&area)
            .and_then(|p| p.zone_clear_kills.get(&zone))
            .copied()
            .unwrap_or(0)
    }

    pub fn boss_defeated(&self, area: u32, zone: u32) -> bool {
        self.area_progress
            .get(&area)
            .is_some_and(|p| p.bosses_defeated.contains(&zone))
    }

    pub fn stack_count(&self, key: &StackKey) -> u64 {
        self.inventory_stacks.get(key).map(|s| s.count).unwrap_or(0)
    }

    pub fn is_equipped(&self, key: &StackKey) -> bool {
        self.equipped.values().any(|k| k.as_ref() == Some(key))
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_invariants() {
        let state = PlayerState::default();
        assert_eq!(state.player_stats.level, 1);
        assert!(state.player_stats.xp < state.player_stats.xp_to_next);
        assert_eq!(state.current_hp, state.player_stats.hp);
        assert_eq!(state.equipped.len(), EquipmentSlot::all().len());
        assert_eq!(state.furthest_zone(), 1);
    }

    #[test]
    fn test_cheat_requires_unlock_and_active() {
        let mut state = PlayerState::default();
        state.active_cheats.insert(Cheat::AutoMerge, true);
        assert!(!state.cheat_active(Cheat::AutoMerge), "locked cheat is inert");
        state.unlocked_cheats.insert(Cheat::AutoMerge);
        assert!(state.cheat_active(Cheat::AutoMerge));
    }

    #[test]
    fn test_json_uses_schema_names() {
        let json = serde_json::to_value(PlayerState::default()).unwrap();
        assert_eq!(json["schemaVersion"], SAVE_SCHEMA_VERSION);
        assert_eq!(json["gold"], "0");
        assert!(json["playerStats"]["str"].is_number());
        assert_eq!(json["playerStats"]["xpToNext"], "100");
        assert!(json["timestamps"]["lastOnline"].is_number());
        assert!(json["equipped"]["weapon"].is_null());
    }
}
