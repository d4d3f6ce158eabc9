//! Static game content: areas, enemies, encounters, bosses, items, upgrades
//! and territories.
//!
//! Content is immutable once loaded. [`ContentDb::new`] resolves every
//! cross-reference and reports the first defect as a [`ContentError`]
//! instead of masking it at runtime.

use super::data::Area;
use super::encounters::{BossTemplate, EncounterTemplate};
use crate::combat::types::{EnemyTemplate, EnrageTrait, LootEntry};
use crate::core::bignum::BigNum;
use crate::economy::modifiers::{Effect, EffectKind, ModifierTarget};
use crate::economy::territory::TerritoryDef;
use crate::economy::upgrades::{UpgradeCategory, UpgradeDef};
use crate::items::types::{EquipmentSlot, ItemDef, ItemStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{referenced_by} references unknown enemy {id}")]
    UnknownEnemy { referenced_by: String, id: String },

    #[error("{referenced_by} references unknown item {id}")]
    UnknownItem { referenced_by: String, id: String },

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("{id} has an invalid zone range {min}..={max}")]
    InvalidZoneRange { id: String, min: u32, max: u32 },

    #[error("zone {0} is not covered by any area")]
    AreaGap(u32),

    #[error("zone {0} is covered by more than one area")]
    AreaOverlap(u32),

    #[error("no areas defined")]
    NoAreas,

    #[error("zone {0} has no enemies")]
    EmptyZone(u32),

    #[error("content JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw content as authored, before indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentData {
    pub areas: Vec<Area>,
    pub enemies: Vec<EnemyTemplate>,
    pub encounters: Vec<EncounterTemplate>,
    pub bosses: Vec<BossTemplate>,
    pub items: Vec<ItemDef>,
    pub upgrades: Vec<UpgradeDef>,
    pub territories: Vec<TerritoryDef>,
}

/// Indexed, validated content.
#[derive(Debug, Clone)]
pub struct ContentDb {
    data: ContentData,
    enemy_index: BTreeMap<String, usize>,
    item_index: BTreeMap<String, usize>,
    upgrade_index: BTreeMap<String, usize>,
    territory_index: BTreeMap<String, usize>,
}

fn positions<T>(items: &[T], id: impl Fn(&T) -> &str) -> BTreeMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (id(item).to_string(), i))
        .collect()
}

fn index_by_id<T>(items: &[T], id: impl Fn(&T) -> &str) -> Result<BTreeMap<String, usize>, ContentError> {
    let mut index = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        if index.insert(id(item).to_string(), i).is_some() {
            return Err(ContentError::DuplicateId(id(item).to_string()));
        }
    }
    Ok(index)
}

/// Checks that area zone ranges tile `1..=total` with no gaps or overlaps.
/// Returns the total zone count.
pub fn check_area_tiling(areas: &[Area]) -> Result<u32, ContentError> {
    if areas.is_empty() {
        return Err(ContentError::NoAreas);
    }
    let mut sorted: Vec<&Area> = areas.iter().collect();
    sorted.sort_by_key(|a| a.first_zone);

    let mut expected = 1;
    for area in sorted {
        if area.last_zone < area.first_zone {
            return Err(ContentError::InvalidZoneRange {
                id: area.name.clone(),
                min: area.first_zone,
                max: area.last_zone,
            });
        }
        if area.first_zone > expected {
            return Err(ContentError::AreaGap(expected));
        }
        if area.first_zone < expected {
            return Err(ContentError::AreaOverlap(area.first_zone));
        }
        expected = area.last_zone + 1;
    }
    Ok(expected - 1)
}

impl ContentDb {
    /// Indexes and validates content.
    pub fn new(data: ContentData) -> Result<Self, ContentError> {
        let db = Self::index(data)?;
        db.validate()?;
        Ok(db)
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let data: ContentData = serde_json::from_str(json)?;
        Self::new(data)
    }

    /// Content shipped with the crate.
    pub fn builtin() -> Self {
        let data = Self::builtin_data();
        // Builtin ids are unique; covered by test_builtin_content_is_valid.
        Self {
            enemy_index: positions(&data.enemies, |e| e.id.as_str()),
            item_index: positions(&data.items, |i| i.id.as_str()),
            upgrade_index: positions(&data.upgrades, |u| u.id.as_str()),
            territory_index: positions(&data.territories, |t| t.id.as_str()),
            data,
        }
    }

    fn index(data: ContentData) -> Result<Self, ContentError> {
        Ok(Self {
            enemy_index: index_by_id(&data.enemies, |e| e.id.as_str())?,
            item_index: index_by_id(&data.items, |i| i.id.as_str())?,
            upgrade_index: index_by_id(&data.upgrades, |u| u.id.as_str())?,
            territory_index: index_by_id(&data.territories, |t| t.id.as_str())?,
            data,
        })
    }

    fn validate(&self) -> Result<(), ContentError> {
        let total = check_area_tiling(&self.data.areas)?;

        let enemy = |by: &str, id: &str| -> Result<(), ContentError> {
            if self.enemy(id).is_some() {
                Ok(())
            } else {
                Err(ContentError::UnknownEnemy {
                    referenced_by: by.to_string(),
                    id: id.to_string(),
                })
            }
        };
        let item = |by: &str, id: &str| -> Result<(), ContentError> {
            if self.item(id).is_some() {
                Ok(())
            } else {
                Err(ContentError::UnknownItem {
                    referenced_by: by.to_string(),
                    id: id.to_string(),
                })
            }
        };

        for e in &self.data.enemies {
            if e.min_zone > e.max_zone {
                return Err(ContentError::InvalidZoneRange {
                    id: e.id.clone(),
                    min: e.min_zone,
                    max: e.max_zone,
                });
            }
            for entry in &e.loot_table {
                item(&e.id, &entry.item_id)?;
            }
        }
        for enc in &self.data.encounters {
            if enc.min_zone > enc.max_zone {
                return Err(ContentError::InvalidZoneRange {
                    id: enc.id.clone(),
                    min: enc.min_zone,
                    max: enc.max_zone,
                });
            }
            for member in &enc.members {
                enemy(&enc.id, member)?;
            }
        }
        for boss in &self.data.bosses {
            enemy(&boss.id, &boss.base_enemy)?;
        }
        for i in &self.data.items {
            if let Some(next) = &i.next_tier {
                item(&i.id, next)?;
            }
        }
        for t in &self.data.territories {
            enemy(&t.id, &t.enemy_id)?;
        }
        for zone in 1..=total {
            if !self.data.enemies.iter().any(|e| e.valid_in_zone(zone)) {
                return Err(ContentError::EmptyZone(zone));
            }
        }
        Ok(())
    }

    pub fn data(&self) -> &ContentData {
        &self.data
    }

    pub fn areas(&self) -> &[Area] {
        &self.data.areas
    }

    pub fn enemies(&self) -> &[EnemyTemplate] {
        &self.data.enemies
    }

    pub fn encounters(&self) -> &[EncounterTemplate] {
        &self.data.encounters
    }

    pub fn bosses(&self) -> &[BossTemplate] {
        &self.data.bosses
    }

    pub fn items(&self) -> &[ItemDef] {
        &self.data.items
    }

    pub fn upgrades(&self) -> &[UpgradeDef] {
        &self.data.upgrades
    }

    pub fn territories(&self) -> &[TerritoryDef] {
        &self.data.territories
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyTemplate> {
        self.enemy_index.get(id).map(|&i| &self.data.enemies[i])
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.item_index.get(id).map(|&i| &self.data.items[i])
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrade_index.get(id).map(|&i| &self.data.upgrades[i])
    }

    pub fn territory(&self, id: &str) -> Option<&TerritoryDef> {
        self.territory_index.get(id).map(|&i| &self.data.territories[i])
    }

    pub fn area(&self, id: u32) -> Option<&Area> {
        self.data.areas.iter().find(|a| a.id == id)
    }

    pub fn area_for_zone(&self, zone: u32) -> Option<&Area> {
        self.data.areas.iter().find(|a| a.contains(zone))
    }

    pub fn total_zones(&self) -> u32 {
        self.data.areas.iter().map(|a| a.last_zone).max().unwrap_or(0)
    }

    pub fn builtin_data() -> ContentData {
        ContentData {
            areas: builtin_areas(),
            enemies: builtin_enemies(),
            encounters: builtin_encounters(),
            bosses: builtin_bosses(),
            items: builtin_items(),
            upgrades: builtin_upgrades(),
            territories: builtin_territories(),
        }
    }
}

fn area(id: u32, name: &str, zones: (u32, u32), base_multiplier: f64, drop_chance: f64) -> Area {
    Area {
        id,
        name: name.to_string(),
        first_zone: zones.0,
        last_zone: zones.1,
        base_multiplier,
        drop_chance,
    }
}

fn builtin_areas() -> Vec<Area> {
    vec![
        area(1, "Greenmeadow", (1, 10), 1.0, 0.12),
        area(2, "Hollow Caverns", (11, 20), 8.0, 0.10),
        area(3, "Shattered Spire", (21, 30), 60.0, 0.08),
    ]
}

struct EnemyStats {
    hp: f64,
    attack: f64,
    defense: f64,
    accuracy: f64,
    attack_speed: f64,
    gold: f64,
    xp: f64,
}

fn enemy(id: &str, name: &str, zones: (u32, u32), s: EnemyStats, loot: &[(&str, f64)]) -> EnemyTemplate {
    EnemyTemplate {
        id: id.to_string(),
        name: name.to_string(),
        hp: s.hp,
        attack: s.attack,
        defense: s.defense,
        armor_pen: 0.0,
        accuracy: s.accuracy,
        attack_speed: s.attack_speed,
        dot_per_second: None,
        regen: 0.0,
        thorns: 0.0,
        enrage: None,
        min_zone: zones.0,
        max_zone: zones.1,
        gold: s.gold,
        xp: s.xp,
        loot_table: loot
            .iter()
            .map(|(item_id, weight)| LootEntry {
                item_id: item_id.to_string(),
                weight: *weight,
            })
            .collect(),
    }
}

fn builtin_enemies() -> Vec<EnemyTemplate> {
    let stats = |hp, attack, defense, accuracy, attack_speed, gold, xp| EnemyStats {
        hp,
        attack,
        defense,
        accuracy,
        attack_speed,
        gold,
        xp,
    };
    vec![
        enemy(
            "slime",
            "Slime",
            (1, 5),
            stats(30.0, 6.0, 0.0, 8.0, 1.0, 3.0, 5.0),
            &[("copper_ring", 3.0), ("leather_cap", 2.0)],
        ),
        enemy(
            "wolf",
            "Grey Wolf",
            (1, 10),
            stats(45.0, 9.0, 1.0, 10.0, 1.2, 5.0, 8.0),
            &[("rusty_sword", 2.0), ("leather_boots", 2.0)],
        ),
        EnemyTemplate {
            armor_pen: 0.2,
            ..enemy(
                "bandit",
                "Road Bandit",
                (4, 10),
                stats(60.0, 11.0, 2.0, 12.0, 1.0, 8.0, 12.0),
                &[("rusty_sword", 1.0), ("copper_ring", 1.0), ("leather_armor", 1.0)],
            )
        },
        enemy(
            "cave_bat",
            "Cave Bat",
            (11, 20),
            stats(35.0, 14.0, 0.0, 18.0, 1.6, 6.0, 10.0),
            &[("bone_amulet", 1.0)],
        ),
        EnemyTemplate {
            regen: 2.0,
            thorns: 3.0,
            ..enemy(
                "stone_golem",
                "Stone Golem",
                (11, 20),
                stats(160.0, 20.0, 8.0, 10.0, 0.6, 20.0, 30.0),
                &[("iron_sword", 1.0), ("iron_armor", 1.0)],
            )
        },
        EnemyTemplate {
            dot_per_second: Some(2.0),
            ..enemy(
                "venom_spider",
                "Venom Spider",
                (13, 20),
                stats(70.0, 12.0, 1.0, 16.0, 1.1, 12.0, 16.0),
                &[("silver_ring", 1.0), ("leather_boots", 2.0)],
            )
        },
        EnemyTemplate {
            armor_pen: 0.3,
            enrage: Some(EnrageTrait {
                threshold: 0.3,
                attack_mult: 1.5,
                speed_mult: 1.3,
            }),
            ..enemy(
                "spire_knight",
                "Spire Knight",
                (21, 30),
                stats(220.0, 35.0, 12.0, 25.0, 0.9, 40.0, 55.0),
                &[("steel_sword", 1.0), ("iron_armor", 2.0)],
            )
        },
        EnemyTemplate {
            dot_per_second: Some(5.0),
            regen: 4.0,
            ..enemy(
                "wraith",
                "Wraith",
                (21, 30),
                stats(120.0, 28.0, 4.0, 30.0, 1.3, 30.0, 40.0),
                &[("silver_ring", 1.0), ("bone_amulet", 1.0)],
            )
        },
    ]
}

fn encounter(id: &str, members: &[&str], weight: f64, zones: (u32, u32), reward_mult: f64, loot_bonus: f64) -> EncounterTemplate {
    EncounterTemplate {
        id: id.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
        weight,
        min_zone: zones.0,
        max_zone: zones.1,
        attack_speed_mult: 1.0,
        reward_mult,
        loot_bonus,
    }
}

fn builtin_encounters() -> Vec<EncounterTemplate> {
    vec![
        encounter("wolf_pack", &["wolf", "wolf"], 4.0, (3, 10), 1.2, 1.2),
        encounter("bandit_ambush", &["bandit", "wolf"], 3.0, (6, 10), 1.3, 1.5),
        EncounterTemplate {
            attack_speed_mult: 0.9,
            ..encounter("golem_guard", &["stone_golem", "cave_bat"], 2.0, (14, 20), 1.4, 1.5)
        },
        encounter("spire_patrol", &["spire_knight", "wraith"], 3.0, (24, 30), 1.5, 1.5),
    ]
}

fn builtin_bosses() -> Vec<BossTemplate> {
    vec![
        BossTemplate {
            id: "meadow_warlord".to_string(),
            base_enemy: "bandit".to_string(),
            zone: 10,
            hp_mult: 8.0,
            attack_mult: 1.8,
            reward_mult: 10.0,
        },
        BossTemplate {
            id: "golem_king".to_string(),
            base_enemy: "stone_golem".to_string(),
            zone: 20,
            hp_mult: 7.0,
            attack_mult: 1.6,
            reward_mult: 10.0,
        },
        BossTemplate {
            id: "spire_lord".to_string(),
            base_enemy: "spire_knight".to_string(),
            zone: 30,
            hp_mult: 10.0,
            attack_mult: 2.0,
            reward_mult: 15.0,
        },
    ]
}

fn item(id: &str, name: &str, slot: EquipmentSlot, stats: ItemStats, next: Option<&str>) -> ItemDef {
    ItemDef {
        id: id.to_string(),
        name: name.to_string(),
        slot,
        stats,
        next_tier: next.map(str::to_string),
    }
}

fn builtin_items() -> Vec<ItemDef> {
    use EquipmentSlot::*;
    let none = ItemStats::default();
    vec![
        item("rusty_sword", "Rusty Sword", Weapon, ItemStats { weapon: 3.0, ..none }, Some("iron_sword")),
        item("iron_sword", "Iron Sword", Weapon, ItemStats { weapon: 8.0, strength: 2.0, ..none }, Some("steel_sword")),
        item("steel_sword", "Steel Sword", Weapon, ItemStats { weapon: 20.0, strength: 5.0, ..none }, None),
        item("leather_cap", "Leather Cap", Helmet, ItemStats { defense: 1.0, hp: 5.0, ..none }, None),
        item("leather_armor", "Leather Armor", Armor, ItemStats { defense: 2.0, hp: 10.0, ..none }, Some("iron_armor")),
        item("iron_armor", "Iron Armor", Armor, ItemStats { defense: 6.0, hp: 30.0, ..none }, None),
        item("leather_boots", "Leather Boots", Boots, ItemStats { agility: 2.0, ..none }, None),
        item("copper_ring", "Copper Ring", Ring, ItemStats { strength: 1.0, regen: 0.2, ..none }, Some("silver_ring")),
        item("silver_ring", "Silver Ring", Ring, ItemStats { strength: 3.0, regen: 0.5, ..none }, None),
        item("bone_amulet", "Bone Amulet", Amulet, ItemStats { hp: 15.0, regen: 0.5, ..none }, None),
    ]
}

fn upgrade(
    id: &str,
    name: &str,
    category: UpgradeCategory,
    cost: (u64, f64),
    max_level: u32,
    effect: (ModifierTarget, EffectKind, f64),
) -> UpgradeDef {
    UpgradeDef {
        id: id.to_string(),
        name: name.to_string(),
        category,
        base_cost: BigNum::from(cost.0),
        cost_growth: cost.1,
        max_level,
        effect: Effect {
            target: effect.0,
            kind: effect.1,
            value: effect.2,
        },
    }
}

fn builtin_upgrades() -> Vec<UpgradeDef> {
    use EffectKind::*;
    use ModifierTarget::*;
    use UpgradeCategory::*;
    vec![
        upgrade("sharpen", "Sharpen Blade", Standard, (50, 1.15), 100, (Damage, Multiplicative, 0.1)),
        upgrade("quick_hands", "Quick Hands", Standard, (75, 1.2), 50, (AttackSpeed, Multiplicative, 0.05)),
        upgrade("tap_training", "Tap Training", Standard, (25, 1.12), 100, (ClickDamage, Multiplicative, 0.25)),
        upgrade("greed", "Greed", Standard, (100, 1.18), 50, (Gold, Multiplicative, 0.1)),
        upgrade("study", "Study", Standard, (100, 1.18), 50, (Xp, Multiplicative, 0.1)),
        upgrade("keen_eye", "Keen Eye", Standard, (200, 1.25), 20, (CritChance, Flat, 0.01)),
        upgrade("toughness", "Toughness", Standard, (60, 1.15), 100, (MaxHp, Multiplicative, 0.05)),
        upgrade("dupe_glitch", "Dupe Glitch", Exploit, (5, 1.5), 10, (Fragments, Multiplicative, 0.2)),
        upgrade("overclock", "Overclock", Exploit, (10, 1.6), 10, (Damage, Multiplicative, 0.25)),
        upgrade("skill_patch", "Skill Patch", Exploit, (20, 1.8), 10, (Skill, Flat, 0.5)),
    ]
}

fn territory(id: &str, name: &str, enemy_id: &str, kills: u64, cost: u64, buff: (ModifierTarget, EffectKind, f64)) -> TerritoryDef {
    TerritoryDef {
        id: id.to_string(),
        name: name.to_string(),
        enemy_id: enemy_id.to_string(),
        kills_required: kills,
        gold_cost: BigNum::from(cost),
        buff: Effect {
            target: buff.0,
            kind: buff.1,
            value: buff.2,
        },
    }
}

fn builtin_territories() -> Vec<TerritoryDef> {
    use EffectKind::*;
    use ModifierTarget::*;
    vec![
        territory("wolf_den", "Wolf Den", "wolf", 50, 500, (Gold, Multiplicative, 0.15)),
        territory("bandit_camp", "Bandit Camp", "bandit", 100, 2_000, (Strength, Flat, 5.0)),
        territory("golem_quarry", "Golem Quarry", "stone_golem", 80, 20_000, (MaxHp, Multiplicative, 0.2)),
        territory("spire_gate", "Spire Gate", "spire_knight", 60, 250_000, (CritChance, Flat, 0.03)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_content_is_valid() {
        let db = ContentDb::new(ContentDb::builtin_data());
        assert!(db.is_ok(), "builtin content invalid: {:?}", db.err());
    }

    #[test]
    fn test_builtin_areas_tile() {
        assert_eq!(check_area_tiling(&builtin_areas()).unwrap(), 30);
    }

    #[test]
    fn test_area_gap_detected() {
        let areas = vec![area(1, "a", (1, 5), 1.0, 0.1), area(2, "b", (7, 9), 1.0, 0.1)];
        assert!(matches!(check_area_tiling(&areas), Err(ContentError::AreaGap(6))));
    }

    #[test]
    fn test_area_overlap_detected() {
        let areas = vec![area(1, "a", (1, 5), 1.0, 0.1), area(2, "b", (5, 9), 1.0, 0.1)];
        assert!(matches!(check_area_tiling(&areas), Err(ContentError::AreaOverlap(5))));
    }

    #[test]
    fn test_first_area_must_start_at_one() {
        let areas = vec![area(1, "a", (2, 5), 1.0, 0.1)];
        assert!(matches!(check_area_tiling(&areas), Err(ContentError::AreaGap(1))));
    }

    #[test]
    fn test_unresolved_boss_reference_reported() {
        let mut data = ContentDb::builtin_data();
        data.bosses[0].base_enemy = "ghost".to_string();
        let err = ContentDb::new(data).unwrap_err();
        assert!(matches!(err, ContentError::UnknownEnemy { ref id, .. } if id == "ghost"));
    }

    #[test]
    fn test_unresolved_loot_reference_reported() {
        let mut data = ContentDb::builtin_data();
        data.enemies[0].loot_table.push(LootEntry {
            item_id: "phantom_blade".to_string(),
            weight: 1.0,
        });
        assert!(matches!(
            ContentDb::new(data),
            Err(ContentError::UnknownItem { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut data = ContentDb::builtin_data();
        let dup = data.items[0].clone();
        data.items.push(dup);
        assert!(matches!(ContentDb::new(data), Err(ContentError::DuplicateId(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::to_string(&ContentDb::builtin_data()).unwrap();
        let db = ContentDb::from_json(&json).unwrap();
        assert_eq!(db.data(), ContentDb::builtin().data());
        assert!(db.enemy("wolf").is_some());
    }

    #[test]
    fn test_area_lookup_by_zone() {
        let db = ContentDb::builtin();
        assert_eq!(db.area_for_zone(1).map(|a| a.id), Some(1));
        assert_eq!(db.area_for_zone(15).map(|a| a.id), Some(2));
        assert!(db.area_for_zone(31).is_none());
        assert_eq!(db.total_zones(), 30);
    }
}
