//! Effective combat stats computed from a player snapshot.
//!
//! Derivation is referentially transparent: the same state, content and
//! config always produce the same numbers, so callers recompute freely
//! instead of caching.

use super::prestige::prestige_multiplier;
use crate::core::config::GameConfig;
use crate::core::constants::FLAG_OVERFLOW;
use crate::economy::modifiers::{ModifierTarget, Modifiers};
use crate::items::types::ItemStats;
use crate::state::player::PlayerState;
use crate::zones::content::ContentDb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    pub strength: f64,
    pub defense: f64,
    pub agility: f64,
    /// Evade rating opposing enemy accuracy.
    pub evade: f64,
    pub max_hp: f64,
    /// HP per second.
    pub regen: f64,
    pub skill: f64,
    pub weapon: f64,
    /// Damage-tier output before mitigation and multipliers.
    pub base_damage: f64,
    /// Damage upgrades × territories × prestige × stance.
    pub auto_multiplier: f64,
    /// Click upgrades × territories × prestige. Stance-neutral.
    pub click_multiplier: f64,
    pub prestige_multiplier: f64,
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    pub attack_interval_ms: f64,
    /// Incoming hit and DoT damage factor from the stance.
    pub damage_taken_factor: f64,
    pub gold_multiplier: f64,
    pub xp_multiplier: f64,
    pub fragment_multiplier: f64,
}

impl DerivedStats {
    pub fn attack_interval_secs(&self) -> f64 {
        self.attack_interval_ms / 1000.0
    }

    /// Derives effective stats.
    ///
    /// Each core stat is `(base + equipment + flat buffs) × buff multiplier`.
    pub fn derive(state: &PlayerState, content: &ContentDb, config: &GameConfig) -> Self {
        let mods = Modifiers::new(state, content);
        let gear = equipment_stats(state, content);
        let base = &state.player_stats;
        let stat = |value: f64, target: ModifierTarget| (value + mods.flat(target)) * mods.multiplier(target);

        let strength = stat(base.strength + gear.strength, ModifierTarget::Strength);
        let defense = stat(base.defense + gear.defense, ModifierTarget::Defense);
        let agility = stat(base.agility + gear.agility, ModifierTarget::Agility);
        let regen = stat(base.regen + gear.regen, ModifierTarget::Regen);
        let max_hp = stat(base.hp + gear.hp, ModifierTarget::MaxHp).max(1.0);

        let skill = config.base_skill + mods.flat(ModifierTarget::Skill);
        let weapon = gear.weapon;
        let base_damage = state.damage_tier.base_damage(strength, weapon, skill, config);

        let prestige = prestige_multiplier(state.prestige_count, config);
        let stance = config.stances.effect(state.stance);

        let crit_multiplier = if state.flag(FLAG_OVERFLOW) {
            config.overflow_crit_multiplier
        } else {
            config.crit_multiplier
        };

        let speed = mods.multiplier(ModifierTarget::AttackSpeed) * stance.speed_mult;
        let attack_interval_ms = if speed > 0.0 {
            config.auto_attack_interval_ms / speed - mods.flat(ModifierTarget::AttackSpeed)
        } else {
            config.auto_attack_interval_ms
        }
        .max(config.min_attack_interval_ms);

        Self {
            strength,
            defense,
            agility,
            evade: agility.max(0.0) * config.evade_per_agility,
            max_hp,
            regen,
            skill,
            weapon,
            base_damage,
            auto_multiplier: mods.multiplier(ModifierTarget::Damage) * prestige * stance.damage_mult,
            click_multiplier: mods.multiplier(ModifierTarget::ClickDamage) * prestige,
            prestige_multiplier: prestige,
            crit_chance: (config.crit_chance + mods.flat(ModifierTarget::CritChance)).clamp(0.0, 1.0),
            crit_multiplier,
            attack_interval_ms,
            damage_taken_factor: stance.taken_factor(),
            gold_multiplier: mods.multiplier(ModifierTarget::Gold) * prestige * config.gold_drop_multiplier,
            xp_multiplier: mods.multiplier(ModifierTarget::Xp) * prestige,
            fragment_multiplier: mods.multiplier(ModifierTarget::Fragments)
                * prestige
                * config.fragment_drop_multiplier,
        }
    }
}

/// Sum of the stat bonuses of every equipped item.
pub fn equipment_stats(state: &PlayerState, content: &ContentDb) -> ItemStats {
    let mut total = ItemStats::default();
    for key in state.equipped.values().flatten() {
        if let Some(item) = content.item(&key.item_id) {
            total.add(&item.stats);
        }
    }
    total
}
