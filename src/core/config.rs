//! Tunable game configuration.
//!
//! Every balance number the formulas read lives here rather than inline, so
//! the live loop, the offline estimator and balance tooling can run against
//! the same values. Missing JSON fields fall back to [`super::constants`].

use super::constants::*;
use crate::combat::stance::StanceTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-level stat growth applied on each level-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatGrowth {
    pub strength: f64,
    pub defense: f64,
    pub hp: f64,
    pub regen: f64,
    pub agility: f64,
}

impl Default for StatGrowth {
    fn default() -> Self {
        Self {
            strength: STRENGTH_PER_LEVEL,
            defense: DEFENSE_PER_LEVEL,
            hp: HP_PER_LEVEL,
            regen: REGEN_PER_LEVEL,
            agility: AGILITY_PER_LEVEL,
        }
    }
}

/// Base stats of a fresh character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingStats {
    pub strength: f64,
    pub defense: f64,
    pub hp: f64,
    pub regen: f64,
    pub agility: f64,
}

impl Default for StartingStats {
    fn default() -> Self {
        Self {
            strength: STARTING_STRENGTH,
            defense: STARTING_DEFENSE,
            hp: STARTING_HP,
            regen: STARTING_REGEN,
            agility: STARTING_AGILITY,
        }
    }
}

/// Zone scaling growth rates. Factor = area base * growth^(local zone index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneScaling {
    pub hp_growth: f64,
    pub attack_growth: f64,
    pub gold_growth: f64,
    pub xp_growth: f64,
}

impl Default for ZoneScaling {
    fn default() -> Self {
        Self {
            hp_growth: ZONE_HP_GROWTH,
            attack_growth: ZONE_ATTACK_GROWTH,
            gold_growth: ZONE_GOLD_GROWTH,
            xp_growth: ZONE_XP_GROWTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // Timing
    pub auto_attack_interval_ms: f64,
    pub min_attack_interval_ms: f64,
    pub spawn_delay_ms: f64,
    pub regen_tick_ms: f64,
    pub dot_tick_ms: f64,
    pub enemy_base_attack_interval_secs: f64,
    pub enemy_min_attack_interval_secs: f64,

    // Leveling
    pub xp_curve_base: f64,
    pub xp_curve_exponent: f64,
    pub max_level: u32,
    pub starting_stats: StartingStats,
    pub level_growth: StatGrowth,

    // Crit
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    pub overflow_crit_multiplier: f64,

    // Damage formulas
    pub linear_strength_coef: f64,
    pub quadratic_skill_coef: f64,
    pub exponential_skill_base: f64,
    pub base_skill: f64,
    pub min_damage_fraction: f64,

    // Hit chance
    pub hit_chance_floor: f64,
    pub hit_chance_cap: f64,
    pub evade_per_agility: f64,
    pub net_dps_epsilon: f64,

    pub stances: StanceTable,

    // Rewards
    pub gold_drop_multiplier: f64,
    pub fragment_drop_rate: f64,
    pub fragment_base_amount: f64,
    pub fragment_drop_multiplier: f64,
    pub loot_boost_multiplier: f64,
    pub loot_boost_cap: f64,
    pub rarity_weights: [f64; 5],
    pub solo_encounter_weight: f64,

    // Inventory
    pub inventory_capacity: usize,
    pub merge_threshold: u64,
    pub merge_max_depth: u32,

    // Prestige
    pub prestige_base_factor: f64,
    pub prestige_exponent: f64,
    pub prestige_min_zone: u32,

    // Offline
    pub offline_max_seconds: f64,
    pub offline_min_seconds: f64,

    // Bosses
    pub boss_kills_base: u32,
    pub boss_kills_per_zone: u32,
    pub boss_hp_multiplier: f64,
    pub boss_attack_multiplier: f64,
    pub boss_reward_multiplier: f64,

    pub zone_scaling: ZoneScaling,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            auto_attack_interval_ms: AUTO_ATTACK_INTERVAL_MS,
            min_attack_interval_ms: MIN_ATTACK_INTERVAL_MS,
            spawn_delay_ms: SPAWN_DELAY_MS,
            regen_tick_ms: REGEN_TICK_MS,
            dot_tick_ms: DOT_TICK_MS,
            enemy_base_attack_interval_secs: ENEMY_BASE_ATTACK_INTERVAL_SECONDS,
            enemy_min_attack_interval_secs: ENEMY_MIN_ATTACK_INTERVAL_SECONDS,
            xp_curve_base: XP_CURVE_BASE,
            xp_curve_exponent: XP_CURVE_EXPONENT,
            max_level: MAX_LEVEL,
            starting_stats: StartingStats::default(),
            level_growth: StatGrowth::default(),
            crit_chance: BASE_CRIT_CHANCE,
            crit_multiplier: BASE_CRIT_MULTIPLIER,
            overflow_crit_multiplier: OVERFLOW_CRIT_MULTIPLIER,
            linear_strength_coef: LINEAR_STRENGTH_COEF,
            quadratic_skill_coef: QUADRATIC_SKILL_COEF,
            exponential_skill_base: EXPONENTIAL_SKILL_BASE,
            base_skill: BASE_SKILL,
            min_damage_fraction: MIN_DAMAGE_FRACTION,
            hit_chance_floor: HIT_CHANCE_FLOOR,
            hit_chance_cap: HIT_CHANCE_CAP,
            evade_per_agility: EVADE_PER_AGILITY,
            net_dps_epsilon: NET_DPS_EPSILON,
            stances: StanceTable::default(),
            gold_drop_multiplier: GOLD_DROP_MULTIPLIER,
            fragment_drop_rate: FRAGMENT_DROP_RATE,
            fragment_base_amount: FRAGMENT_BASE_AMOUNT,
            fragment_drop_multiplier: FRAGMENT_DROP_MULTIPLIER,
            loot_boost_multiplier: LOOT_BOOST_MULTIPLIER,
            loot_boost_cap: LOOT_BOOST_CAP,
            rarity_weights: RARITY_WEIGHTS,
            solo_encounter_weight: SOLO_ENCOUNTER_WEIGHT,
            inventory_capacity: INVENTORY_CAPACITY,
            merge_threshold: MERGE_THRESHOLD,
            merge_max_depth: MERGE_MAX_DEPTH,
            prestige_base_factor: PRESTIGE_MULT_BASE_FACTOR,
            prestige_exponent: PRESTIGE_MULT_EXPONENT,
            prestige_min_zone: PRESTIGE_MIN_ZONE,
            offline_max_seconds: OFFLINE_MAX_SECONDS,
            offline_min_seconds: OFFLINE_MIN_SECONDS,
            boss_kills_base: BOSS_KILLS_BASE,
            boss_kills_per_zone: BOSS_KILLS_PER_ZONE,
            boss_hp_multiplier: BOSS_HP_MULTIPLIER,
            boss_attack_multiplier: BOSS_ATTACK_MULTIPLIER,
            boss_reward_multiplier: BOSS_REWARD_MULTIPLIER,
            zone_scaling: ZoneScaling::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be > 0, got {}", value)))
    }
}

fn require_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be within [0, 1], got {}", value)))
    }
}

impl GameConfig {
    /// Parses and validates a JSON config. Absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Rejects values that would break formula invariants (non-increasing XP
    /// curve, zero intervals, unbounded merges).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.xp_curve_base < 1.0 {
            return Err(invalid("xp_curve_base", "must be >= 1"));
        }
        if self.xp_curve_exponent < 1.0 {
            return Err(invalid("xp_curve_exponent", "must be >= 1"));
        }
        if self.max_level < 2 {
            return Err(invalid("max_level", "must be >= 2"));
        }

        require_positive("auto_attack_interval_ms", self.auto_attack_interval_ms)?;
        require_positive("min_attack_interval_ms", self.min_attack_interval_ms)?;
        require_positive("regen_tick_ms", self.regen_tick_ms)?;
        require_positive("dot_tick_ms", self.dot_tick_ms)?;
        require_positive("enemy_base_attack_interval_secs", self.enemy_base_attack_interval_secs)?;
        require_positive("enemy_min_attack_interval_secs", self.enemy_min_attack_interval_secs)?;
        require_positive("net_dps_epsilon", self.net_dps_epsilon)?;
        require_positive("solo_encounter_weight", self.solo_encounter_weight)?;
        if self.spawn_delay_ms < 0.0 {
            return Err(invalid("spawn_delay_ms", "must be >= 0"));
        }

        require_probability("crit_chance", self.crit_chance)?;
        require_probability("hit_chance_floor", self.hit_chance_floor)?;
        require_probability("hit_chance_cap", self.hit_chance_cap)?;
        require_probability("fragment_drop_rate", self.fragment_drop_rate)?;
        require_probability("loot_boost_cap", self.loot_boost_cap)?;
        require_probability("min_damage_fraction", self.min_damage_fraction)?;
        if self.hit_chance_floor > self.hit_chance_cap {
            return Err(invalid("hit_chance_floor", "must not exceed hit_chance_cap"));
        }

        if self.rarity_weights.iter().any(|w| *w < 0.0)
            || self.rarity_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(invalid("rarity_weights", "must be non-negative with a positive sum"));
        }

        if self.inventory_capacity == 0 {
            return Err(invalid("inventory_capacity", "must be >= 1"));
        }
        if self.merge_threshold < 2 {
            return Err(invalid("merge_threshold", "must be >= 2"));
        }
        if self.merge_max_depth == 0 {
            return Err(invalid("merge_max_depth", "must be >= 1"));
        }

        if self.offline_min_seconds < 0.0 || self.offline_min_seconds > self.offline_max_seconds {
            return Err(invalid(
                "offline_min_seconds",
                "must be within [0, offline_max_seconds]",
            ));
        }

        Ok(())
    }
}
