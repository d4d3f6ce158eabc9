//! Shared combat math for live combat and the offline estimator.
//!
//! These pure functions are the single source of the steady-state damage,
//! hit-chance and time-to-kill numbers. Live combat resolves individual
//! attacks with them and the offline estimator integrates them over time, so
//! the two paths cannot drift apart.

use super::types::EnrageTrait;
use crate::character::derived_stats::DerivedStats;
use crate::core::config::GameConfig;
use crate::zones::encounters::EncounterProfile;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Player base damage formula, selected by the explicit damage tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DamageFormula {
    /// `str * linear_coef + weapon`
    #[default]
    Linear,
    /// `str^2 + skill * quadratic_coef * weapon^2`
    Quadratic,
    /// `str + weapon * exp_base^skill`
    Exponential,
}

impl DamageFormula {
    pub fn base_damage(&self, strength: f64, weapon: f64, skill: f64, config: &GameConfig) -> f64 {
        let damage = match self {
            DamageFormula::Linear => strength * config.linear_strength_coef + weapon,
            DamageFormula::Quadratic => {
                strength * strength + skill * config.quadratic_skill_coef * weapon * weapon
            }
            DamageFormula::Exponential => {
                strength + weapon * config.exponential_skill_base.powf(skill)
            }
        };
        if damage.is_finite() {
            damage.max(0.0)
        } else {
            f64::MAX
        }
    }
}

/// Chance that an attacker with `accuracy` lands a hit on a defender with
/// `evade`, clamped to the configured floor and cap.
pub fn hit_chance(accuracy: f64, evade: f64, config: &GameConfig) -> f64 {
    let total = accuracy.max(0.0) + evade.max(0.0);
    let raw = if total > 0.0 {
        accuracy.max(0.0) / total
    } else {
        config.hit_chance_cap
    };
    raw.clamp(config.hit_chance_floor, config.hit_chance_cap)
}

pub fn dodge_chance(accuracy: f64, evade: f64, config: &GameConfig) -> f64 {
    1.0 - hit_chance(accuracy, evade, config)
}

/// Seconds between enemy attacks: `max(floor, base / attack_speed)`.
/// A non-positive speed never attacks.
pub fn enemy_attack_interval_secs(attack_speed: f64, config: &GameConfig) -> f64 {
    if attack_speed <= 0.0 {
        return f64::INFINITY;
    }
    (config.enemy_base_attack_interval_secs / attack_speed).max(config.enemy_min_attack_interval_secs)
}

/// Damage per landed enemy hit after armor-penetration-adjusted defense.
pub fn per_hit_damage(attack: f64, defense: f64, armor_pen: f64) -> f64 {
    let pen = armor_pen.clamp(0.0, 1.0);
    (attack - defense * (1.0 - pen)).max(0.0)
}

/// Time-weighted DPS multiplier of an enrage trait:
/// `(1 - t) + t * attack_mult * speed_mult`.
pub fn enrage_multiplier(enrage: Option<&EnrageTrait>) -> f64 {
    match enrage {
        Some(e) => {
            let t = e.threshold.clamp(0.0, 1.0);
            (1.0 - t) + t * e.attack_mult * e.speed_mult
        }
        None => 1.0,
    }
}

/// Player damage after the target's defense, never below
/// `min_damage_fraction` of the unmitigated value.
pub fn mitigated_damage(base: f64, target_defense: f64, config: &GameConfig) -> f64 {
    (base - target_defense).max(base * config.min_damage_fraction).max(0.0)
}

/// Average damage factor of a crit roll.
pub fn expected_crit_factor(crit_chance: f64, crit_multiplier: f64) -> f64 {
    1.0 + crit_chance.clamp(0.0, 1.0) * (crit_multiplier - 1.0)
}

/// Outcome of one player attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRoll {
    pub damage: f64,
    pub crit: bool,
}

/// Rolls one player attack.
///
/// `floor(mitigated(base) * multiplier * crit)`. `multiplier` already holds
/// the auto or click multiplier and prestige. A `forced_crit` always crits.
pub fn roll_player_hit(
    base: f64,
    multiplier: f64,
    stats: &DerivedStats,
    forced_crit: bool,
    target_defense: f64,
    config: &GameConfig,
    rng: &mut impl Rng,
) -> HitRoll {
    let crit = forced_crit || rng.gen::<f64>() < stats.crit_chance;
    let crit_factor = if crit { stats.crit_multiplier } else { 1.0 };
    let raw = mitigated_damage(base, target_defense, config) * multiplier * crit_factor;
    HitRoll {
        damage: if raw.is_finite() { raw.floor() } else { f64::MAX },
        crit,
    }
}

/// Expected auto-attack damage per swing against `target_defense`.
pub fn expected_auto_hit(stats: &DerivedStats, target_defense: f64, config: &GameConfig) -> f64 {
    mitigated_damage(stats.base_damage, target_defense, config)
        * stats.auto_multiplier
        * expected_crit_factor(stats.crit_chance, stats.crit_multiplier)
}

/// Steady-state fight forecast between the player and an encounter profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatOutlook {
    pub hit_chance: f64,
    /// Hit-based DPS after enrage and stance reduction.
    pub enemy_hit_dps: f64,
    pub enemy_dot_dps: f64,
    pub thorns_dps: f64,
    /// Total incoming DPS minus player regen, floored at epsilon.
    pub net_enemy_dps: f64,
    pub time_to_death: f64,
    pub player_dps: f64,
    pub net_player_dps: f64,
    /// `INFINITY` when the player cannot out-damage enemy regen.
    pub time_to_kill: f64,
    /// `time_to_death / time_to_kill`; >= 1 means winnable.
    pub survival_ratio: f64,
}

impl CombatOutlook {
    pub fn is_winnable(&self) -> bool {
        self.survival_ratio >= 1.0
    }

    pub fn is_unkillable(&self) -> bool {
        self.time_to_kill.is_infinite()
    }
}

/// Computes the steady-state forecast. Degenerate inputs produce infinite
/// times, never NaN.
pub fn evaluate(stats: &DerivedStats, profile: &EncounterProfile, config: &GameConfig) -> CombatOutlook {
    let hit = hit_chance(profile.accuracy, stats.evade, config);
    let per_hit = per_hit_damage(profile.attack_per_hit, stats.defense, profile.armor_pen);
    let taken = stats.damage_taken_factor;

    let enemy_hit_dps = per_hit * hit * profile.attack_rate * profile.enrage_mult * taken;
    let enemy_dot_dps = profile.dot * taken;
    let thorns_dps = profile.thorns / stats.attack_interval_secs();

    let total = enemy_hit_dps + enemy_dot_dps + thorns_dps;
    let net_enemy_dps = (total - stats.regen).max(config.net_dps_epsilon);
    let time_to_death = stats.max_hp / net_enemy_dps;

    let player_dps = expected_auto_hit(stats, profile.defense, config) / stats.attack_interval_secs();
    let net_player_dps = player_dps - profile.regen;
    let time_to_kill = if net_player_dps <= 0.0 || !net_player_dps.is_finite() {
        if net_player_dps.is_infinite() && net_player_dps > 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        profile.hp / net_player_dps
    };

    let survival_ratio = if time_to_kill.is_infinite() {
        0.0
    } else if time_to_kill <= 0.0 {
        f64::INFINITY
    } else {
        time_to_death / time_to_kill
    };

    CombatOutlook {
        hit_chance: hit,
        enemy_hit_dps,
        enemy_dot_dps,
        thorns_dps,
        net_enemy_dps,
        time_to_death,
        player_dps,
        net_player_dps,
        time_to_kill,
        survival_ratio,
    }
}
