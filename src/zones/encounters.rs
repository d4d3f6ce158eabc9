//! Weighted encounter pools and their steady-state profiles.
//!
//! A zone's pool holds every authored encounter valid there plus a synthesized
//! solo encounter for each valid enemy that no authored encounter includes.
//! Live combat draws from the pool by weight; the offline estimator collapses
//! the pool into one weight-averaged [`EncounterProfile`].

use super::content::{ContentDb, ContentError};
use super::data::{zone_scale, ZoneScale};
use crate::combat::math::{enemy_attack_interval_secs, enrage_multiplier};
use crate::combat::types::{CombatError, EnemyTemplate, ScaledEnemy};
use crate::core::config::GameConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::error;

fn one() -> f64 {
    1.0
}

/// Authored (or synthesized solo) group of enemies fought together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterTemplate {
    pub id: String,
    /// Enemy ids in spawn order.
    pub members: Vec<String>,
    pub weight: f64,
    pub min_zone: u32,
    pub max_zone: u32,
    #[serde(default = "one")]
    pub attack_speed_mult: f64,
    #[serde(default = "one")]
    pub reward_mult: f64,
    /// Multiplies the area drop chance.
    #[serde(default = "one")]
    pub loot_bonus: f64,
}

impl EncounterTemplate {
    pub fn valid_in_zone(&self, zone: u32) -> bool {
        (self.min_zone..=self.max_zone).contains(&zone)
    }

    /// Single-member template for an enemy without an authored group.
    pub fn solo(enemy: &EnemyTemplate, zone: u32, config: &GameConfig) -> Self {
        Self {
            id: format!("solo:{}", enemy.id),
            members: vec![enemy.id.clone()],
            weight: config.solo_encounter_weight,
            min_zone: zone,
            max_zone: zone,
            attack_speed_mult: 1.0,
            reward_mult: 1.0,
            loot_bonus: 1.0,
        }
    }
}

/// Authored boss for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossTemplate {
    pub id: String,
    pub base_enemy: String,
    pub zone: u32,
    pub hp_mult: f64,
    pub attack_mult: f64,
    pub reward_mult: f64,
}

/// Builds the weighted pool for `zone`. An empty pool is a content defect.
pub fn encounter_pool(
    content: &ContentDb,
    zone: u32,
    config: &GameConfig,
) -> Result<Vec<EncounterTemplate>, CombatError> {
    let mut pool: Vec<EncounterTemplate> = content
        .encounters()
        .iter()
        .filter(|e| e.valid_in_zone(zone) && e.weight > 0.0)
        .cloned()
        .collect();

    let covered: BTreeSet<&str> = pool
        .iter()
        .flat_map(|e| e.members.iter().map(String::as_str))
        .collect();
    let solos: Vec<EncounterTemplate> = content
        .enemies()
        .iter()
        .filter(|e| e.valid_in_zone(zone) && !covered.contains(e.id.as_str()))
        .map(|e| EncounterTemplate::solo(e, zone, config))
        .collect();
    pool.extend(solos);

    if pool.is_empty() {
        error!(zone, "encounter pool is empty");
        return Err(CombatError::EmptyPool(zone));
    }
    Ok(pool)
}

/// Weighted random choice from the pool.
pub fn choose_encounter<'a>(
    pool: &'a [EncounterTemplate],
    rng: &mut impl Rng,
) -> Option<&'a EncounterTemplate> {
    crate::core::weighted::pick_weighted(pool, |e| e.weight, rng)
}

/// Boss stats for a zone: the authored boss, or one synthesized from the
/// first pool member with the configured boss multipliers.
pub fn boss_for_zone(
    content: &ContentDb,
    zone: u32,
    config: &GameConfig,
) -> Result<BossTemplate, CombatError> {
    if let Some(boss) = content.bosses().iter().find(|b| b.zone == zone) {
        return Ok(boss.clone());
    }
    let pool = encounter_pool(content, zone, config)?;
    let base_enemy = pool
        .first()
        .and_then(|e| e.members.first())
        .cloned()
        .ok_or(CombatError::EmptyPool(zone))?;
    Ok(BossTemplate {
        id: format!("boss:{}:{}", zone, base_enemy),
        base_enemy,
        zone,
        hp_mult: config.boss_hp_multiplier,
        attack_mult: config.boss_attack_multiplier,
        reward_mult: config.boss_reward_multiplier,
    })
}

/// Applies zone scaling and the encounter's attack speed multiplier.
///
/// HP and regen follow the HP factor; attack, defense, DoT and thorns follow
/// the attack factor. Accuracy and armor penetration are not scaled.
pub fn scale_enemy(enemy: &EnemyTemplate, scale: &ZoneScale, attack_speed_mult: f64) -> ScaledEnemy {
    ScaledEnemy {
        enemy_id: enemy.id.clone(),
        name: enemy.name.clone(),
        max_hp: enemy.hp * scale.hp,
        attack: enemy.attack * scale.attack,
        defense: enemy.defense * scale.attack,
        armor_pen: enemy.armor_pen,
        accuracy: enemy.accuracy,
        attack_speed: enemy.attack_speed * attack_speed_mult,
        dot_per_second: enemy.dot_per_second.unwrap_or(0.0) * scale.attack,
        regen: enemy.regen * scale.hp,
        thorns: enemy.thorns * scale.attack,
        enrage: enemy.enrage,
        gold: enemy.gold * scale.gold,
        xp: enemy.xp * scale.xp,
    }
}

fn scale_for(content: &ContentDb, zone: u32, config: &GameConfig) -> Result<ZoneScale, CombatError> {
    let area = content
        .area_for_zone(zone)
        .ok_or(CombatError::UnknownZone(zone))?;
    Ok(zone_scale(area, zone, config))
}

/// Scaled members of one encounter template in `zone`.
pub fn build_members(
    content: &ContentDb,
    template: &EncounterTemplate,
    zone: u32,
    config: &GameConfig,
) -> Result<Vec<ScaledEnemy>, CombatError> {
    let scale = scale_for(content, zone, config)?;
    template
        .members
        .iter()
        .map(|id| {
            content
                .enemy(id)
                .map(|e| scale_enemy(e, &scale, template.attack_speed_mult))
                .ok_or_else(|| {
                    CombatError::from(ContentError::UnknownEnemy {
                        referenced_by: template.id.clone(),
                        id: id.clone(),
                    })
                })
        })
        .collect()
}

/// Scaled single boss member.
pub fn build_boss(
    content: &ContentDb,
    boss: &BossTemplate,
    config: &GameConfig,
) -> Result<ScaledEnemy, CombatError> {
    let scale = scale_for(content, boss.zone, config)?;
    let enemy = content
        .enemy(&boss.base_enemy)
        .ok_or_else(|| ContentError::UnknownEnemy {
            referenced_by: boss.id.clone(),
            id: boss.base_enemy.clone(),
        })?;
    let mut member = scale_enemy(enemy, &scale, 1.0);
    member.max_hp *= boss.hp_mult;
    member.regen *= boss.hp_mult;
    member.attack *= boss.attack_mult;
    member.gold *= boss.reward_mult;
    member.xp *= boss.reward_mult;
    Ok(member)
}

/// Aggregate steady-state view of one encounter or a whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncounterProfile {
    pub member_count: f64,
    /// Total HP; every member must die.
    pub hp: f64,
    /// Attack-rate-weighted average damage per attack.
    pub attack_per_hit: f64,
    /// Combined attacks per second.
    pub attack_rate: f64,
    /// Attack-rate-weighted.
    pub accuracy: f64,
    /// Attack-rate-weighted.
    pub armor_pen: f64,
    /// HP-weighted, since damage is spread over members by HP.
    pub defense: f64,
    pub regen: f64,
    pub thorns: f64,
    pub dot: f64,
    /// Mean enrage multiplier over members.
    pub enrage_mult: f64,
    /// Gold per encounter before player multipliers.
    pub gold: f64,
    /// XP per encounter before player multipliers.
    pub xp: f64,
    /// Expected fragments per encounter before player multipliers.
    pub fragments: f64,
    pub loot_bonus: f64,
}

fn weighted_mean(pairs: impl Iterator<Item = (f64, f64)>) -> f64 {
    let (sum, weight) = pairs.fold((0.0, 0.0), |(s, w), (v, wt)| (s + v * wt, w + wt));
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

/// Collapses live members into one profile.
pub fn encounter_profile(
    members: &[ScaledEnemy],
    reward_mult: f64,
    loot_bonus: f64,
    config: &GameConfig,
) -> EncounterProfile {
    let rates: Vec<f64> = members
        .iter()
        .map(|m| {
            let interval = enemy_attack_interval_secs(m.attack_speed, config);
            if interval.is_finite() {
                1.0 / interval
            } else {
                0.0
            }
        })
        .collect();
    let by_rate = |f: fn(&ScaledEnemy) -> f64| {
        weighted_mean(members.iter().zip(&rates).map(|(m, r)| (f(m), *r)))
    };
    let count = members.len() as f64;

    EncounterProfile {
        member_count: count,
        hp: members.iter().map(|m| m.max_hp).sum(),
        attack_per_hit: by_rate(|m| m.attack),
        attack_rate: rates.iter().sum(),
        accuracy: by_rate(|m| m.accuracy),
        armor_pen: by_rate(|m| m.armor_pen),
        defense: weighted_mean(members.iter().map(|m| (m.defense, m.max_hp))),
        regen: members.iter().map(|m| m.regen).sum(),
        thorns: members.iter().map(|m| m.thorns).sum(),
        dot: members.iter().map(|m| m.dot_per_second).sum(),
        enrage_mult: if members.is_empty() {
            1.0
        } else {
            members.iter().map(|m| enrage_multiplier(m.enrage.as_ref())).sum::<f64>() / count
        },
        gold: members.iter().map(|m| m.gold).sum::<f64>() * reward_mult,
        xp: members.iter().map(|m| m.xp).sum::<f64>() * reward_mult,
        fragments: count * config.fragment_drop_rate * config.fragment_base_amount * reward_mult,
        loot_bonus,
    }
}

/// Selection-weight-weighted average profile of the zone's whole pool.
pub fn pool_profile(
    content: &ContentDb,
    zone: u32,
    config: &GameConfig,
) -> Result<EncounterProfile, CombatError> {
    let pool = encounter_pool(content, zone, config)?;
    let mut weighted = Vec::with_capacity(pool.len());
    for template in &pool {
        let members = build_members(content, template, zone, config)?;
        let profile = encounter_profile(&members, template.reward_mult, template.loot_bonus, config);
        weighted.push((profile, template.weight));
    }
    Ok(average_profiles(&weighted))
}

/// Weighted average of every profile field.
///
/// Per-hit fields are weighted by `weight * attack_rate` so that
/// `attack_per_hit * attack_rate` equals the weighted mean of each
/// profile's hit throughput.
pub fn average_profiles(weighted: &[(EncounterProfile, f64)]) -> EncounterProfile {
    let avg = |f: fn(&EncounterProfile) -> f64| weighted_mean(weighted.iter().map(|(p, w)| (f(p), *w)));
    let by_rate = |f: fn(&EncounterProfile) -> f64| {
        weighted_mean(weighted.iter().map(|(p, w)| (f(p), w * p.attack_rate)))
    };
    EncounterProfile {
        member_count: avg(|p| p.member_count),
        hp: avg(|p| p.hp),
        attack_per_hit: by_rate(|p| p.attack_per_hit),
        attack_rate: avg(|p| p.attack_rate),
        accuracy: by_rate(|p| p.accuracy),
        armor_pen: by_rate(|p| p.armor_pen),
        defense: avg(|p| p.defense),
        regen: avg(|p| p.regen),
        thorns: avg(|p| p.thorns),
        dot: avg(|p| p.dot),
        enrage_mult: by_rate(|p| p.enrage_mult),
        gold: avg(|p| p.gold),
        xp: avg(|p| p.xp),
        fragments: avg(|p| p.fragments),
        loot_bonus: avg(|p| p.loot_bonus),
    }
}
