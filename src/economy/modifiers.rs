//! Buff aggregation from purchased upgrades and conquered territories.
//!
//! Each source contributes `level * per_level` to a `(target, kind)` bucket
//! (territories count as level 1). Multiplicative buckets report `1 + sum`;
//! flat buckets report the raw `sum`. Upgrade and territory multipliers are
//! kept apart so stat derivation can compose them as separate factors.

use crate::state::player::PlayerState;
use crate::zones::content::ContentDb;
use serde::{Deserialize, Serialize};

/// Stat a buff applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierTarget {
    Damage,
    ClickDamage,
    AttackSpeed,
    CritChance,
    Gold,
    Xp,
    Fragments,
    MaxHp,
    Strength,
    Defense,
    Agility,
    Regen,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    Flat,
    Multiplicative,
}

/// A buff descriptor: `value` per level (or once, for territories).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub target: ModifierTarget,
    pub kind: EffectKind,
    pub value: f64,
}

impl Effect {
    fn matches(&self, target: ModifierTarget, kind: EffectKind) -> bool {
        self.target == target && self.kind == kind
    }
}

/// Sum of `level * value` over purchased upgrades.
pub fn upgrade_sum(
    state: &PlayerState,
    content: &ContentDb,
    target: ModifierTarget,
    kind: EffectKind,
) -> f64 {
    state
        .purchased_upgrades
        .iter()
        .filter_map(|(id, level)| content.upgrade(id).map(|u| (u, *level)))
        .filter(|(u, _)| u.effect.matches(target, kind))
        .map(|(u, level)| level as f64 * u.effect.value)
        .sum()
}

/// Sum of buff values over conquered territories.
pub fn territory_sum(
    state: &PlayerState,
    content: &ContentDb,
    target: ModifierTarget,
    kind: EffectKind,
) -> f64 {
    state
        .conquered_territories
        .iter()
        .filter_map(|id| content.territory(id))
        .filter(|t| t.buff.matches(target, kind))
        .map(|t| t.buff.value)
        .sum()
}

/// Aggregated buffs for one player snapshot.
///
/// Borrowing wrapper so derivation code reads as `mods.flat(Strength)`.
pub struct Modifiers<'a> {
    state: &'a PlayerState,
    content: &'a ContentDb,
}

impl<'a> Modifiers<'a> {
    pub fn new(state: &'a PlayerState, content: &'a ContentDb) -> Self {
        Self { state, content }
    }

    /// `1 + sum` over upgrades only.
    pub fn upgrade_multiplier(&self, target: ModifierTarget) -> f64 {
        1.0 + upgrade_sum(self.state, self.content, target, EffectKind::Multiplicative)
    }

    /// `1 + sum` over territories only.
    pub fn territory_multiplier(&self, target: ModifierTarget) -> f64 {
        1.0 + territory_sum(self.state, self.content, target, EffectKind::Multiplicative)
    }

    /// Upgrade multiplier times territory multiplier.
    pub fn multiplier(&self, target: ModifierTarget) -> f64 {
        self.upgrade_multiplier(target) * self.territory_multiplier(target)
    }

    /// Flat bonus from upgrades and territories combined.
    pub fn flat(&self, target: ModifierTarget) -> f64 {
        upgrade_sum(self.state, self.content, target, EffectKind::Flat)
            + territory_sum(self.state, self.content, target, EffectKind::Flat)
    }
}
