use crate::zones::content::ContentError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CombatError {
    #[error("zone {0} is not covered by any area")]
    UnknownZone(u32),

    #[error("no enemies available in zone {0}")]
    EmptyPool(u32),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Enemy attack boost that kicks in at low HP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrageTrait {
    /// HP fraction at or below which the enemy enrages (0..=1).
    pub threshold: f64,
    pub attack_mult: f64,
    pub speed_mult: f64,
}

/// One weighted entry in an enemy's loot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: String,
    pub weight: f64,
}

/// Static enemy definition at zone factor 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    pub hp: f64,
    pub attack: f64,
    #[serde(default)]
    pub defense: f64,
    /// Fraction of the player's defense ignored (0..=1).
    #[serde(default)]
    pub armor_pen: f64,
    pub accuracy: f64,
    /// Attacks per enemy base interval; 1.0 is one attack every base interval.
    #[serde(default = "default_attack_speed")]
    pub attack_speed: f64,
    /// Damage per second that bypasses hit chance and defense.
    #[serde(default)]
    pub dot_per_second: Option<f64>,
    /// HP regenerated per second.
    #[serde(default)]
    pub regen: f64,
    /// Damage returned to the player per auto attack.
    #[serde(default)]
    pub thorns: f64,
    #[serde(default)]
    pub enrage: Option<EnrageTrait>,
    pub min_zone: u32,
    pub max_zone: u32,
    pub gold: f64,
    pub xp: f64,
    #[serde(default)]
    pub loot_table: Vec<LootEntry>,
}

fn default_attack_speed() -> f64 {
    1.0
}

impl EnemyTemplate {
    pub fn valid_in_zone(&self, zone: u32) -> bool {
        (self.min_zone..=self.max_zone).contains(&zone)
    }
}

/// A live encounter member: template stats after zone, boss and encounter
/// scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledEnemy {
    pub enemy_id: String,
    pub name: String,
    pub max_hp: f64,
    pub attack: f64,
    pub defense: f64,
    pub armor_pen: f64,
    pub accuracy: f64,
    pub attack_speed: f64,
    pub dot_per_second: f64,
    pub regen: f64,
    pub thorns: f64,
    pub enrage: Option<EnrageTrait>,
    pub gold: f64,
    pub xp: f64,
}

/// Combat state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombatPhase {
    #[default]
    Idle,
    EncounterActive,
    /// All members dead; waiting for the respawn delay.
    Resolved,
    /// Player HP hit zero. Nothing attacks until an explicit respawn.
    PlayerDefeated,
}
