//! Player stances.

use serde::{Deserialize, Serialize};

/// Combat mode trading damage dealt against damage taken and speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Stance {
    #[default]
    Balanced,
    Aggressive,
    Defensive,
}

impl Stance {
    pub fn all() -> [Stance; 3] {
        [Stance::Balanced, Stance::Aggressive, Stance::Defensive]
    }
}

/// Numeric effect of a stance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StanceEffect {
    /// Multiplies auto-attack damage. Click damage ignores it.
    pub damage_mult: f64,
    /// Fraction of incoming hit and DoT damage removed. Negative values
    /// increase damage taken. Thorns ignore it.
    pub damage_reduction: f64,
    /// Multiplies player attack speed.
    pub speed_mult: f64,
}

impl StanceEffect {
    pub const NEUTRAL: StanceEffect = StanceEffect {
        damage_mult: 1.0,
        damage_reduction: 0.0,
        speed_mult: 1.0,
    };

    /// Factor applied to incoming damage, never negative.
    pub fn taken_factor(&self) -> f64 {
        (1.0 - self.damage_reduction).max(0.0)
    }
}

/// Per-stance tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StanceTable {
    pub balanced: StanceEffect,
    pub aggressive: StanceEffect,
    pub defensive: StanceEffect,
}

impl Default for StanceTable {
    fn default() -> Self {
        Self {
            balanced: StanceEffect::NEUTRAL,
            aggressive: StanceEffect {
                damage_mult: 1.3,
                damage_reduction: -0.15,
                speed_mult: 1.1,
            },
            defensive: StanceEffect {
                damage_mult: 0.75,
                damage_reduction: 0.3,
                speed_mult: 0.9,
            },
        }
    }
}

impl StanceTable {
    pub fn effect(&self, stance: Stance) -> StanceEffect {
        match stance {
            Stance::Balanced => self.balanced,
            Stance::Aggressive => self.aggressive,
            Stance::Defensive => self.defensive,
        }
    }
}
