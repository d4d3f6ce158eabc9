//! Area definitions and zone difficulty scaling.

use crate::core::config::GameConfig;
use serde::{Deserialize, Serialize};

/// A named, contiguous range of global zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: u32,
    pub name: String,
    pub first_zone: u32,
    pub last_zone: u32,
    /// Scaling factor at the area's first zone.
    pub base_multiplier: f64,
    /// Base loot drop chance per kill (0..=1).
    pub drop_chance: f64,
}

impl Area {
    pub fn contains(&self, zone: u32) -> bool {
        (self.first_zone..=self.last_zone).contains(&zone)
    }

    /// Zero-based position of `zone` within the area.
    pub fn local_index(&self, zone: u32) -> u32 {
        zone.saturating_sub(self.first_zone)
    }
}

/// Multipliers applied to enemy stats and rewards in one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneScale {
    pub hp: f64,
    pub attack: f64,
    pub gold: f64,
    pub xp: f64,
}

impl ZoneScale {
    pub const IDENTITY: ZoneScale = ZoneScale {
        hp: 1.0,
        attack: 1.0,
        gold: 1.0,
        xp: 1.0,
    };
}

/// `area.base_multiplier * growth^(local index)` for each scaled quantity.
pub fn zone_scale(area: &Area, zone: u32, config: &GameConfig) -> ZoneScale {
    let i = area.local_index(zone) as i32;
    let growth = &config.zone_scaling;
    let base = area.base_multiplier;
    ZoneScale {
        hp: base * growth.hp_growth.powi(i),
        attack: base * growth.attack_growth.powi(i),
        gold: base * growth.gold_growth.powi(i),
        xp: base * growth.xp_growth.powi(i),
    }
}

/// Normal kills needed in `zone` before its boss appears.
pub fn kills_for_boss(zone: u32, config: &GameConfig) -> u32 {
    config.boss_kills_base + config.boss_kills_per_zone * zone.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(first: u32, last: u32, base: f64) -> Area {
        Area {
            id: 1,
            name: "Test".to_string(),
            first_zone: first,
            last_zone: last,
            base_multiplier: base,
            drop_chance: 0.1,
        }
    }

    #[test]
    fn test_first_zone_uses_base_multiplier() {
        let config = GameConfig::default();
        let scale = zone_scale(&area(11, 20, 8.0), 11, &config);
        assert_eq!(scale.hp, 8.0);
        assert_eq!(scale.gold, 8.0);
    }

    #[test]
    fn test_scaling_is_monotonic_within_area() {
        let config = GameConfig::default();
        let a = area(1, 10, 1.0);
        for zone in 1..10 {
            let here = zone_scale(&a, zone, &config);
            let next = zone_scale(&a, zone + 1, &config);
            assert!(next.hp > here.hp);
            assert!(next.attack > here.attack);
            assert!(next.xp > here.xp);
        }
    }

    #[test]
    fn test_boss_threshold_grows_per_zone() {
        let config = GameConfig::default();
        assert_eq!(kills_for_boss(1, &config), config.boss_kills_base);
        assert_eq!(
            kills_for_boss(5, &config),
            config.boss_kills_base + 4 * config.boss_kills_per_zone
        );
    }
}
