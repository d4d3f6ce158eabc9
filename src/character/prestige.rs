use crate::core::bignum::BigNum;
use crate::core::config::GameConfig;
use crate::state::player::{AreaProgress, PlayerState, PlayerStats};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrestigeError {
    #[error("prestige requires zone {required}, furthest reached is {furthest}")]
    NotEligible { furthest: u32, required: u32 },
}

/// Damage and reward multiplier for a prestige count.
///
/// # Multiplier Formula
/// Diminishing returns: `1 + base_factor * count^exponent`. With the default
/// tuning P1 is 1.5x and P10 is about 3.5x.
pub fn prestige_multiplier(count: u32, config: &GameConfig) -> f64 {
    1.0 + config.prestige_base_factor * (count as f64).powf(config.prestige_exponent)
}

/// Checks if the player can prestige
///
/// # Returns
/// true once the furthest zone reached meets `prestige_min_zone`
pub fn can_prestige(state: &PlayerState, config: &GameConfig) -> bool {
    state.furthest_zone() >= config.prestige_min_zone
}

pub fn check_prestige(state: &PlayerState, config: &GameConfig) -> Result<(), PrestigeError> {
    if can_prestige(state, config) {
        Ok(())
    } else {
        Err(PrestigeError::NotEligible {
            furthest: state.furthest_zone(),
            required: config.prestige_min_zone,
        })
    }
}

/// Resets run progress and increments the prestige count.
///
/// Level, XP, base stats, HP, zone progress, gold and per-enemy kill counters
/// start over. Inventory, equipment, upgrades, fragments, territories, cheats
/// and flags carry into the next run.
pub(crate) fn reset_for_prestige(state: &mut PlayerState, config: &GameConfig) {
    state.player_stats = PlayerStats::new(config);
    state.current_hp = state.player_stats.hp;
    state.gold = BigNum::zero();
    state.current_area = 1;
    state.current_zone = 1;
    state.area_progress = BTreeMap::from([(
        1,
        AreaProgress {
            furthest_zone: 1,
            ..Default::default()
        },
    )]);
    state.enemy_kills.clear();
    state.forced_crit = false;
    state.prestige_count += 1;

    info!(count = state.prestige_count, "prestige reset applied");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::types::{Rarity, Stack, StackKey};
    use crate::state::player::Cheat;

    #[test]
    fn test_multiplier_expected_values() {
        let config = GameConfig::default();
        assert_eq!(prestige_multiplier(0, &config), 1.0);
        assert!((prestige_multiplier(1, &config) - 1.5).abs() < 1e-12);
        let p10 = prestige_multiplier(10, &config);
        assert!(p10 > 3.4 && p10 < 3.6, "P10 should be ~3.5x, got {p10}");
    }

    #[test]
    fn test_multiplier_diminishing_returns() {
        let config = GameConfig::default();
        let gain_early = prestige_multiplier(2, &config) - prestige_multiplier(1, &config);
        let gain_late = prestige_multiplier(21, &config) - prestige_multiplier(20, &config);
        assert!(gain_late < gain_early);
    }

    #[test]
    fn test_can_prestige_requires_zone() {
        let config = GameConfig::default();
        let mut state = PlayerState::new(&config);
        assert!(!can_prestige(&state, &config));
        assert_eq!(
            check_prestige(&state, &config),
            Err(PrestigeError::NotEligible {
                furthest: 1,
                required: config.prestige_min_zone
            })
        );

        state
            .area_progress
            .entry(1)
            .or_default()
            .furthest_zone = config.prestige_min_zone;
        assert!(can_prestige(&state, &config));
    }

    #[test]
    fn test_reset_keeps_permanent_progress() {
        let config = GameConfig::default();
        let mut state = PlayerState::new(&config);
        let key = StackKey::new("rusty_sword", Rarity::Rare);
        state.inventory_stacks.insert(
            key.clone(),
            Stack {
                count: 3,
                rarity: Rarity::Rare,
            },
        );
        state.purchased_upgrades.insert("sharpen".into(), 4);
        state.conquered_territories.insert("wolf_den".into());
        state.unlocked_cheats.insert(Cheat::LootMagnet);
        state.flags.insert("overflow".into(), true);
        state.fragments = BigNum::from(12u64);
        state.gold = BigNum::from(5_000u64);
        state.player_stats.level = 30;
        state.player_stats.strength = 80.0;
        state.current_zone = 12;
        state.current_area = 2;
        state.enemy_kills.insert("wolf".into(), 99);

        reset_for_prestige(&mut state, &config);

        assert_eq!(state.prestige_count, 1);
        assert_eq!(state.player_stats.level, 1);
        assert_eq!(state.player_stats.strength, config.starting_stats.strength);
        assert!(state.gold.is_zero());
        assert_eq!((state.current_area, state.current_zone), (1, 1));
        assert!(state.enemy_kills.is_empty());

        assert_eq!(state.stack_count(&key), 3);
        assert_eq!(state.upgrade_level("sharpen"), 4);
        assert!(state.conquered_territories.contains("wolf_den"));
        assert!(state.unlocked_cheats.contains(&Cheat::LootMagnet));
        assert!(state.flag("overflow"));
        assert_eq!(state.fragments, BigNum::from(12u64));
    }
}
