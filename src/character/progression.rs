//! XP curve and level-up application.

use crate::core::bignum::BigNum;
use crate::core::config::GameConfig;
use crate::state::player::PlayerState;
use tracing::info;

/// XP required to go from `level` to `level + 1`.
///
/// `floor(xp_curve_base * level^xp_curve_exponent)`. With base >= 1 and
/// exponent >= 1 (enforced by `GameConfig::validate`) consecutive levels differ
/// by at least one, so the curve is strictly increasing.
pub fn xp_for_level(level: u32, config: &GameConfig) -> BigNum {
    let level = level.max(1) as f64;
    BigNum::from_f64(config.xp_curve_base * level.powf(config.xp_curve_exponent)).floor()
}

/// Outcome of [`apply_xp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelUpSummary {
    pub level_before: u32,
    pub level_after: u32,
}

impl LevelUpSummary {
    pub fn levels_gained(&self) -> u32 {
        self.level_after - self.level_before
    }
}

/// Adds XP and applies every level-up it pays for.
///
/// Each level subtracts the current threshold, applies per-level stat growth
/// and recomputes the next threshold. At `max_level` the leftover XP is
/// clamped just below the threshold. Either way the state leaves with
/// `xp < xp_to_next`. Negative amounts are ignored.
pub(crate) fn apply_xp(state: &mut PlayerState, amount: &BigNum, config: &GameConfig) -> LevelUpSummary {
    let stats = &mut state.player_stats;
    let level_before = stats.level;

    if !amount.is_negative() {
        stats.xp += amount;
    }

    while stats.xp >= stats.xp_to_next {
        if stats.level >= config.max_level {
            stats.xp = (&stats.xp_to_next - &BigNum::one()).non_negative();
            break;
        }

        stats.xp -= &stats.xp_to_next;
        stats.level += 1;

        let growth = &config.level_growth;
        stats.strength += growth.strength;
        stats.defense += growth.defense;
        stats.hp += growth.hp;
        stats.regen += growth.regen;
        stats.agility += growth.agility;
        state.current_hp += growth.hp;

        stats.xp_to_next = xp_for_level(stats.level, config);
    }

    let summary = LevelUpSummary {
        level_before,
        level_after: stats.level,
    };
    if summary.levels_gained() > 0 {
        info!(
            from = summary.level_before,
            to = summary.level_after,
            "level up"
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_curve_values() {
        let config = GameConfig::default();
        assert_eq!(xp_for_level(1, &config), BigNum::from(100u64));
        // 100 * 4^1.5 = 800
        assert_eq!(xp_for_level(4, &config), BigNum::from(800u64));
    }

    #[test]
    fn test_xp_curve_strictly_increasing() {
        let config = GameConfig::default();
        let mut prev = xp_for_level(1, &config);
        for level in 2..2000 {
            let next = xp_for_level(level, &config);
            assert!(next > prev, "curve must increase at level {}", level);
            prev = next;
        }
    }

    #[test]
    fn test_single_level_up_applies_growth() {
        let config = GameConfig::default();
        let mut state = PlayerState::new(&config);
        let str_before = state.player_stats.strength;

        let summary = apply_xp(&mut state, &BigNum::from(150u64), &config);

        assert_eq!(summary.levels_gained(), 1);
        assert_eq!(state.player_stats.level, 2);
        assert_eq!(state.player_stats.xp, BigNum::from(50u64));
        assert_eq!(
            state.player_stats.strength,
            str_before + config.level_growth.strength
        );
    }

    #[test]
    fn test_large_grant_levels_many_times() {
        let config = GameConfig::default();
        let mut state = PlayerState::new(&config);

        let summary = apply_xp(&mut state, &BigNum::from(1_000_000u64), &config);

        assert!(summary.levels_gained() > 5);
        assert!(state.player_stats.xp < state.player_stats.xp_to_next);
    }

    #[test]
    fn test_max_level_clamps_remainder() {
        let config = GameConfig {
            max_level: 3,
            ..Default::default()
        };
        let mut state = PlayerState::new(&config);

        apply_xp(&mut state, &"1e30".parse().unwrap(), &config);

        assert_eq!(state.player_stats.level, 3);
        assert!(state.player_stats.xp < state.player_stats.xp_to_next);
    }

    #[test]
    fn test_negative_grant_ignored() {
        let config = GameConfig::default();
        let mut state = PlayerState::new(&config);
        apply_xp(&mut state, &BigNum::from(-50i64), &config);
        assert!(state.player_stats.xp.is_zero());
    }

    #[test]
    fn test_level_up_raises_current_hp() {
        let config = GameConfig::default();
        let mut state = PlayerState::new(&config);
        state.current_hp = 40.0;
        apply_xp(&mut state, &BigNum::from(100u64), &config);
        assert_eq!(state.current_hp, 40.0 + config.level_growth.hp);
    }
}
