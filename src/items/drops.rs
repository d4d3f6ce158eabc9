use super::types::{Rarity, StackKey};
use crate::combat::types::LootEntry;
use crate::core::config::GameConfig;
use crate::core::weighted::pick_weighted;
use rand::Rng;

/// Per-kill drop chance.
///
/// `area_chance × loot_bonus`; with the loot magnet active the chance is
/// boosted by `loot_boost_multiplier` up to `loot_boost_cap`, but the boost
/// never lowers a chance that already exceeds the cap.
pub fn drop_chance(area_chance: f64, loot_bonus: f64, magnet: bool, config: &GameConfig) -> f64 {
    let chance = area_chance * loot_bonus;
    let chance = if magnet {
        chance.max((chance * config.loot_boost_multiplier).min(config.loot_boost_cap))
    } else {
        chance
    };
    chance.clamp(0.0, 1.0)
}

/// Weighted rarity roll using `config.rarity_weights`.
pub fn roll_rarity(config: &GameConfig, rng: &mut impl Rng) -> Rarity {
    let weighted: Vec<(Rarity, f64)> = Rarity::ALL
        .iter()
        .copied()
        .zip(config.rarity_weights.iter().copied())
        .collect();
    pick_weighted(&weighted, |(_, w)| *w, rng)
        .map(|(r, _)| *r)
        .unwrap_or_default()
}

/// Rolls for a drop from `table`.
///
/// # Returns
/// The stack key of the dropped item, or `None` when the chance roll fails
/// or the table has no usable entry.
pub fn roll_loot(
    table: &[LootEntry],
    chance: f64,
    config: &GameConfig,
    rng: &mut impl Rng,
) -> Option<StackKey> {
    if table.is_empty() || rng.gen::<f64>() >= chance {
        return None;
    }
    let entry = pick_weighted(table, |e| e.weight, rng)?;
    let rarity = roll_rarity(config, rng);
    Some(StackKey::new(entry.item_id.clone(), rarity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table() -> Vec<LootEntry> {
        vec![
            LootEntry {
                item_id: "sword".into(),
                weight: 3.0,
            },
            LootEntry {
                item_id: "ring".into(),
                weight: 1.0,
            },
        ]
    }

    #[test]
    fn test_drop_chance_applies_loot_bonus() {
        let config = GameConfig::default();
        assert!((drop_chance(0.1, 1.5, false, &config) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_magnet_boost_is_capped() {
        let config = GameConfig {
            loot_boost_multiplier: 10.0,
            loot_boost_cap: 0.5,
            ..Default::default()
        };
        assert_eq!(drop_chance(0.1, 1.0, true, &config), 0.5);
        // Already above the cap: the boost does not reduce it.
        assert_eq!(drop_chance(0.8, 1.0, true, &config), 0.8);
    }

    #[test]
    fn test_drop_chance_never_exceeds_one() {
        let config = GameConfig::default();
        assert_eq!(drop_chance(0.9, 5.0, false, &config), 1.0);
    }

    #[test]
    fn test_rarity_distribution_follows_weights() {
        let config = GameConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut counts = [0u32; 5];
        for _ in 0..20_000 {
            counts[roll_rarity(&config, &mut rng) as usize] += 1;
        }
        assert!(counts[0] > counts[1], "common should dominate: {counts:?}");
        assert!(counts[1] > counts[2], "{counts:?}");
        assert!(counts[2] > counts[4], "{counts:?}");
        assert!(counts[4] > 0, "legendary should appear in 20k rolls");
    }

    #[test]
    fn test_zero_weight_rarity_never_rolls() {
        let config = GameConfig {
            rarity_weights: [0.0, 0.0, 1.0, 0.0, 0.0],
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            assert_eq!(roll_rarity(&config, &mut rng), Rarity::Rare);
        }
    }

    #[test]
    fn test_roll_loot_respects_chance() {
        let config = GameConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            assert!(roll_loot(&table(), 0.0, &config, &mut rng).is_none());
        }
        let drop = roll_loot(&table(), 1.0, &config, &mut rng).unwrap();
        assert!(drop.item_id == "sword" || drop.item_id == "ring");
    }

    #[test]
    fn test_roll_loot_empty_table() {
        let config = GameConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(roll_loot(&[], 1.0, &config, &mut rng).is_none());
    }

    #[test]
    fn test_roll_loot_item_weights() {
        let config = GameConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let swords = (0..4_000)
            .filter_map(|_| roll_loot(&table(), 1.0, &config, &mut rng))
            .filter(|k| k.item_id == "sword")
            .count();
        assert!(
            (2_700..3_300).contains(&swords),
            "expected ~75% swords, got {swords}"
        );
    }
}
