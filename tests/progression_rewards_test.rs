//! Integration test: leveling, auto-merge and purchases
//!
//! Exercises the invariants that must hold no matter how much XP or loot
//! arrives at once.

use grindstone::character::progression::xp_for_level;
use grindstone::economy::territory::TerritoryError;
use grindstone::economy::upgrades::{purchase_upgrade, PurchaseError};
use grindstone::items::inventory::AddItemOutcome;
use grindstone::items::types::{EquipmentSlot, ItemDef, ItemStats, Rarity, StackKey};
use grindstone::state::player::Cheat;
use grindstone::state::store::Store;
use grindstone::zones::content::ContentDb;
use grindstone::{BigNum, GameConfig, PlayerState};

fn store(config: &GameConfig) -> Store {
    Store::new(PlayerState::new(config))
}

#[test]
fn test_xp_curve_strictly_increasing() {
    let config = GameConfig::default();
    let mut previous = xp_for_level(1, &config);
    for level in 2..=5_000 {
        let next = xp_for_level(level, &config);
        assert!(next > previous, "xp_for_level({level}) did not increase");
        previous = next;
    }
}

#[test]
fn test_grant_xp_always_leaves_xp_below_threshold() {
    let config = GameConfig::default();
    let mut store = store(&config);

    for amount in ["1", "99", "100", "12345", "1e7", "3.5e9", "0"] {
        let amount: BigNum = amount.parse().unwrap();
        store.grant_xp(&amount, &config);
        let stats = &store.state().player_stats;
        assert!(stats.xp < stats.xp_to_next, "xp invariant broken after granting {amount}");
        assert!(!stats.xp.is_negative());
    }
    assert!(store.state().player_stats.level > 1);
}

#[test]
fn test_grant_xp_at_max_level_terminates() {
    let config = GameConfig {
        max_level: 5,
        ..GameConfig::default()
    };
    let mut store = store(&config);

    let summary = store.grant_xp(&"1e30".parse().unwrap(), &config);

    assert_eq!(summary.level_after, 5);
    let stats = &store.state().player_stats;
    assert!(stats.xp < stats.xp_to_next);
}

#[test]
fn test_merge_cycle_stops_at_depth_guard() {
    let config = GameConfig {
        merge_threshold: 1,
        merge_max_depth: 5,
        ..GameConfig::default()
    };
    let mut data = ContentDb::builtin_data();
    for (id, next) in [("loop_a", "loop_b"), ("loop_b", "loop_a")] {
        data.items.push(ItemDef {
            id: id.to_string(),
            name: id.to_string(),
            slot: EquipmentSlot::Amulet,
            stats: ItemStats::default(),
            next_tier: Some(next.to_string()),
        });
    }
    let content = ContentDb::new(data).unwrap();
    let mut store = store(&config);
    store.unlock_cheat(Cheat::AutoMerge);
    assert!(store.set_cheat_active(Cheat::AutoMerge, true));

    // Every merge re-triggers the threshold on the other item.
    let report = store.add_item(StackKey::new("loop_a", Rarity::Common), &content, &config);

    assert!(report.outcome.is_added());
    assert_eq!(report.merges.len(), config.merge_max_depth as usize);
    assert!(report.depth_limited);
    let total: u64 = store.state().inventory_stacks.values().map(|s| s.count).sum();
    assert_eq!(total, 1, "merging converts units, never duplicates them");
}

#[test]
fn test_full_inventory_reports_without_change() {
    let config = GameConfig {
        inventory_capacity: 1,
        ..GameConfig::default()
    };
    let content = ContentDb::builtin();
    let mut store = store(&config);
    store.add_item(StackKey::new("leather_cap", Rarity::Common), &content, &config);
    let before = store.state().clone();

    let report = store.add_item(StackKey::new("leather_cap", Rarity::Rare), &content, &config);

    assert_eq!(report.outcome, AddItemOutcome::InventoryFull);
    assert_eq!(store.state(), &before);
}

#[test]
fn test_refused_purchase_changes_nothing() {
    let config = GameConfig::default();
    let content = ContentDb::builtin();
    let mut store = store(&config);
    let before = store.state().clone();

    let result = purchase_upgrade(&mut store, &content, "sharpen");

    assert!(matches!(result, Err(PurchaseError::InsufficientFunds { .. })));
    assert_eq!(store.state(), &before);
    assert!(matches!(
        purchase_upgrade(&mut store, &content, "no_such_upgrade"),
        Err(PurchaseError::Unknown(_))
    ));
}

#[test]
fn test_purchase_spends_exact_cost() {
    let config = GameConfig::default();
    let content = ContentDb::builtin();
    let mut store = store(&config);
    let cost = content.upgrade("sharpen").unwrap().cost_at(0);
    store.add_gold(&cost);

    assert_eq!(purchase_upgrade(&mut store, &content, "sharpen"), Ok(1));
    assert!(store.state().gold.is_zero());
    assert_eq!(store.state().upgrade_level("sharpen"), 1);
}

#[test]
fn test_territory_requires_kills_before_gold() {
    let config = GameConfig::default();
    let content = ContentDb::builtin();
    let mut store = store(&config);
    store.add_gold(&BigNum::from(1_000_000u64));
    let before = store.state().clone();

    let result = grindstone::economy::territory::conquer(&mut store, &content, "wolf_den");

    assert!(matches!(result, Err(TerritoryError::RequirementNotMet { .. })));
    assert_eq!(store.state(), &before);

    for _ in 0..50 {
        store.record_kill("wolf", 1, 1);
    }
    grindstone::economy::territory::conquer(&mut store, &content, "wolf_den").unwrap();
    assert!(store.state().conquered_territories.contains("wolf_den"));
    assert_eq!(store.state().gold, BigNum::from(999_500u64));
}
