//! Default tuning values. `GameConfig::default()` is built from these; a
//! loaded config may override any of them.

// Tick and timing
pub const AUTO_ATTACK_INTERVAL_MS: f64 = 1000.0;
pub const MIN_ATTACK_INTERVAL_MS: f64 = 200.0;
pub const SPAWN_DELAY_MS: f64 = 500.0;
pub const REGEN_TICK_MS: f64 = 1000.0;
pub const DOT_TICK_MS: f64 = 1000.0;

// Enemy attack timing: interval = max(MIN, BASE / attack_speed)
pub const ENEMY_BASE_ATTACK_INTERVAL_SECONDS: f64 = 2.0;
pub const ENEMY_MIN_ATTACK_INTERVAL_SECONDS: f64 = 0.4;

// XP and leveling
pub const XP_CURVE_BASE: f64 = 100.0;
pub const XP_CURVE_EXPONENT: f64 = 1.5;
pub const MAX_LEVEL: u32 = 100_000;

// Starting stats
pub const STARTING_STRENGTH: f64 = 10.0;
pub const STARTING_DEFENSE: f64 = 2.0;
pub const STARTING_HP: f64 = 100.0;
pub const STARTING_REGEN: f64 = 1.0;
pub const STARTING_AGILITY: f64 = 5.0;

// Per-level growth
pub const STRENGTH_PER_LEVEL: f64 = 2.0;
pub const DEFENSE_PER_LEVEL: f64 = 1.0;
pub const HP_PER_LEVEL: f64 = 12.0;
pub const REGEN_PER_LEVEL: f64 = 0.2;
pub const AGILITY_PER_LEVEL: f64 = 0.5;

// Crit
pub const BASE_CRIT_CHANCE: f64 = 0.05;
pub const BASE_CRIT_MULTIPLIER: f64 = 2.0;
pub const OVERFLOW_CRIT_MULTIPLIER: f64 = 10.0;

// Damage formulas (see DamageFormula)
pub const LINEAR_STRENGTH_COEF: f64 = 1.2;
pub const QUADRATIC_SKILL_COEF: f64 = 0.5;
pub const EXPONENTIAL_SKILL_BASE: f64 = 1.5;
pub const BASE_SKILL: f64 = 1.0;
pub const MIN_DAMAGE_FRACTION: f64 = 0.1;

// Hit chance = clamp(accuracy / (accuracy + evade), FLOOR, CAP)
pub const HIT_CHANCE_FLOOR: f64 = 0.2;
pub const HIT_CHANCE_CAP: f64 = 1.0;
pub const EVADE_PER_AGILITY: f64 = 1.0;

// Net DPS never drops below this (avoids division by zero)
pub const NET_DPS_EPSILON: f64 = 0.001;

// Currency rewards
pub const GOLD_DROP_MULTIPLIER: f64 = 1.0;
pub const FRAGMENT_DROP_RATE: f64 = 0.02;
pub const FRAGMENT_BASE_AMOUNT: f64 = 1.0;
pub const FRAGMENT_DROP_MULTIPLIER: f64 = 1.0;

// Loot
pub const LOOT_BOOST_MULTIPLIER: f64 = 2.0;
pub const LOOT_BOOST_CAP: f64 = 0.5;
/// Common, Uncommon, Rare, Epic, Legendary
pub const RARITY_WEIGHTS: [f64; 5] = [60.0, 28.0, 10.0, 1.5, 0.5];
pub const SOLO_ENCOUNTER_WEIGHT: f64 = 10.0;

// Inventory
pub const INVENTORY_CAPACITY: usize = 50;
pub const MERGE_THRESHOLD: u64 = 10;
pub const MERGE_MAX_DEPTH: u32 = 5;

// Prestige multiplier formula: 1.0 + BASE_FACTOR * count^EXPONENT
pub const PRESTIGE_MULT_BASE_FACTOR: f64 = 0.5;
pub const PRESTIGE_MULT_EXPONENT: f64 = 0.7;
pub const PRESTIGE_MIN_ZONE: u32 = 10;

// Offline progress
pub const OFFLINE_MAX_SECONDS: f64 = 12.0 * 60.0 * 60.0;
pub const OFFLINE_MIN_SECONDS: f64 = 60.0;

// Bosses: kills needed = BASE + PER_ZONE * (zone - 1)
pub const BOSS_KILLS_BASE: u32 = 10;
pub const BOSS_KILLS_PER_ZONE: u32 = 1;
pub const BOSS_HP_MULTIPLIER: f64 = 5.0;
pub const BOSS_ATTACK_MULTIPLIER: f64 = 1.5;
pub const BOSS_REWARD_MULTIPLIER: f64 = 5.0;

// Zone scaling: factor = area base * GROWTH^(local zone index)
pub const ZONE_HP_GROWTH: f64 = 1.25;
pub const ZONE_ATTACK_GROWTH: f64 = 1.2;
pub const ZONE_GOLD_GROWTH: f64 = 1.2;
pub const ZONE_XP_GROWTH: f64 = 1.15;

// Persistence
pub const SAVE_SCHEMA_VERSION: u32 = 3;
/// "GRNDSAVE"
pub const SAVE_VERSION_MAGIC: u64 = 0x4752_4E44_5341_5645;

// Narrative flags
pub const FLAG_OVERFLOW: &str = "overflow";
