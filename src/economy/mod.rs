//! Upgrades, territories and the multipliers they feed.

pub mod modifiers;
pub mod territory;
pub mod upgrades;
