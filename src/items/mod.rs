//! Item system: definitions, stacked inventory with auto-merge, and drops.

pub mod drops;
pub mod inventory;
pub mod types;

pub use types::{EquipmentSlot, Rarity, StackKey};
