//! Character power: derived stats, leveling and prestige.

pub mod derived_stats;
pub mod prestige;
pub mod progression;

pub use derived_stats::DerivedStats;
