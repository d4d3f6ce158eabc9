//! Combat system types and logic.

pub mod logic;
pub mod math;
pub mod stance;
pub mod types;

pub use logic::{CombatEngine, CombatTimer, TimerRequest};
pub use types::{CombatError, CombatPhase};
