//! Grindstone - deterministic simulation core for an idle RPG.
//!
//! The same formulas drive the tick-by-tick game loop ([`core::game::Game`])
//! and the analytic offline estimator ([`core::offline`]), so both agree on
//! damage, hit chance and reward rates.

pub mod character;
pub mod combat;
pub mod core;
pub mod economy;
pub mod items;
pub mod state;
pub mod zones;

pub use crate::core::bignum::BigNum;
pub use crate::core::config::GameConfig;
pub use crate::core::game::Game;
pub use crate::state::player::PlayerState;
pub use crate::zones::content::ContentDb;
