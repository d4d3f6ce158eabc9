//! Simulation core: numbers, timing, configuration and the game loop.

pub mod bignum;
pub mod config;
pub mod constants;
pub mod events;
pub mod game;
pub mod offline;
pub mod scheduler;
pub mod weighted;

pub use bignum::BigNum;
pub use config::GameConfig;
pub use game::{Game, World};
