//! Live player state, its mutation surface and save files.

pub mod persistence;
pub mod player;
pub mod store;

pub use player::PlayerState;
pub use store::Store;
