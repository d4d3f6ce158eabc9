//! Areas, zones and the encounters fought in them.
//!
//! Areas tile the zone range; each zone scales its enemies and draws
//! encounters from a weighted pool.

pub mod content;
pub mod data;
pub mod encounters;

pub use content::{ContentDb, ContentError};
