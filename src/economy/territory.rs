//! Conquerable territories.
//!
//! A territory is claimed once the player has killed enough of its enemy and
//! pays its gold cost. Its buff then applies permanently and survives
//! prestige.

use super::modifiers::Effect;
use crate::core::bignum::BigNum;
use crate::state::player::PlayerState;
use crate::state::store::Store;
use crate::zones::content::ContentDb;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryDef {
    pub id: String,
    pub name: String,
    pub enemy_id: String,
    pub kills_required: u64,
    pub gold_cost: BigNum,
    pub buff: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerritoryError {
    #[error("unknown territory: {0}")]
    Unknown(String),
    #[error("territory {0} is already conquered")]
    AlreadyConquered(String),
    #[error("need {required} {enemy} kills, have {have}")]
    RequirementNotMet {
        enemy: String,
        required: u64,
        have: u64,
    },
    #[error("insufficient gold: need {needed}, have {available}")]
    InsufficientFunds { needed: BigNum, available: BigNum },
}

/// Kill progress toward a territory as `(have, required)`.
pub fn kill_progress(state: &PlayerState, territory: &TerritoryDef) -> (u64, u64) {
    let have = state.enemy_kills.get(&territory.enemy_id).copied().unwrap_or(0);
    (have, territory.kills_required)
}

/// Whether every requirement is met right now.
pub fn can_conquer(state: &PlayerState, territory: &TerritoryDef) -> bool {
    let (have, required) = kill_progress(state, territory);
    !state.conquered_territories.contains(&territory.id)
        && have >= required
        && state.gold >= territory.gold_cost
}

/// Claims a territory. Refusals leave the state untouched.
pub fn conquer(store: &mut Store, content: &ContentDb, id: &str) -> Result<(), TerritoryError> {
    let territory = content
        .territory(id)
        .ok_or_else(|| TerritoryError::Unknown(id.to_string()))?;
    let state = store.state();
    if state.conquered_territories.contains(id) {
        return Err(TerritoryError::AlreadyConquered(id.to_string()));
    }
    let (have, required) = kill_progress(state, territory);
    if have < required {
        return Err(TerritoryError::RequirementNotMet {
            enemy: territory.enemy_id.clone(),
            required,
            have,
        });
    }
    if !store.spend_gold(&territory.gold_cost) {
        return Err(TerritoryError::InsufficientFunds {
            needed: territory.gold_cost.clone(),
            available: store.state().gold.clone(),
        });
    }
    store.conquer_territory(id);
    info!(territory = id, "territory conquered");
    Ok(())
}
