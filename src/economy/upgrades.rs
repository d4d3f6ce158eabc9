//! Purchasable upgrades.

use super::modifiers::Effect;
use crate::core::bignum::BigNum;
use crate::state::store::Store;
use crate::zones::content::ContentDb;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Which currency an upgrade costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeCategory {
    /// Paid in gold.
    Standard,
    /// Paid in fragments.
    Exploit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    pub category: UpgradeCategory,
    pub base_cost: BigNum,
    pub cost_growth: f64,
    pub max_level: u32,
    /// Applied once per purchased level.
    pub effect: Effect,
}

impl UpgradeDef {
    /// Price of the next level when `level` levels are owned:
    /// `floor(base_cost * cost_growth^level)`.
    pub fn cost_at(&self, level: u32) -> BigNum {
        (&self.base_cost * &BigNum::from_f64(self.cost_growth).powi(level)).floor()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("unknown upgrade: {0}")]
    Unknown(String),
    #[error("{id} is already at max level {max}")]
    MaxLevel { id: String, max: u32 },
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: BigNum, available: BigNum },
}

/// Buys one level of an upgrade. Refusals leave the state untouched.
///
/// Returns the new level.
pub fn purchase_upgrade(store: &mut Store, content: &ContentDb, id: &str) -> Result<u32, PurchaseError> {
    let upgrade = content
        .upgrade(id)
        .ok_or_else(|| PurchaseError::Unknown(id.to_string()))?;
    let level = store.state().upgrade_level(id);
    if level >= upgrade.max_level {
        return Err(PurchaseError::MaxLevel {
            id: id.to_string(),
            max: upgrade.max_level,
        });
    }

    let cost = upgrade.cost_at(level);
    let paid = match upgrade.category {
        UpgradeCategory::Standard => store.spend_gold(&cost),
        UpgradeCategory::Exploit => store.spend_fragments(&cost),
    };
    if !paid {
        let available = match upgrade.category {
            UpgradeCategory::Standard => store.state().gold.clone(),
            UpgradeCategory::Exploit => store.state().fragments.clone(),
        };
        return Err(PurchaseError::InsufficientFunds {
            needed: cost,
            available,
        });
    }

    store.set_upgrade_level(id, level + 1);
    debug!(upgrade = id, level = level + 1, %cost, "upgrade purchased");
    Ok(level + 1)
}
