//! The single owner of live player state.
//!
//! Every write goes through a named method here. Behaviorally significant
//! writes emit [`GameEvent::StateChanged`] naming the top-level fields that
//! moved; per-kill bookkeeping and per-hit HP changes stay silent so
//! observers are not flooded.

use crate::character::prestige;
use crate::character::progression::{apply_xp, LevelUpSummary};
use crate::combat::math::DamageFormula;
use crate::combat::stance::Stance;
use crate::core::bignum::BigNum;
use crate::core::config::GameConfig;
use crate::core::events::{EventBus, GameEvent, StateField};
use crate::items::inventory::{self, AddItemReport};
use crate::items::types::{EquipmentSlot, StackKey};
use crate::state::player::{Cheat, PlayerState};
use crate::zones::content::ContentDb;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipError {
    #[error("no {0} in inventory")]
    NotOwned(StackKey),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("{item} cannot be equipped in the {slot:?} slot")]
    WrongSlot { item: String, slot: EquipmentSlot },
}

#[derive(Debug, Default)]
pub struct Store {
    state: PlayerState,
    events: EventBus,
}

impl Store {
    pub fn new(state: PlayerState) -> Self {
        Self {
            state,
            events: EventBus::new(),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.emit(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    fn changed(&mut self, fields: &[StateField]) {
        self.events.emit(GameEvent::StateChanged {
            fields: fields.to_vec(),
        });
    }

    /// Swaps in a hydrated or fresh state wholesale.
    pub fn replace(&mut self, state: PlayerState) {
        self.state = state;
        self.changed(&[StateField::All]);
    }

    // Currencies

    /// Adds gold. Negative amounts are ignored.
    pub fn add_gold(&mut self, amount: &BigNum) {
        if amount.is_zero() || amount.is_negative() {
            return;
        }
        self.state.gold += amount;
        self.changed(&[StateField::Gold]);
    }

    /// Spends gold if the balance covers it. Returns false and leaves the
    /// balance untouched otherwise.
    pub fn spend_gold(&mut self, amount: &BigNum) -> bool {
        if amount.is_negative() || self.state.gold < *amount {
            return false;
        }
        self.state.gold -= amount;
        self.changed(&[StateField::Gold]);
        true
    }

    pub fn add_fragments(&mut self, amount: &BigNum) {
        if amount.is_zero() || amount.is_negative() {
            return;
        }
        self.state.fragments += amount;
        self.changed(&[StateField::Fragments]);
    }

    pub fn spend_fragments(&mut self, amount: &BigNum) -> bool {
        if amount.is_negative() || self.state.fragments < *amount {
            return false;
        }
        self.state.fragments -= amount;
        self.changed(&[StateField::Fragments]);
        true
    }

    // Progression

    /// Adds XP and applies any level-ups, emitting one `LevelUp` per level.
    pub fn grant_xp(&mut self, amount: &BigNum, config: &GameConfig) -> LevelUpSummary {
        let summary = apply_xp(&mut self.state, amount, config);
        for level in summary.level_before + 1..=summary.level_after {
            self.events.emit(GameEvent::LevelUp { level });
        }
        if summary.levels_gained() > 0 {
            self.changed(&[StateField::PlayerStats, StateField::CurrentHp]);
        } else if !amount.is_zero() {
            self.changed(&[StateField::PlayerStats]);
        }
        summary
    }

    // HP

    /// Subtracts HP, never below zero. Returns the remaining HP.
    pub fn damage_player(&mut self, amount: f64) -> f64 {
        if amount > 0.0 {
            self.state.current_hp = (self.state.current_hp - amount).max(0.0);
        }
        self.state.current_hp
    }

    /// Adds HP up to `max_hp`.
    pub fn heal_player(&mut self, amount: f64, max_hp: f64) -> f64 {
        if amount > 0.0 && self.state.current_hp < max_hp {
            self.state.current_hp = (self.state.current_hp + amount).min(max_hp);
        }
        self.state.current_hp
    }

    /// Sets HP to `max_hp` (respawn, offline resync).
    pub fn restore_hp(&mut self, max_hp: f64) {
        self.state.current_hp = max_hp.max(0.0);
        self.changed(&[StateField::CurrentHp]);
    }

    // Equipment and inventory

    pub fn equip(
        &mut self,
        slot: EquipmentSlot,
        key: StackKey,
        content: &ContentDb,
    ) -> Result<(), EquipError> {
        let item = content
            .item(&key.item_id)
            .ok_or_else(|| EquipError::UnknownItem(key.item_id.clone()))?;
        if item.slot != slot {
            return Err(EquipError::WrongSlot {
                item: item.id.clone(),
                slot,
            });
        }
        if self.state.stack_count(&key) == 0 {
            return Err(EquipError::NotOwned(key));
        }
        self.state.equipped.insert(slot, Some(key));
        self.changed(&[StateField::Equipped]);
        Ok(())
    }

    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<StackKey> {
        let previous = self.state.equipped.insert(slot, None).flatten();
        if previous.is_some() {
            self.changed(&[StateField::Equipped]);
        }
        previous
    }

    /// Adds one item, running auto-merge when the cheat is active.
    pub fn add_item(
        &mut self,
        key: StackKey,
        content: &ContentDb,
        config: &GameConfig,
    ) -> AddItemReport {
        let report = inventory::add_item(&mut self.state, key, content, config);
        for merge in &report.merges {
            self.events.emit(GameEvent::ItemsMerged {
                from_item: merge.from.item_id.clone(),
                to_item: merge.to.item_id.clone(),
                rarity: merge.to.rarity,
                created: merge.created,
            });
        }
        if report.outcome.is_added() {
            self.changed(&[StateField::Inventory]);
        }
        report
    }

    // Kills and zones

    /// Per-kill bookkeeping. Silent: no change notification.
    pub fn record_kill(&mut self, enemy_id: &str, area: u32, zone: u32) {
        self.state.total_kills += 1;
        *self.state.enemy_kills.entry(enemy_id.to_string()).or_insert(0) += 1;
        let progress = self.state.area_progress.entry(area).or_default();
        *progress.zone_clear_kills.entry(zone).or_insert(0) += 1;
    }

    /// Adds a batch of kills estimated offline. Silent.
    pub fn record_bulk_kills(&mut self, kills: u64) {
        self.state.total_kills = self.state.total_kills.saturating_add(kills);
    }

    pub fn reset_zone_kills(&mut self, area: u32, zone: u32) {
        if let Some(progress) = self.state.area_progress.get_mut(&area) {
            progress.zone_clear_kills.remove(&zone);
        }
    }

    pub fn record_boss_defeated(&mut self, area: u32, zone: u32) {
        let progress = self.state.area_progress.entry(area).or_default();
        progress.bosses_defeated.insert(zone);
        progress.zone_clear_kills.remove(&zone);
        self.changed(&[StateField::AreaProgress]);
    }

    /// Moves the player and raises the area's furthest zone.
    pub fn set_zone(&mut self, area: u32, zone: u32) {
        if self.state.current_area == area && self.state.current_zone == zone {
            return;
        }
        self.state.current_area = area;
        self.state.current_zone = zone;
        let progress = self.state.area_progress.entry(area).or_default();
        progress.furthest_zone = progress.furthest_zone.max(zone);
        info!(area, zone, "zone changed");
        self.events.emit(GameEvent::ZoneChanged { zone });
        self.changed(&[StateField::Zone, StateField::AreaProgress]);
    }

    // Flags, cheats, modes

    pub fn set_flag(&mut self, name: &str, value: bool) {
        if self.state.flag(name) == value {
            return;
        }
        self.state.flags.insert(name.to_string(), value);
        self.changed(&[StateField::Flags]);
    }

    pub fn unlock_cheat(&mut self, cheat: Cheat) {
        if self.state.unlocked_cheats.insert(cheat) {
            self.changed(&[StateField::Cheats]);
        }
    }

    /// Toggles an unlocked cheat. Returns false if the cheat is still locked.
    pub fn set_cheat_active(&mut self, cheat: Cheat, active: bool) -> bool {
        if !self.state.unlocked_cheats.contains(&cheat) {
            return false;
        }
        self.state.active_cheats.insert(cheat, active);
        self.changed(&[StateField::Cheats]);
        true
    }

    pub fn set_stance(&mut self, stance: Stance) {
        if self.state.stance != stance {
            self.state.stance = stance;
            self.changed(&[StateField::Stance]);
        }
    }

    pub fn set_damage_tier(&mut self, tier: DamageFormula) {
        if self.state.damage_tier != tier {
            debug!(?tier, "damage tier changed");
            self.state.damage_tier = tier;
            self.changed(&[StateField::DamageTier]);
        }
    }

    pub fn arm_forced_crit(&mut self) {
        self.state.forced_crit = true;
    }

    /// Returns whether a forced crit was pending, clearing it.
    pub fn consume_forced_crit(&mut self) -> bool {
        std::mem::take(&mut self.state.forced_crit)
    }

    // Purchases

    pub fn set_upgrade_level(&mut self, id: &str, level: u32) {
        self.state.purchased_upgrades.insert(id.to_string(), level);
        self.changed(&[StateField::Upgrades]);
    }

    pub fn conquer_territory(&mut self, id: &str) -> bool {
        let added = self.state.conquered_territories.insert(id.to_string());
        if added {
            self.changed(&[StateField::Territories]);
        }
        added
    }

    /// Applies the prestige reset and bumps the prestige count.
    pub fn apply_prestige_reset(&mut self, config: &GameConfig) -> u32 {
        prestige::reset_for_prestige(&mut self.state, config);
        let count = self.state.prestige_count;
        self.events.emit(GameEvent::Prestiged { count });
        self.changed(&[StateField::All]);
        count
    }

    // Timestamps

    pub fn touch_last_save(&mut self, unix_secs: i64) {
        self.state.timestamps.last_save = unix_secs;
    }

    pub fn touch_last_online(&mut self, unix_secs: i64) {
        self.state.timestamps.last_online = unix_secs;
        self.changed(&[StateField::Timestamps]);
    }
}
