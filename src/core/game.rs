//! Game orchestration.
//!
//! [`Game`] binds the pieces together: a [`World`] holding the store, combat
//! engine, content, config and seeded RNG, plus the [`Scheduler`] that drives
//! the engine's timers. The host calls [`Game::advance`] once per frame with
//! the elapsed wall time; everything else is player commands.

use super::config::GameConfig;
use super::events::{EventBus, GameEvent};
use super::offline::{self, OfflineReport};
use super::scheduler::{Scheduler, TickerMode};
use crate::character::derived_stats::DerivedStats;
use crate::character::prestige::{check_prestige, PrestigeError};
use crate::combat::logic::{CombatCtx, CombatEngine, CombatTimer, TimerRequest};
use crate::combat::math::CombatOutlook;
use crate::combat::stance::Stance;
use crate::combat::types::CombatError;
use crate::economy::territory::{self, TerritoryError};
use crate::economy::upgrades::{self, PurchaseError};
use crate::items::types::{EquipmentSlot, StackKey};
use crate::state::persistence::{LoadSource, PersistenceError, SaveManager};
use crate::state::player::PlayerState;
use crate::state::store::{EquipError, Store};
use crate::zones::content::ContentDb;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Scheduler key type: one ticker per combat timer.
pub type TickerKey = CombatTimer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelError {
    #[error("zone {0} does not exist")]
    UnknownZone(u32),
    #[error("zone {zone} is locked, furthest reached is {furthest}")]
    Locked { zone: u32, furthest: u32 },
}

/// Everything a scheduler callback may touch.
pub struct World {
    store: Store,
    engine: CombatEngine,
    content: Arc<ContentDb>,
    config: Arc<GameConfig>,
    rng: ChaCha8Rng,
}

impl World {
    pub fn new(state: PlayerState, content: Arc<ContentDb>, config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            store: Store::new(state),
            engine: CombatEngine::new(),
            content,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.engine
    }

    pub fn content(&self) -> &ContentDb {
        &self.content
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Runs one engine step with the world split into a combat context.
    fn step<T>(&mut self, f: impl FnOnce(&mut CombatEngine, &mut CombatCtx<'_, ChaCha8Rng>) -> T) -> T {
        let mut ctx = CombatCtx {
            store: &mut self.store,
            content: &self.content,
            config: &self.config,
            rng: &mut self.rng,
        };
        f(&mut self.engine, &mut ctx)
    }

    fn spawn(&mut self) -> Vec<TimerRequest> {
        match self.step(|engine, ctx| engine.spawn(ctx)) {
            Ok(requests) => requests,
            Err(err) => {
                error!(%err, zone = self.store.state().current_zone, "encounter spawn failed");
                Vec::new()
            }
        }
    }

    /// Handles one timer firing.
    fn fire(&mut self, timer: CombatTimer) -> Vec<TimerRequest> {
        match timer {
            CombatTimer::AutoAttack => self.step(|engine, ctx| engine.player_attack(ctx, false)),
            CombatTimer::EnemyAttack(index) => self.step(|engine, ctx| engine.enemy_attack(ctx, index)),
            CombatTimer::DamageOverTime => self.step(|engine, ctx| engine.damage_over_time(ctx)),
            CombatTimer::Regen => {
                self.step(|engine, ctx| engine.regen(ctx));
                Vec::new()
            }
            CombatTimer::Spawn => self.spawn(),
        }
    }

    fn max_hp(&self) -> f64 {
        DerivedStats::derive(self.store.state(), &self.content, &self.config).max_hp
    }
}

/// Applies engine timer requests to the scheduler.
fn apply_requests(scheduler: &mut Scheduler<TickerKey, World>, requests: Vec<TimerRequest>) {
    for request in requests {
        match request {
            TimerRequest::Start {
                timer,
                interval_ms,
                one_shot,
            } => {
                let mode = if one_shot {
                    TickerMode::OneShot
                } else {
                    TickerMode::Recurring
                };
                scheduler.register(timer, interval_ms, mode, move |world: &mut World, scheduler| {
                    let requests = world.fire(timer);
                    apply_requests(scheduler, requests);
                });
            }
            TimerRequest::Cancel(timer) => {
                scheduler.cancel(&timer);
            }
        }
    }
}

pub struct Game {
    world: World,
    scheduler: Scheduler<TickerKey, World>,
}

/// Moves a state whose zone is missing from `content` to the nearest zone
/// that still exists.
fn relocate_to_known_zone(state: &mut PlayerState, content: &ContentDb) {
    if content.area_for_zone(state.current_zone).is_some() {
        return;
    }
    let clamped = state.current_zone.clamp(1, content.total_zones().max(1));
    let zone = if content.area_for_zone(clamped).is_some() { clamped } else { 1 };
    let area = content.area_for_zone(zone).map_or(1, |a| a.id);
    warn!(from = state.current_zone, to = zone, "saved zone not in content, relocating");
    state.current_area = area;
    state.current_zone = zone;
}

impl Game {
    pub fn new(state: PlayerState, content: Arc<ContentDb>, config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            world: World::new(state, content, config, seed),
            scheduler: Scheduler::new(),
        }
    }

    /// Fresh character with the built-in content and default tuning.
    pub fn with_seed(seed: u64) -> Self {
        let config = GameConfig::default();
        let state = PlayerState::new(&config);
        Self::new(state, Arc::new(ContentDb::builtin()), Arc::new(config), seed)
    }

    /// Loads a save (falling back to backup or fresh), credits offline time
    /// since it was written, and starts combat.
    pub fn load(
        manager: &SaveManager,
        content: Arc<ContentDb>,
        config: Arc<GameConfig>,
        seed: u64,
        now: i64,
    ) -> Result<(Self, LoadSource, OfflineReport), CombatError> {
        let (mut state, source) = manager.load_or_default(&config);
        info!(?source, "save loaded");
        relocate_to_known_zone(&mut state, &content);
        let mut game = Self::new(state, content, config, seed);
        let report = game.process_offline_since(now)?;
        game.start();
        Ok((game, source, report))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn store(&self) -> &Store {
        &self.world.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.world.store
    }

    pub fn state(&self) -> &PlayerState {
        self.world.store.state()
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.world.engine
    }

    pub fn scheduler(&self) -> &Scheduler<TickerKey, World> {
        &self.scheduler
    }

    pub fn derived_stats(&self) -> DerivedStats {
        DerivedStats::derive(self.world.store.state(), &self.world.content, &self.world.config)
    }

    pub fn outlook(&self) -> Option<CombatOutlook> {
        self.world
            .engine
            .outlook(&self.world.store, &self.world.content, &self.world.config)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.store.drain_events()
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        self.world.store.events_mut()
    }

    fn apply(&mut self, requests: Vec<TimerRequest>) {
        apply_requests(&mut self.scheduler, requests);
    }

    /// Spawns the first encounter. Does nothing while one is active or the
    /// player is defeated.
    pub fn start(&mut self) {
        let requests = self.world.spawn();
        self.apply(requests);
    }

    /// Advances every timer by `elapsed_ms`. Returns how many fired.
    pub fn advance(&mut self, elapsed_ms: f64) -> usize {
        self.scheduler.advance(&mut self.world, elapsed_ms)
    }

    /// One click attack on the current target.
    pub fn click(&mut self) {
        let requests = self.world.step(|engine, ctx| engine.player_attack(ctx, true));
        self.apply(requests);
    }

    /// Arms a guaranteed crit for the next attack.
    pub fn arm_forced_crit(&mut self) {
        self.world.store.arm_forced_crit();
    }

    /// Revives a defeated player. Returns false if the player was not
    /// defeated.
    pub fn respawn_player(&mut self) -> bool {
        let requests = self.world.step(|engine, ctx| engine.respawn(ctx));
        let revived = !requests.is_empty();
        self.apply(requests);
        revived
    }

    fn refresh_attack_speed(&mut self) {
        let requests = self.world.step(|engine, ctx| engine.refresh_attack_speed(ctx));
        self.apply(requests);
    }

    pub fn set_stance(&mut self, stance: Stance) {
        self.world.store.set_stance(stance);
        self.refresh_attack_speed();
    }

    pub fn purchase_upgrade(&mut self, id: &str) -> Result<u32, PurchaseError> {
        let level = upgrades::purchase_upgrade(&mut self.world.store, &self.world.content, id)?;
        self.refresh_attack_speed();
        Ok(level)
    }

    pub fn conquer_territory(&mut self, id: &str) -> Result<(), TerritoryError> {
        territory::conquer(&mut self.world.store, &self.world.content, id)?;
        self.refresh_attack_speed();
        Ok(())
    }

    pub fn equip(&mut self, slot: EquipmentSlot, key: StackKey) -> Result<(), EquipError> {
        self.world.store.equip(slot, key, &self.world.content)?;
        self.refresh_attack_speed();
        Ok(())
    }

    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<StackKey> {
        let previous = self.world.store.unequip(slot);
        let max_hp = self.world.max_hp();
        if self.world.store.state().current_hp > max_hp {
            self.world.store.restore_hp(max_hp);
        }
        self.refresh_attack_speed();
        previous
    }

    /// Moves to an already reached zone, abandoning the current encounter.
    pub fn travel(&mut self, zone: u32) -> Result<(), TravelError> {
        let area = self
            .world
            .content
            .area_for_zone(zone)
            .ok_or(TravelError::UnknownZone(zone))?
            .id;
        let furthest = self.world.store.state().furthest_zone();
        if zone > furthest {
            return Err(TravelError::Locked { zone, furthest });
        }
        if zone == self.world.store.state().current_zone {
            return Ok(());
        }
        let requests = self.world.step(|engine, ctx| engine.abandon(ctx));
        self.world.store.set_zone(area, zone);
        self.apply(requests);
        Ok(())
    }

    /// Prestiges and starts the next run from zone 1 at full HP.
    ///
    /// Returns the new prestige count.
    pub fn prestige(&mut self) -> Result<u32, PrestigeError> {
        check_prestige(self.world.store.state(), &self.world.config)?;

        self.scheduler.clear();
        self.world.engine = CombatEngine::new();
        let count = self.world.store.apply_prestige_reset(&self.world.config);
        let max_hp = self.world.max_hp();
        self.world.store.restore_hp(max_hp);
        self.start();
        Ok(count)
    }

    /// Credits `elapsed_secs` of offline time.
    pub fn process_offline(&mut self, elapsed_secs: f64, now: i64) -> Result<OfflineReport, CombatError> {
        offline::process_offline(
            &mut self.world.store,
            &self.world.content,
            &self.world.config,
            elapsed_secs,
            now,
        )
    }

    /// Credits offline time since the last online (or save) timestamp.
    pub fn process_offline_since(&mut self, now: i64) -> Result<OfflineReport, CombatError> {
        offline::process_offline_since(&mut self.world.store, &self.world.content, &self.world.config, now)
    }

    /// Stamps the save and online timestamps with `now` and writes a snapshot.
    pub fn save_at(&mut self, manager: &SaveManager, now: i64) -> Result<(), PersistenceError> {
        self.world.store.touch_last_save(now);
        self.world.store.touch_last_online(now);
        manager.save(self.world.store.state())
    }

    /// [`Game::save_at`] with the current wall-clock time.
    pub fn save(&mut self, manager: &SaveManager) -> Result<(), PersistenceError> {
        self.save_at(manager, chrono::Utc::now().timestamp())
    }
}
