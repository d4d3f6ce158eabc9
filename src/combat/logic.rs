//! Live combat: the encounter state machine.
//!
//! The engine never touches the scheduler directly. Every operation returns
//! the timer changes it needs as [`TimerRequest`]s and the game loop applies
//! them, so the engine can be driven step by step in tests.

use super::math::{
    enemy_attack_interval_secs, evaluate, hit_chance, per_hit_damage, roll_player_hit, CombatOutlook,
};
use super::types::{CombatError, CombatPhase, ScaledEnemy};
use crate::character::derived_stats::DerivedStats;
use crate::core::bignum::BigNum;
use crate::core::config::GameConfig;
use crate::core::events::GameEvent;
use crate::items::drops::{drop_chance, roll_loot};
use crate::items::inventory::AddItemOutcome;
use crate::state::player::Cheat;
use crate::state::store::Store;
use crate::zones::content::ContentDb;
use crate::zones::data::kills_for_boss;
use crate::zones::encounters::{
    boss_for_zone, build_boss, build_members, choose_encounter, encounter_pool, encounter_profile,
    pool_profile,
};
use rand::Rng;
use tracing::{debug, info, warn};

/// Timers the combat engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CombatTimer {
    AutoAttack,
    /// Attack timer of one encounter member, by index.
    EnemyAttack(usize),
    Regen,
    DamageOverTime,
    /// One-shot delay before the next encounter.
    Spawn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerRequest {
    /// Registers (or replaces) a timer.
    Start {
        timer: CombatTimer,
        interval_ms: f64,
        one_shot: bool,
    },
    Cancel(CombatTimer),
}

impl TimerRequest {
    fn every(timer: CombatTimer, interval_ms: f64) -> Self {
        TimerRequest::Start {
            timer,
            interval_ms,
            one_shot: false,
        }
    }

    fn once(timer: CombatTimer, delay_ms: f64) -> Self {
        TimerRequest::Start {
            timer,
            interval_ms: delay_ms,
            one_shot: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveMember {
    pub enemy: ScaledEnemy,
    pub hp: f64,
    pub enraged: bool,
}

impl LiveMember {
    fn new(enemy: ScaledEnemy) -> Self {
        Self {
            hp: enemy.max_hp,
            enemy,
            enraged: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    fn attack_interval_ms(&self, config: &GameConfig) -> f64 {
        let speed = match (&self.enemy.enrage, self.enraged) {
            (Some(e), true) => self.enemy.attack_speed * e.speed_mult,
            _ => self.enemy.attack_speed,
        };
        enemy_attack_interval_secs(speed, config) * 1000.0
    }

    fn attack_power(&self) -> f64 {
        match (&self.enemy.enrage, self.enraged) {
            (Some(e), true) => self.enemy.attack * e.attack_mult,
            _ => self.enemy.attack,
        }
    }
}

/// The encounter currently being fought.
#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub template_id: String,
    pub area: u32,
    pub zone: u32,
    pub is_boss: bool,
    pub reward_mult: f64,
    pub loot_bonus: f64,
    pub members: Vec<LiveMember>,
}

impl Encounter {
    pub fn target(&self) -> Option<usize> {
        self.members.iter().position(LiveMember::is_alive)
    }

    pub fn all_dead(&self) -> bool {
        self.members.iter().all(|m| !m.is_alive())
    }

    fn alive(&self) -> impl Iterator<Item = (usize, &LiveMember)> {
        self.members.iter().enumerate().filter(|(_, m)| m.is_alive())
    }
}

/// Gold, XP and fragments granted for one kill, already floored.
#[derive(Debug, Clone, PartialEq)]
pub struct KillReward {
    pub gold: BigNum,
    pub xp: BigNum,
    pub fragments: BigNum,
}

/// Rolls the reward for killing `member`.
///
/// Gold and XP are always granted; fragments drop with
/// `fragment_drop_rate` probability.
pub fn kill_reward(
    member: &ScaledEnemy,
    reward_mult: f64,
    stats: &DerivedStats,
    config: &GameConfig,
    rng: &mut impl Rng,
) -> KillReward {
    let gold = BigNum::from_f64(member.gold * reward_mult * stats.gold_multiplier).floor();
    let xp = BigNum::from_f64(member.xp * reward_mult * stats.xp_multiplier).floor();
    let fragments = if rng.gen::<f64>() < config.fragment_drop_rate {
        BigNum::from_f64(config.fragment_base_amount * reward_mult * stats.fragment_multiplier).floor()
    } else {
        BigNum::zero()
    };
    KillReward {
        gold: gold.non_negative(),
        xp: xp.non_negative(),
        fragments: fragments.non_negative(),
    }
}

/// Shared borrows every combat step needs.
pub struct CombatCtx<'a, R: Rng> {
    pub store: &'a mut Store,
    pub content: &'a ContentDb,
    pub config: &'a GameConfig,
    pub rng: &'a mut R,
}

impl<R: Rng> CombatCtx<'_, R> {
    fn stats(&self) -> DerivedStats {
        DerivedStats::derive(self.store.state(), self.content, self.config)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CombatEngine {
    phase: CombatPhase,
    encounter: Option<Encounter>,
}

impl CombatEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    /// Spawns the next encounter in the player's current zone.
    ///
    /// A boss spawns once the zone's kill threshold is met and its boss is
    /// still undefeated; otherwise an encounter is drawn from the zone pool.
    pub fn spawn<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) -> Result<Vec<TimerRequest>, CombatError> {
        if matches!(self.phase, CombatPhase::EncounterActive | CombatPhase::PlayerDefeated) {
            return Ok(Vec::new());
        }
        let zone = ctx.store.state().current_zone;
        let area = ctx
            .content
            .area_for_zone(zone)
            .ok_or(CombatError::UnknownZone(zone))?
            .id;

        let boss_due = ctx.store.state().zone_kills(area, zone) >= kills_for_boss(zone, ctx.config)
            && !ctx.store.state().boss_defeated(area, zone);

        let encounter = if boss_due {
            let boss = boss_for_zone(ctx.content, zone, ctx.config)?;
            let member = build_boss(ctx.content, &boss, ctx.config)?;
            Encounter {
                template_id: boss.id,
                area,
                zone,
                is_boss: true,
                reward_mult: 1.0,
                loot_bonus: 1.0,
                members: vec![LiveMember::new(member)],
            }
        } else {
            let pool = encounter_pool(ctx.content, zone, ctx.config)?;
            let template = choose_encounter(&pool, ctx.rng).ok_or(CombatError::EmptyPool(zone))?;
            let members = build_members(ctx.content, template, zone, ctx.config)?;
            Encounter {
                template_id: template.id.clone(),
                area,
                zone,
                is_boss: false,
                reward_mult: template.reward_mult,
                loot_bonus: template.loot_bonus,
                members: members.into_iter().map(LiveMember::new).collect(),
            }
        };

        debug!(
            encounter = %encounter.template_id,
            zone,
            members = encounter.members.len(),
            boss = encounter.is_boss,
            "encounter spawned"
        );
        ctx.store.emit(GameEvent::EncounterSpawned {
            encounter_id: encounter.template_id.clone(),
            zone,
            members: encounter.members.len(),
            is_boss: encounter.is_boss,
        });

        let stats = ctx.stats();
        let mut requests = vec![
            TimerRequest::every(CombatTimer::AutoAttack, stats.attack_interval_ms),
            TimerRequest::every(CombatTimer::Regen, ctx.config.regen_tick_ms),
        ];
        for (i, member) in encounter.members.iter().enumerate() {
            let interval = member.attack_interval_ms(ctx.config);
            if interval.is_finite() {
                requests.push(TimerRequest::every(CombatTimer::EnemyAttack(i), interval));
            }
        }
        if encounter.members.iter().any(|m| m.enemy.dot_per_second > 0.0) {
            requests.push(TimerRequest::every(CombatTimer::DamageOverTime, ctx.config.dot_tick_ms));
        }

        self.encounter = Some(encounter);
        self.phase = CombatPhase::EncounterActive;
        Ok(requests)
    }

    /// One player attack against the first living member. Auto attacks
    /// trigger thorns; clicks do not.
    pub fn player_attack<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>, click: bool) -> Vec<TimerRequest> {
        let mut requests = Vec::new();
        if self.phase != CombatPhase::EncounterActive {
            return requests;
        }
        let Some(encounter) = self.encounter.as_mut() else {
            return requests;
        };
        let Some(target) = encounter.target() else {
            return requests;
        };

        let stats = ctx.stats();
        let forced = ctx.store.consume_forced_crit();
        let multiplier = if click {
            stats.click_multiplier
        } else {
            stats.auto_multiplier
        };
        let member = &mut encounter.members[target];
        let hit = roll_player_hit(
            stats.base_damage,
            multiplier,
            &stats,
            forced,
            member.enemy.defense,
            ctx.config,
            ctx.rng,
        );
        member.hp = (member.hp - hit.damage).max(0.0);
        ctx.store.emit(GameEvent::PlayerAttack {
            member: target,
            damage: hit.damage,
            crit: hit.crit,
            click,
        });

        if member.is_alive() {
            if let Some(enrage) = member.enemy.enrage {
                if !member.enraged && member.hp / member.enemy.max_hp <= enrage.threshold {
                    member.enraged = true;
                    debug!(member = target, enemy = %member.enemy.enemy_id, "enemy enraged");
                    ctx.store.emit(GameEvent::EnemyEnraged { member: target });
                    let interval = member.attack_interval_ms(ctx.config);
                    if interval.is_finite() {
                        requests.push(TimerRequest::every(CombatTimer::EnemyAttack(target), interval));
                    }
                }
            }
        } else {
            requests.push(TimerRequest::Cancel(CombatTimer::EnemyAttack(target)));
            self.on_member_killed(ctx, target, &stats);
        }

        if !click {
            self.apply_thorns(ctx);
        }

        if self.encounter.as_ref().is_some_and(Encounter::all_dead) {
            requests.extend(self.resolve(ctx));
        } else if ctx.store.state().current_hp <= 0.0 {
            requests.extend(self.defeat(ctx));
        }
        requests
    }

    fn apply_thorns<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) {
        let Some(encounter) = self.encounter.as_ref() else {
            return;
        };
        for (i, member) in encounter.alive() {
            if member.enemy.thorns > 0.0 {
                ctx.store.damage_player(member.enemy.thorns);
                ctx.store.emit(GameEvent::ThornsDamage {
                    member: i,
                    damage: member.enemy.thorns,
                });
            }
        }
    }

    fn on_member_killed<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>, index: usize, stats: &DerivedStats) {
        let Some(encounter) = self.encounter.as_ref() else {
            return;
        };
        let member = &encounter.members[index].enemy;
        let reward = kill_reward(member, encounter.reward_mult, stats, ctx.config, ctx.rng);

        ctx.store.record_kill(&member.enemy_id, encounter.area, encounter.zone);
        ctx.store.add_gold(&reward.gold);
        ctx.store.add_fragments(&reward.fragments);
        ctx.store.grant_xp(&reward.xp, ctx.config);
        ctx.store.emit(GameEvent::EnemyKilled {
            enemy_id: member.enemy_id.clone(),
            is_boss: encounter.is_boss,
            gold: reward.gold,
            xp: reward.xp,
            fragments: reward.fragments,
        });

        if encounter.is_boss {
            ctx.store.record_boss_defeated(encounter.area, encounter.zone);
            info!(zone = encounter.zone, boss = %encounter.template_id, "boss defeated");
            ctx.store.emit(GameEvent::BossDefeated {
                area_id: encounter.area.to_string(),
                zone: encounter.zone,
            });
        }

        let area_chance = ctx
            .content
            .area_for_zone(encounter.zone)
            .map(|a| a.drop_chance)
            .unwrap_or(0.0);
        let magnet = ctx.store.state().cheat_active(Cheat::LootMagnet);
        let chance = drop_chance(area_chance, encounter.loot_bonus, magnet, ctx.config);
        let table = ctx
            .content
            .enemy(&member.enemy_id)
            .map(|e| e.loot_table.as_slice())
            .unwrap_or(&[]);
        if let Some(key) = roll_loot(table, chance, ctx.config, ctx.rng) {
            let item_id = key.item_id.clone();
            let rarity = key.rarity;
            let report = ctx.store.add_item(key, ctx.content, ctx.config);
            match report.outcome {
                AddItemOutcome::Added { .. } => {
                    ctx.store.emit(GameEvent::LootDropped { item_id, rarity });
                }
                AddItemOutcome::InventoryFull => {
                    warn!(item = %item_id, "inventory full, drop discarded");
                    ctx.store.emit(GameEvent::InventoryFull { item_id, rarity });
                }
            }
        }
    }

    /// One attack by encounter member `index`.
    pub fn enemy_attack<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>, index: usize) -> Vec<TimerRequest> {
        if self.phase != CombatPhase::EncounterActive {
            return Vec::new();
        }
        let Some(member) = self.encounter.as_ref().and_then(|e| e.members.get(index)) else {
            return vec![TimerRequest::Cancel(CombatTimer::EnemyAttack(index))];
        };
        if !member.is_alive() {
            return vec![TimerRequest::Cancel(CombatTimer::EnemyAttack(index))];
        }

        let stats = ctx.stats();
        let chance = hit_chance(member.enemy.accuracy, stats.evade, ctx.config);
        let dodged = ctx.rng.gen::<f64>() >= chance;
        let damage = if dodged {
            0.0
        } else {
            per_hit_damage(member.attack_power(), stats.defense, member.enemy.armor_pen)
                * stats.damage_taken_factor
        };
        ctx.store.damage_player(damage);
        ctx.store.emit(GameEvent::EnemyAttack {
            member: index,
            damage,
            dodged,
        });

        if ctx.store.state().current_hp <= 0.0 {
            self.defeat(ctx)
        } else {
            Vec::new()
        }
    }

    /// Damage-over-time from every living member, bypassing hit chance and
    /// defense.
    pub fn damage_over_time<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) -> Vec<TimerRequest> {
        if self.phase != CombatPhase::EncounterActive {
            return vec![TimerRequest::Cancel(CombatTimer::DamageOverTime)];
        }
        let per_second: f64 = self
            .encounter
            .as_ref()
            .map(|e| e.alive().map(|(_, m)| m.enemy.dot_per_second).sum())
            .unwrap_or(0.0);
        if per_second <= 0.0 {
            return Vec::new();
        }
        let stats = ctx.stats();
        let damage = per_second * (ctx.config.dot_tick_ms / 1000.0) * stats.damage_taken_factor;
        ctx.store.damage_player(damage);
        ctx.store.emit(GameEvent::DamageOverTime { damage });

        if ctx.store.state().current_hp <= 0.0 {
            self.defeat(ctx)
        } else {
            Vec::new()
        }
    }

    /// Player and enemy regeneration for one regen tick.
    pub fn regen<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) {
        if self.phase == CombatPhase::PlayerDefeated {
            return;
        }
        let secs = ctx.config.regen_tick_ms / 1000.0;
        let stats = ctx.stats();
        ctx.store.heal_player(stats.regen * secs, stats.max_hp);

        if let Some(encounter) = self.encounter.as_mut() {
            for member in encounter.members.iter_mut().filter(|m| m.is_alive()) {
                member.hp = (member.hp + member.enemy.regen * secs).min(member.enemy.max_hp);
            }
        }
    }

    fn resolve<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) -> Vec<TimerRequest> {
        self.phase = CombatPhase::Resolved;
        let mut requests = self.cancel_encounter_timers();
        self.encounter = None;
        ctx.store.emit(GameEvent::EncounterResolved);

        self.advance_if_ready(ctx);
        requests.push(TimerRequest::once(CombatTimer::Spawn, ctx.config.spawn_delay_ms));
        requests
    }

    /// Moves to the next zone once the current zone's boss is down and the
    /// next zone is survivable.
    fn advance_if_ready<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) {
        let state = ctx.store.state();
        let zone = state.current_zone;
        let area = state.current_area;
        if !state.boss_defeated(area, zone) || zone >= ctx.content.total_zones() {
            return;
        }
        let next = zone + 1;
        let Some(next_area) = ctx.content.area_for_zone(next).map(|a| a.id) else {
            return;
        };
        match pool_profile(ctx.content, next, ctx.config) {
            Ok(profile) => {
                let outlook = evaluate(&ctx.stats(), &profile, ctx.config);
                if outlook.is_winnable() {
                    ctx.store.set_zone(next_area, next);
                } else {
                    debug!(zone = next, ratio = outlook.survival_ratio, "next zone not yet survivable");
                }
            }
            Err(err) => warn!(zone = next, %err, "cannot evaluate next zone"),
        }
    }

    fn defeat<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) -> Vec<TimerRequest> {
        let by_boss = self.encounter.as_ref().is_some_and(|e| e.is_boss);
        if let Some(e) = self.encounter.as_ref().filter(|e| e.is_boss) {
            ctx.store.reset_zone_kills(e.area, e.zone);
        }
        let mut requests = self.cancel_encounter_timers();
        requests.push(TimerRequest::Cancel(CombatTimer::Regen));
        requests.push(TimerRequest::Cancel(CombatTimer::Spawn));

        self.phase = CombatPhase::PlayerDefeated;
        self.encounter = None;
        info!(by_boss, "player defeated");
        ctx.store.emit(GameEvent::PlayerDefeated { by_boss });
        requests
    }

    fn cancel_encounter_timers(&self) -> Vec<TimerRequest> {
        let mut requests = vec![
            TimerRequest::Cancel(CombatTimer::AutoAttack),
            TimerRequest::Cancel(CombatTimer::DamageOverTime),
        ];
        if let Some(e) = &self.encounter {
            requests.extend((0..e.members.len()).map(|i| TimerRequest::Cancel(CombatTimer::EnemyAttack(i))));
        }
        requests
    }

    /// Restores HP and schedules the next spawn. Only valid after defeat.
    pub fn respawn<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) -> Vec<TimerRequest> {
        if self.phase != CombatPhase::PlayerDefeated {
            return Vec::new();
        }
        let stats = ctx.stats();
        ctx.store.restore_hp(stats.max_hp);
        ctx.store.emit(GameEvent::PlayerRespawned);
        self.phase = CombatPhase::Idle;
        vec![
            TimerRequest::every(CombatTimer::Regen, ctx.config.regen_tick_ms),
            TimerRequest::once(CombatTimer::Spawn, ctx.config.spawn_delay_ms),
        ]
    }

    /// Drops the current encounter without rewards and schedules a fresh
    /// spawn. A defeated player stays defeated.
    pub fn abandon<R: Rng>(&mut self, ctx: &mut CombatCtx<'_, R>) -> Vec<TimerRequest> {
        if self.phase == CombatPhase::PlayerDefeated {
            return Vec::new();
        }
        let mut requests = self.cancel_encounter_timers();
        self.encounter = None;
        self.phase = CombatPhase::Idle;
        requests.push(TimerRequest::every(CombatTimer::Regen, ctx.config.regen_tick_ms));
        requests.push(TimerRequest::once(CombatTimer::Spawn, ctx.config.spawn_delay_ms));
        requests
    }

    /// Re-registers the auto-attack timer after a speed change (stance,
    /// upgrade, equipment).
    pub fn refresh_attack_speed<R: Rng>(&self, ctx: &mut CombatCtx<'_, R>) -> Vec<TimerRequest> {
        if self.phase != CombatPhase::EncounterActive {
            return Vec::new();
        }
        vec![TimerRequest::every(
            CombatTimer::AutoAttack,
            ctx.stats().attack_interval_ms,
        )]
    }

    /// Steady-state forecast against the living members of the current
    /// encounter.
    pub fn outlook(&self, store: &Store, content: &ContentDb, config: &GameConfig) -> Option<CombatOutlook> {
        let encounter = self.encounter.as_ref()?;
        let alive: Vec<ScaledEnemy> = encounter.alive().map(|(_, m)| m.enemy.clone()).collect();
        let profile = encounter_profile(&alive, encounter.reward_mult, encounter.loot_bonus, config);
        let stats = DerivedStats::derive(store.state(), content, config);
        Some(evaluate(&stats, &profile, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::types::EnrageTrait;
    use crate::state::player::PlayerState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Harness {
        store: Store,
        content: ContentDb,
        config: GameConfig,
        rng: ChaCha8Rng,
    }

    impl Harness {
        fn new() -> Self {
            let config = GameConfig::default();
            Self {
                store: Store::new(PlayerState::new(&config)),
                content: ContentDb::builtin(),
                config,
                rng: ChaCha8Rng::seed_from_u64(42),
            }
        }

        fn ctx(&mut self) -> CombatCtx<'_, ChaCha8Rng> {
            CombatCtx {
                store: &mut self.store,
                content: &self.content,
                config: &self.config,
                rng: &mut self.rng,
            }
        }
    }

    fn scaled(hp: f64) -> ScaledEnemy {
        ScaledEnemy {
            enemy_id: "slime".into(),
            name: "Slime".into(),
            max_hp: hp,
            attack: 5.0,
            defense: 0.0,
            armor_pen: 0.0,
            accuracy: 10.0,
            attack_speed: 1.0,
            dot_per_second: 0.0,
            regen: 0.0,
            thorns: 0.0,
            enrage: None,
            gold: 10.0,
            xp: 20.0,
        }
    }

    fn with_encounter(engine: &mut CombatEngine, members: Vec<ScaledEnemy>, is_boss: bool) {
        engine.phase = CombatPhase::EncounterActive;
        engine.encounter = Some(Encounter {
            template_id: "test".into(),
            area: 1,
            zone: 1,
            is_boss,
            reward_mult: 1.0,
            loot_bonus: 1.0,
            members: members.into_iter().map(LiveMember::new).collect(),
        });
    }

    #[test]
    fn test_spawn_registers_timers() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();

        let requests = engine.spawn(&mut h.ctx()).unwrap();

        assert_eq!(engine.phase(), CombatPhase::EncounterActive);
        let encounter = engine.encounter().unwrap();
        assert!(!encounter.is_boss);
        assert!(requests.contains(&TimerRequest::every(CombatTimer::AutoAttack, 1000.0)));
        for i in 0..encounter.members.len() {
            assert!(requests.iter().any(|r| matches!(
                r,
                TimerRequest::Start { timer: CombatTimer::EnemyAttack(j), .. } if *j == i
            )));
        }
    }

    #[test]
    fn test_spawn_is_noop_while_active() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        engine.spawn(&mut h.ctx()).unwrap();
        let first = engine.encounter().cloned();
        assert!(engine.spawn(&mut h.ctx()).unwrap().is_empty());
        assert_eq!(engine.encounter().cloned(), first);
    }

    #[test]
    fn test_boss_spawns_after_kill_threshold() {
        let mut h = Harness::new();
        for _ in 0..kills_for_boss(1, &h.config) {
            h.store.record_kill("slime", 1, 1);
        }
        let mut engine = CombatEngine::new();
        engine.spawn(&mut h.ctx()).unwrap();
        assert!(engine.encounter().unwrap().is_boss);
    }

    #[test]
    fn test_kill_grants_floored_rewards() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        with_encounter(&mut engine, vec![scaled(1.0)], false);

        let requests = engine.player_attack(&mut h.ctx(), true);

        assert_eq!(engine.phase(), CombatPhase::Resolved);
        assert!(requests.contains(&TimerRequest::once(CombatTimer::Spawn, h.config.spawn_delay_ms)));
        assert_eq!(h.store.state().gold, BigNum::from(10u64));
        assert_eq!(h.store.state().total_kills, 1);
        let events = h.store.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::EnemyKilled { .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::EncounterResolved)));
    }

    #[test]
    fn test_player_targets_first_living_member() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        with_encounter(&mut engine, vec![scaled(1.0), scaled(1_000.0)], false);

        engine.player_attack(&mut h.ctx(), true);
        engine.player_attack(&mut h.ctx(), true);

        let members = &engine.encounter().unwrap().members;
        assert!(!members[0].is_alive());
        assert!(members[1].hp < 1_000.0);
        assert_eq!(engine.phase(), CombatPhase::EncounterActive);
    }

    #[test]
    fn test_forced_crit_consumed_by_next_attack() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        with_encounter(&mut engine, vec![scaled(1_000.0)], false);
        h.store.arm_forced_crit();

        engine.player_attack(&mut h.ctx(), true);

        assert!(!h.store.state().forced_crit);
        let crit = h.store.drain_events().into_iter().find_map(|e| match e {
            GameEvent::PlayerAttack { crit, damage, .. } => Some((crit, damage)),
            _ => None,
        });
        // 12 base * 2.0 crit
        assert_eq!(crit, Some((true, 24.0)));
    }

    #[test]
    fn test_thorns_only_on_auto_attack() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        let mut spiky = scaled(1_000.0);
        spiky.thorns = 7.0;
        with_encounter(&mut engine, vec![spiky], false);
        let start = h.store.state().current_hp;

        engine.player_attack(&mut h.ctx(), true);
        assert_eq!(h.store.state().current_hp, start);

        engine.player_attack(&mut h.ctx(), false);
        assert_eq!(h.store.state().current_hp, start - 7.0);
    }

    #[test]
    fn test_enrage_reregisters_faster_attack() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        let mut brute = scaled(20.0);
        brute.enrage = Some(EnrageTrait {
            threshold: 0.5,
            attack_mult: 2.0,
            speed_mult: 2.0,
        });
        with_encounter(&mut engine, vec![brute], false);

        // One 12-damage click leaves 8/20 HP, below the threshold.
        let requests = engine.player_attack(&mut h.ctx(), true);

        assert!(engine.encounter().unwrap().members[0].enraged);
        assert!(requests.contains(&TimerRequest::every(CombatTimer::EnemyAttack(0), 1000.0)));
    }

    #[test]
    fn test_defeat_stops_attacks_until_respawn() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        let mut killer = scaled(1_000.0);
        killer.attack = 10_000.0;
        killer.accuracy = 1e9;
        with_encounter(&mut engine, vec![killer], false);

        let requests = engine.enemy_attack(&mut h.ctx(), 0);

        assert_eq!(engine.phase(), CombatPhase::PlayerDefeated);
        assert!(requests.contains(&TimerRequest::Cancel(CombatTimer::AutoAttack)));
        assert!(requests.contains(&TimerRequest::Cancel(CombatTimer::EnemyAttack(0))));
        assert!(engine.player_attack(&mut h.ctx(), true).is_empty());
        assert!(engine.spawn(&mut h.ctx()).unwrap().is_empty());

        let requests = engine.respawn(&mut h.ctx());
        assert_eq!(engine.phase(), CombatPhase::Idle);
        assert!(requests.contains(&TimerRequest::once(CombatTimer::Spawn, h.config.spawn_delay_ms)));
        assert_eq!(h.store.state().current_hp, h.config.starting_stats.hp);
    }

    #[test]
    fn test_abandon_drops_encounter_without_rewards() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        with_encounter(&mut engine, vec![scaled(50.0), scaled(50.0)], false);

        let requests = engine.abandon(&mut h.ctx());

        assert_eq!(engine.phase(), CombatPhase::Idle);
        assert!(engine.encounter().is_none());
        assert!(requests.contains(&TimerRequest::Cancel(CombatTimer::EnemyAttack(1))));
        assert!(requests.contains(&TimerRequest::once(CombatTimer::Spawn, h.config.spawn_delay_ms)));
        assert!(h.store.state().gold.is_zero());
        assert_eq!(h.store.state().total_kills, 0);
    }

    #[test]
    fn test_dying_to_boss_resets_zone_kills() {
        let mut h = Harness::new();
        for _ in 0..5 {
            h.store.record_kill("slime", 1, 1);
        }
        let mut engine = CombatEngine::new();
        let mut boss = scaled(1_000.0);
        boss.attack = 10_000.0;
        boss.accuracy = 1e9;
        with_encounter(&mut engine, vec![boss], true);

        engine.enemy_attack(&mut h.ctx(), 0);

        assert_eq!(h.store.state().zone_kills(1, 1), 0);
        let events = h.store.drain_events();
        assert!(events.contains(&GameEvent::PlayerDefeated { by_boss: true }));
    }

    #[test]
    fn test_dot_bypasses_hit_chance() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        let mut venom = scaled(1_000.0);
        venom.dot_per_second = 3.0;
        venom.accuracy = 0.0;
        with_encounter(&mut engine, vec![venom], false);
        let start = h.store.state().current_hp;

        engine.damage_over_time(&mut h.ctx());

        assert_eq!(h.store.state().current_hp, start - 3.0);
    }

    #[test]
    fn test_regen_heals_player_and_enemies() {
        let mut h = Harness::new();
        let mut engine = CombatEngine::new();
        let mut troll = scaled(100.0);
        troll.regen = 5.0;
        with_encounter(&mut engine, vec![troll], false);
        engine.encounter.as_mut().unwrap().members[0].hp = 50.0;
        h.store.damage_player(10.0);
        let hp = h.store.state().current_hp;

        engine.regen(&mut h.ctx());

        assert_eq!(engine.encounter().unwrap().members[0].hp, 55.0);
        assert_eq!(h.store.state().current_hp, hp + h.config.starting_stats.regen);
    }

    #[test]
    fn test_kill_reward_scales_with_multipliers() {
        let config = GameConfig {
            fragment_drop_rate: 1.0,
            ..Default::default()
        };
        let state = PlayerState::new(&config);
        let mut stats = DerivedStats::derive(&state, &ContentDb::builtin(), &config);
        stats.gold_multiplier = 1.5;
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let reward = kill_reward(&scaled(1.0), 1.25, &stats, &config, &mut rng);

        // floor(10 * 1.25 * 1.5) = 18
        assert_eq!(reward.gold, BigNum::from(18u64));
        assert_eq!(reward.xp, BigNum::from(25u64));
        assert_eq!(reward.fragments, BigNum::from(1u64));
    }
}
