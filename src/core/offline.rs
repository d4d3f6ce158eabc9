//! Offline progression.
//!
//! Projects rewards for time the player was away without replaying combat.
//! The estimate collapses the current zone's encounter pool into one
//! weighted profile and runs it through the same steady-state math as live
//! combat pacing, so online and offline throughput agree.

use crate::character::derived_stats::DerivedStats;
use crate::combat::math::evaluate;
use crate::combat::types::CombatError;
use crate::core::bignum::BigNum;
use crate::core::config::GameConfig;
use crate::state::player::PlayerState;
use crate::state::store::Store;
use crate::zones::content::ContentDb;
use crate::zones::encounters::pool_profile;
use tracing::{debug, info};

/// Report of offline progression results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OfflineReport {
    /// Seconds credited after clamping. Zero when nothing was applied.
    pub elapsed_seconds: f64,
    /// Encounters cleared.
    pub kills: u64,
    /// Average seconds per encounter including the respawn delay.
    pub time_per_kill: f64,
    pub gold: BigNum,
    pub xp: BigNum,
    pub fragments: BigNum,
    pub level_before: u32,
    pub level_after: u32,
}

impl OfflineReport {
    pub fn is_empty(&self) -> bool {
        self.elapsed_seconds <= 0.0
    }

    pub fn levels_gained(&self) -> u32 {
        self.level_after.saturating_sub(self.level_before)
    }
}

/// Estimates offline rewards without touching the state.
///
/// `elapsed_secs` is clamped to `offline_max_seconds`. Anything below
/// `offline_min_seconds` (or not positive) yields an empty report.
pub fn estimate(
    state: &PlayerState,
    content: &ContentDb,
    config: &GameConfig,
    elapsed_secs: f64,
) -> Result<OfflineReport, CombatError> {
    let level = state.player_stats.level;
    let empty = OfflineReport {
        level_before: level,
        level_after: level,
        ..Default::default()
    };
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 || elapsed_secs < config.offline_min_seconds {
        return Ok(empty);
    }
    let elapsed = elapsed_secs.min(config.offline_max_seconds);

    let profile = pool_profile(content, state.current_zone, config)?;
    let stats = DerivedStats::derive(state, content, config);
    let outlook = evaluate(&stats, &profile, config);

    let spawn_delay = config.spawn_delay_ms / 1000.0;
    let (kills, time_per_kill) = if outlook.is_unkillable() {
        (0, f64::INFINITY)
    } else {
        let per_kill = profile.hp / outlook.net_player_dps + spawn_delay;
        ((elapsed / per_kill).floor() as u64, per_kill)
    };

    let total = |per_kill: f64| BigNum::from(kills).mul_f64(per_kill).floor().non_negative();
    let report = OfflineReport {
        elapsed_seconds: elapsed,
        kills,
        time_per_kill,
        gold: total(profile.gold * stats.gold_multiplier),
        xp: total(profile.xp * stats.xp_multiplier),
        fragments: total(profile.fragments * stats.fragment_multiplier),
        level_before: level,
        level_after: level,
    };
    debug!(
        elapsed,
        kills,
        time_per_kill,
        survival_ratio = outlook.survival_ratio,
        "offline estimate"
    );
    Ok(report)
}

/// Applies an estimate: currencies, XP through the level-up path, bulk kill
/// count, then HP resynced to the new max.
pub fn apply(
    store: &mut Store,
    content: &ContentDb,
    config: &GameConfig,
    mut report: OfflineReport,
    members_per_kill: f64,
) -> OfflineReport {
    if report.is_empty() {
        return report;
    }
    store.add_gold(&report.gold);
    store.add_fragments(&report.fragments);
    let summary = store.grant_xp(&report.xp, config);
    store.record_bulk_kills((report.kills as f64 * members_per_kill.max(1.0)).floor() as u64);

    let max_hp = DerivedStats::derive(store.state(), content, config).max_hp;
    store.restore_hp(max_hp);

    report.level_before = summary.level_before;
    report.level_after = summary.level_after;
    info!(
        seconds = report.elapsed_seconds,
        kills = report.kills,
        gold = %report.gold,
        levels = report.levels_gained(),
        "offline progress applied"
    );
    report
}

/// Estimates and applies `elapsed_secs` of offline time, stamping
/// `last_online` with `now` when anything was credited.
pub fn process_offline(
    store: &mut Store,
    content: &ContentDb,
    config: &GameConfig,
    elapsed_secs: f64,
    now: i64,
) -> Result<OfflineReport, CombatError> {
    let report = estimate(store.state(), content, config, elapsed_secs)?;
    if report.is_empty() {
        return Ok(report);
    }
    let members = pool_profile(content, store.state().current_zone, config)?.member_count;
    let report = apply(store, content, config, report, members);
    store.touch_last_online(now);
    Ok(report)
}

/// Offline progress since the last recorded online (or save) timestamp.
pub fn process_offline_since(
    store: &mut Store,
    content: &ContentDb,
    config: &GameConfig,
    now: i64,
) -> Result<OfflineReport, CombatError> {
    let stamps = &store.state().timestamps;
    let since = if stamps.last_online > 0 {
        stamps.last_online
    } else {
        stamps.last_save
    };
    let elapsed = if since > 0 { (now - since) as f64 } else { 0.0 };
    process_offline(store, content, config, elapsed, now)
}
