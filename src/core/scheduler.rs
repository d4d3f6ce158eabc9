//! Frame-driven interval timers.
//!
//! The scheduler owns a registry of tickers keyed by an ordered key type and is
//! advanced by the host with the elapsed wall time of each frame. Callbacks run
//! synchronously inside [`Scheduler::advance`] and receive both the shared
//! context and the scheduler itself, so a callback may register, replace or
//! cancel tickers (including its own) while the pass is running.

use std::collections::BTreeMap;

/// Callback invoked when a ticker fires.
pub type TickerFn<K, C> = Box<dyn FnMut(&mut C, &mut Scheduler<K, C>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerMode {
    /// Fires every `interval` ms; overshoot carries into the next period.
    Recurring,
    /// Fires once and is removed before its callback runs.
    OneShot,
}

struct Ticker<K, C> {
    /// `None` while the callback is executing.
    callback: Option<TickerFn<K, C>>,
    interval_ms: f64,
    accumulated_ms: f64,
    enabled: bool,
    mode: TickerMode,
    /// Bumped on every registration so a replaced entry is never restored.
    generation: u64,
}

pub struct Scheduler<K, C> {
    tickers: BTreeMap<K, Ticker<K, C>>,
    next_generation: u64,
}

impl<K: Ord + Clone, C> Default for Scheduler<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, C> Scheduler<K, C> {
    pub fn new() -> Self {
        Self {
            tickers: BTreeMap::new(),
            next_generation: 0,
        }
    }

    /// Registers a ticker, replacing any existing entry under `key`.
    ///
    /// The replacement starts with zero accumulated time. Intervals below
    /// 1 ms are raised to 1 ms so a recurring ticker cannot spin.
    pub fn register<F>(&mut self, key: K, interval_ms: f64, mode: TickerMode, callback: F)
    where
        F: FnMut(&mut C, &mut Scheduler<K, C>) + 'static,
    {
        self.next_generation += 1;
        let interval_ms = if interval_ms.is_finite() {
            interval_ms.max(1.0)
        } else {
            f64::MAX
        };
        self.tickers.insert(
            key,
            Ticker {
                callback: Some(Box::new(callback)),
                interval_ms,
                accumulated_ms: 0.0,
                enabled: true,
                mode,
                generation: self.next_generation,
            },
        );
    }

    /// Removes a ticker. Returns whether it was registered.
    ///
    /// A ticker cancelled from inside another callback does not fire later
    /// in the same pass.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.tickers.remove(key).is_some()
    }

    /// Pauses or resumes a ticker. Disabled tickers do not accumulate time.
    pub fn set_enabled(&mut self, key: &K, enabled: bool) -> bool {
        match self.tickers.get_mut(key) {
            Some(ticker) => {
                ticker.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, key: &K) -> bool {
        self.tickers.contains_key(key)
    }

    pub fn interval(&self, key: &K) -> Option<f64> {
        self.tickers.get(key).map(|t| t.interval_ms)
    }

    /// Time accumulated toward the next firing.
    pub fn accumulated(&self, key: &K) -> Option<f64> {
        self.tickers.get(key).map(|t| t.accumulated_ms)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn clear(&mut self) {
        self.tickers.clear();
    }

    /// Advances every enabled ticker by `elapsed_ms` and fires those that are
    /// due, in key order. Each ticker fires at most once per call.
    ///
    /// Tickers registered during the pass start accumulating on the next call.
    /// Returns how many callbacks ran. Non-positive or non-finite elapsed
    /// values are ignored.
    pub fn advance(&mut self, ctx: &mut C, elapsed_ms: f64) -> usize {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0;
        }

        for ticker in self.tickers.values_mut().filter(|t| t.enabled) {
            ticker.accumulated_ms += elapsed_ms;
        }

        let due: Vec<(K, u64)> = self
            .tickers
            .iter()
            .filter(|(_, t)| t.enabled && t.accumulated_ms >= t.interval_ms)
            .map(|(k, t)| (k.clone(), t.generation))
            .collect();

        let mut fired = 0;
        for (key, generation) in due {
            // Earlier callbacks may have cancelled, replaced or disabled it.
            let Some(ticker) = self.tickers.get_mut(&key) else {
                continue;
            };
            if ticker.generation != generation || !ticker.enabled {
                continue;
            }

            match ticker.mode {
                TickerMode::OneShot => {
                    let Some(mut ticker) = self.tickers.remove(&key) else {
                        continue;
                    };
                    if let Some(callback) = ticker.callback.as_mut() {
                        callback(ctx, self);
                        fired += 1;
                    }
                }
                TickerMode::Recurring => {
                    ticker.accumulated_ms -= ticker.interval_ms;
                    let Some(mut callback) = ticker.callback.take() else {
                        continue;
                    };
                    callback(ctx, self);
                    fired += 1;
                    if let Some(ticker) = self.tickers.get_mut(&key) {
                        if ticker.generation == generation {
                            ticker.callback = Some(callback);
                        }
                    }
                }
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn recorder(name: &'static str) -> impl FnMut(&mut Log, &mut Scheduler<u32, Log>) {
        move |log: &mut Log, _: &mut Scheduler<u32, Log>| log.push(name)
    }

    #[test]
    fn test_fires_when_interval_reached() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 100.0, TickerMode::Recurring, recorder("a"));

        assert_eq!(sched.advance(&mut log, 99.0), 0);
        assert_eq!(sched.advance(&mut log, 1.0), 1);
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn test_overshoot_carries_forward() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 100.0, TickerMode::Recurring, recorder("a"));

        sched.advance(&mut log, 150.0);
        assert_eq!(sched.accumulated(&1), Some(50.0));
        // 50 carried + 50 = 100 fires again
        sched.advance(&mut log, 50.0);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_jittered_frames_keep_average_cadence() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 100.0, TickerMode::Recurring, recorder("a"));

        let frames = [16.0, 17.0, 33.0, 16.0, 18.0];
        let mut total = 0.0;
        for i in 0..200 {
            let dt = frames[i % frames.len()];
            total += dt;
            sched.advance(&mut log, dt);
        }
        let expected = (total / 100.0_f64).floor() as usize;
        assert_eq!(log.len(), expected, "cadence should track total time");
    }

    #[test]
    fn test_one_shot_removed_after_firing() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(7, 50.0, TickerMode::OneShot, recorder("once"));

        sched.advance(&mut log, 60.0);
        sched.advance(&mut log, 60.0);
        assert_eq!(log, vec!["once"]);
        assert!(!sched.is_registered(&7));
    }

    #[test]
    fn test_register_same_key_replaces() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 100.0, TickerMode::Recurring, recorder("old"));
        sched.register(1, 100.0, TickerMode::Recurring, recorder("new"));

        assert_eq!(sched.len(), 1);
        sched.advance(&mut log, 100.0);
        assert_eq!(log, vec!["new"]);
    }

    #[test]
    fn test_cancel_from_earlier_callback_prevents_firing() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 10.0, TickerMode::Recurring, |log: &mut Log, s: &mut Scheduler<u32, Log>| {
            log.push("canceller");
            s.cancel(&2);
        });
        sched.register(2, 10.0, TickerMode::Recurring, recorder("victim"));

        sched.advance(&mut log, 10.0);
        assert_eq!(log, vec!["canceller"]);
        assert!(!sched.is_registered(&2));
    }

    #[test]
    fn test_self_replacement_inside_callback() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 10.0, TickerMode::Recurring, |log: &mut Log, s: &mut Scheduler<u32, Log>| {
            log.push("first");
            s.register(1, 5.0, TickerMode::Recurring, recorder("second"));
        });

        sched.advance(&mut log, 10.0);
        assert_eq!(sched.interval(&1), Some(5.0));
        sched.advance(&mut log, 5.0);
        assert_eq!(log, vec!["first", "second"]);
    }

    #[test]
    fn test_self_cancel_inside_callback() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 10.0, TickerMode::Recurring, |log: &mut Log, s: &mut Scheduler<u32, Log>| {
            log.push("tick");
            s.cancel(&1);
        });

        sched.advance(&mut log, 10.0);
        sched.advance(&mut log, 10.0);
        assert_eq!(log, vec!["tick"]);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_registered_during_pass_waits_for_next_advance() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 10.0, TickerMode::OneShot, |log: &mut Log, s: &mut Scheduler<u32, Log>| {
            log.push("spawner");
            s.register(2, 1.0, TickerMode::OneShot, recorder("child"));
        });

        sched.advance(&mut log, 100.0);
        assert_eq!(log, vec!["spawner"]);
        sched.advance(&mut log, 1.0);
        assert_eq!(log, vec!["spawner", "child"]);
    }

    #[test]
    fn test_disabled_ticker_does_not_accumulate() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 10.0, TickerMode::Recurring, recorder("a"));
        sched.set_enabled(&1, false);

        sched.advance(&mut log, 100.0);
        assert!(log.is_empty());
        assert_eq!(sched.accumulated(&1), Some(0.0));

        sched.set_enabled(&1, true);
        sched.advance(&mut log, 10.0);
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn test_firing_order_follows_keys() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(3, 10.0, TickerMode::Recurring, recorder("c"));
        sched.register(1, 10.0, TickerMode::Recurring, recorder("a"));
        sched.register(2, 10.0, TickerMode::Recurring, recorder("b"));

        sched.advance(&mut log, 10.0);
        assert_eq!(log, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_elapsed_ignored() {
        let mut sched: Scheduler<u32, Log> = Scheduler::new();
        let mut log = Log::new();
        sched.register(1, 10.0, TickerMode::Recurring, recorder("a"));

        assert_eq!(sched.advance(&mut log, 0.0), 0);
        assert_eq!(sched.advance(&mut log, -5.0), 0);
        assert_eq!(sched.advance(&mut log, f64::NAN), 0);
        assert_eq!(sched.accumulated(&1), Some(0.0));
    }
}
