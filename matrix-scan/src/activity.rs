//! Activity and inactivity detection for idle/power policy.
//!
//! Two tick stores count fixed-length wall-clock ticks: one while any key
//! is down, one while the matrix is idle. When a store reaches its window a
//! one-shot event is raised. The tracker only reports raw activity
//! transitions; what to do about them is up to the event consumer.

use crate::config::ConfigError;
use crate::key::Timestamp;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivityKind {
    Active,
    Inactive,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActivityConfig {
    /// Minimum wall-clock time between two ticks in the same store.
    pub tick_ms: u32,
    /// Upper bound on ticks held by a store.
    pub max_ticks: u16,
    /// Ticks of activity before `Active` is raised. The first tick counts
    /// on the first active cycle, so `1` raises at once.
    pub active_ticks: u16,
    /// Ticks of inactivity before `Inactive` is raised. Raised
    /// `(inactive_ticks - 1) * tick_ms` after the first idle cycle.
    pub inactive_ticks: u16,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        // Report activity on the first active cycle, idle after 5 minutes.
        Self {
            tick_ms: 1000,
            max_ticks: 600,
            active_ticks: 1,
            inactive_ticks: 301,
        }
    }
}

impl ActivityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = 1..=self.max_ticks;
        if window.contains(&self.active_ticks) && window.contains(&self.inactive_ticks) {
            Ok(())
        } else {
            Err(ConfigError::ActivityWindow)
        }
    }
}

/// Bounded tick counter.
///
/// A fresh store (just reset, nothing counted yet) takes its first tick
/// immediately and anchors the tick spacing there, so a stale timestamp
/// from before the reset can never count as elapsed time. A window of `N`
/// ticks therefore spans `N - 1` tick durations.
#[derive(Copy, Clone, Debug)]
pub struct TickStore {
    count: u16,
    last_tick: Timestamp,
    fresh: bool,
    raised: bool,
}

impl Default for TickStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TickStore {
    pub const fn new() -> Self {
        Self {
            count: 0,
            last_tick: 0,
            fresh: true,
            raised: false,
        }
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a tick if one is due. Returns `true` exactly once, on the
    /// tick that brings the store up to `window`.
    pub fn tick(&mut self, now: Timestamp, tick_ms: u32, max_ticks: u16, window: u16) -> bool {
        let due = self.fresh || now.wrapping_sub(self.last_tick) >= tick_ms;
        if !due {
            return false;
        }
        self.fresh = false;
        self.last_tick = now;
        self.count = self.count.saturating_add(1).min(max_ticks);

        if !self.raised && self.count >= window {
            self.raised = true;
            return true;
        }
        false
    }
}

/// Aggregates per-cycle key counts into activity events.
#[derive(Copy, Clone, Debug)]
pub struct ActivityTracker {
    config: ActivityConfig,
    active: TickStore,
    inactive: TickStore,
}

impl ActivityTracker {
    pub const fn new(config: ActivityConfig) -> Self {
        Self {
            config,
            active: TickStore::new(),
            inactive: TickStore::new(),
        }
    }

    pub fn config(&self) -> &ActivityConfig {
        &self.config
    }

    pub fn active_store(&self) -> &TickStore {
        &self.active
    }

    pub fn inactive_store(&self) -> &TickStore {
        &self.inactive
    }

    pub fn reset(&mut self) {
        self.active.reset();
        self.inactive.reset();
    }

    /// Fold one completed scan cycle into the stores.
    ///
    /// `active_count` is the number of keys reported in any state but Off.
    pub fn on_cycle_complete(
        &mut self,
        press_count: usize,
        release_count: usize,
        active_count: usize,
        now: Timestamp,
    ) -> Option<ActivityKind> {
        let cfg = &self.config;
        let event = if active_count > 0 {
            self.active
                .tick(now, cfg.tick_ms, cfg.max_ticks, cfg.active_ticks)
                .then_some(ActivityKind::Active)
        } else {
            self.inactive
                .tick(now, cfg.tick_ms, cfg.max_ticks, cfg.inactive_ticks)
                .then_some(ActivityKind::Inactive)
        };

        // A fresh press cancels any pending idle countdown; a release with
        // nothing new pressed restarts the activity window. Resets apply
        // after the tick: a Release cycle still counts as non-Off.
        if press_count > 0 && release_count == 0 {
            self.inactive.reset();
        }
        if release_count > 0 && press_count == 0 {
            self.active.reset();
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ActivityConfig = ActivityConfig {
        tick_ms: 1,
        max_ticks: 20,
        active_ticks: 1,
        inactive_ticks: 10,
    };

    #[test]
    fn test_store_never_exceeds_max_ticks() {
        let mut store = TickStore::new();
        for now in 0..100 {
            store.tick(now, 1, 20, 10);
        }
        assert_eq!(store.count(), 20);
    }

    #[test]
    fn test_store_raises_once() {
        let mut store = TickStore::new();
        let raised = (0..50).filter(|&now| store.tick(now, 1, 20, 10)).count();
        assert_eq!(raised, 1);
    }

    #[test]
    fn test_ticks_are_rate_limited() {
        let mut store = TickStore::new();
        assert!(store.is_fresh());
        for now in 0..10 {
            store.tick(now, 5, 20, 10);
        }
        // t=0 (fresh) and t=5
        assert_eq!(store.count(), 2);
        assert!(!store.is_fresh());
    }

    #[test]
    fn test_fresh_store_ignores_stale_timestamp() {
        let mut store = TickStore::new();
        store.tick(1_000, 100, 20, 10);
        store.reset();
        // Only 1ms after the previous tick, but the store was reset.
        store.tick(1_001, 100, 20, 10);
        assert_eq!(store.count(), 1);
        store.tick(1_050, 100, 20, 10);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_idle_round_trip() {
        let mut tracker = ActivityTracker::new(CONFIG);
        let mut now = 0;
        let idle = |tracker: &mut ActivityTracker, now: &mut u32, cycles: u32| {
            let mut events = 0;
            for _ in 0..cycles {
                *now += 1;
                if tracker.on_cycle_complete(0, 0, 0, *now) == Some(ActivityKind::Inactive) {
                    events += 1;
                }
            }
            events
        };

        assert_eq!(idle(&mut tracker, &mut now, 9), 0);
        assert_eq!(idle(&mut tracker, &mut now, 1), 1);
        assert_eq!(idle(&mut tracker, &mut now, 30), 0);

        now += 1;
        assert_eq!(tracker.on_cycle_complete(1, 0, 1, now), Some(ActivityKind::Active));
        now += 1;
        assert_eq!(tracker.on_cycle_complete(0, 0, 1, now), None);
        now += 1;
        assert_eq!(tracker.on_cycle_complete(0, 1, 1, now), None);

        // Inactivity window starts over after the press.
        assert_eq!(idle(&mut tracker, &mut now, 9), 0);
        assert_eq!(idle(&mut tracker, &mut now, 1), 1);
    }

    #[test]
    fn test_release_rearms_active() {
        let mut tracker = ActivityTracker::new(CONFIG);
        assert_eq!(tracker.on_cycle_complete(1, 0, 1, 1), Some(ActivityKind::Active));
        assert_eq!(tracker.on_cycle_complete(0, 0, 1, 2), None);
        assert_eq!(tracker.on_cycle_complete(0, 1, 1, 3), None);
        assert_eq!(tracker.on_cycle_complete(0, 0, 0, 4), None);
        assert_eq!(tracker.on_cycle_complete(1, 0, 1, 5), Some(ActivityKind::Active));
    }

    #[test]
    fn test_default_idle_window_is_five_minutes() {
        let mut tracker = ActivityTracker::new(ActivityConfig::default());
        let start = 42;
        let mut raised_at = None;
        for now in (start..start + 400_000).step_by(10) {
            if tracker.on_cycle_complete(0, 0, 0, now) == Some(ActivityKind::Inactive) {
                raised_at = Some(now);
            }
        }
        assert_eq!(raised_at, Some(start + 300_000));
    }

    #[test]
    fn test_window_spans_one_tick_less_than_its_length() {
        let mut store = TickStore::new();
        let raised: Vec<_> = (0..10_000).filter(|&now| store.tick(now, 1000, 600, 3)).collect();
        assert_eq!(raised, [2000]);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(ActivityConfig::default().validate(), Ok(()));
        let mut cfg = ActivityConfig::default();
        cfg.active_ticks = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ActivityWindow));
    }
}
