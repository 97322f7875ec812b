//! Per-key debounce logic.
//!
//! Every sample bumps one counter and halves the other. A run of samples in
//! the same direction builds up an advantage quickly, while a single
//! contrary sample only costs half of the opposing count instead of a full
//! reset. The decision itself compares the two counters and is gated by a
//! minimum dwell time between committed Press/Release transitions.

use crate::counter::Counter;
use crate::key::{KeyPosition, Timestamp};

/// What a decision step did to a key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// A Press or Release was committed and the decision time moved.
    Transition,
    /// Hold stayed Hold or Off stayed Off.
    Steady,
    /// The counters flipped before the dwell time ran out; the previous
    /// state was repeated.
    Chatter,
    /// The previous state was `Invalid`. Only reachable through a logic bug.
    Defect,
}

/// Result of one decision step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    pub position: KeyPosition,
    pub outcome: Outcome,
}

/// Debounce record for a single matrix position.
#[derive(Copy, Clone, Debug)]
pub struct KeyState<C> {
    active_count: C,
    inactive_count: C,
    prev_state: KeyPosition,
    cur_state: KeyPosition,
    prev_decision_time: Timestamp,
    elapsed: Timestamp,
    last_good: KeyPosition,
}

impl<C: Counter> KeyState<C> {
    /// A key in the Off steady state: the inactive counter starts full so
    /// a cold boot needs a real run of active samples before a press.
    pub fn new(threshold: C) -> Self {
        Self {
            active_count: C::ZERO,
            inactive_count: threshold,
            prev_state: KeyPosition::Off,
            cur_state: KeyPosition::Off,
            prev_decision_time: 0,
            elapsed: 0,
            last_good: KeyPosition::Off,
        }
    }

    pub fn active_count(&self) -> C {
        self.active_count
    }

    pub fn inactive_count(&self) -> C {
        self.inactive_count
    }

    pub fn prev_state(&self) -> KeyPosition {
        self.prev_state
    }

    pub fn cur_state(&self) -> KeyPosition {
        self.cur_state
    }

    pub fn prev_decision_time(&self) -> Timestamp {
        self.prev_decision_time
    }

    /// Time from the previous committed transition to the latest decision,
    /// measured before that decision could move it.
    pub fn elapsed(&self) -> Timestamp {
        self.elapsed
    }

    /// Roll the state over at the start of a scan cycle.
    ///
    /// Returns `false` if the key was never decided last cycle. In that case
    /// the previous state is kept instead of inheriting `Invalid`.
    pub fn begin_cycle(&mut self) -> bool {
        let decided = self.cur_state != KeyPosition::Invalid;
        if decided {
            self.prev_state = self.cur_state;
        }
        self.cur_state = KeyPosition::Invalid;
        decided
    }

    /// Feed one raw electrical sample into the counters.
    pub fn sample(&mut self, raw_active: bool, threshold: C) {
        if raw_active {
            self.active_count = self.active_count.bump(threshold);
            self.inactive_count = self.inactive_count.decay();
        } else {
            self.inactive_count = self.inactive_count.bump(threshold);
            self.active_count = self.active_count.decay();
        }
    }

    /// Whether a decision is still pending this cycle.
    pub fn undecided(&self) -> bool {
        self.cur_state == KeyPosition::Invalid
    }

    /// Decide this cycle's state from the counters.
    pub fn decide(&mut self, now: Timestamp, debounce_ms: u8) -> Decision {
        let elapsed = now.wrapping_sub(self.prev_decision_time);
        let dwelled = elapsed >= u32::from(debounce_ms);
        let active = self.active_count > self.inactive_count;

        let (position, outcome) = match self.prev_state {
            KeyPosition::Press | KeyPosition::Hold => {
                if active {
                    (KeyPosition::Hold, Outcome::Steady)
                } else if !dwelled {
                    (self.prev_state, Outcome::Chatter)
                } else {
                    (KeyPosition::Release, Outcome::Transition)
                }
            }
            KeyPosition::Release | KeyPosition::Off => {
                if !active {
                    (KeyPosition::Off, Outcome::Steady)
                } else if !dwelled {
                    (self.prev_state, Outcome::Chatter)
                } else {
                    (KeyPosition::Press, Outcome::Transition)
                }
            }
            // Keep the last decided position, without a fresh edge.
            KeyPosition::Invalid => {
                let fallback = if self.last_good.is_on() {
                    KeyPosition::Hold
                } else {
                    KeyPosition::Off
                };
                (fallback, Outcome::Defect)
            }
        };

        self.elapsed = elapsed;
        self.cur_state = position;
        self.last_good = position;
        if outcome == Outcome::Transition {
            self.prev_decision_time = now;
        }

        Decision { position, outcome }
    }

    /// Sample and, if this key has not been decided yet this cycle, decide.
    pub fn update(
        &mut self,
        raw_active: bool,
        now: Timestamp,
        threshold: C,
        debounce_ms: u8,
    ) -> Option<Decision> {
        self.sample(raw_active, threshold);
        if self.undecided() {
            Some(self.decide(now, debounce_ms))
        } else {
            None
        }
    }
}

#[cfg(test)]
impl<C> KeyState<C> {
    /// Put the key into the state a logic bug would leave behind.
    pub(crate) fn corrupt(&mut self) {
        self.prev_state = KeyPosition::Invalid;
        self.cur_state = KeyPosition::Invalid;
    }
}
