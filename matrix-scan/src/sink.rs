//! Outbound events.
//!
//! Every key is reported once per completed scan cycle, including repeated
//! `Hold` and `Off`, not only on change. Downstream hold and repeat timing
//! counts on that steady cadence.

use heapless::Deque;

use crate::activity::ActivityKind;
use crate::key::{KeyPosition, ScanCode};

/// Consumer of scanner output, usually the macro engine.
pub trait EventSink {
    /// `state` is never `KeyPosition::Invalid`.
    fn on_key_state(&mut self, code: ScanCode, state: KeyPosition);

    fn on_activity_tick(&mut self, kind: ActivityKind);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Key { code: ScanCode, state: KeyPosition },
    Activity(ActivityKind),
}

/// Fixed-capacity event buffer drained by the next pipeline stage.
///
/// Size it for at least one full cycle (`ROWS * COLS` keys plus one
/// activity event). When full, new events are dropped and counted.
pub struct EventQueue<const N: usize> {
    events: Deque<Event, N>,
    dropped: u32,
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
            dropped: 0,
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events lost to a full buffer since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Remove and yield every queued event in order.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        core::iter::from_fn(move || self.events.pop_front())
    }

    fn push(&mut self, event: Event) {
        if self.events.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            log::warn!("event queue full, dropped {:?}", event);
        }
    }
}

impl<const N: usize> EventSink for EventQueue<N> {
    fn on_key_state(&mut self, code: ScanCode, state: KeyPosition) {
        self.push(Event::Key { code, state });
    }

    fn on_activity_tick(&mut self, kind: ActivityKind) {
        self.push(Event::Activity(kind));
    }
}
