//! Simulated matrix hardware for replaying scripts on the host.

use embedded_hal::delay::DelayNs;
use matrix_scan::{
    ActivityKind, Event, EventSink, Gpio, KeyPosition, Level, Matrix, NoLatency, PinMode,
    ScanCode,
};

use crate::config::{MAX_COLS, MAX_ROWS};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pin {
    Strobe(usize),
    Sense(usize),
}

pub type SimMatrix<'a> = Matrix<'a, SimBoard, SimDelay, u16, MAX_ROWS, MAX_COLS, NoLatency>;

/// Switches plus the electrical behaviour of the wiring.
///
/// With diodes a sense row reads high when a strobe driven high closes
/// into it. Without diodes a strobe driven low pulls down every row it
/// reaches through any chain of closed switches, ghosts included.
pub struct SimBoard {
    diodes: bool,
    closed: [[bool; MAX_COLS]; MAX_ROWS],
    strobes: [Option<Level>; MAX_COLS],
}

impl SimBoard {
    pub fn new(diodes: bool) -> Self {
        Self {
            diodes,
            closed: [[false; MAX_COLS]; MAX_ROWS],
            strobes: [None; MAX_COLS],
        }
    }

    pub fn set(&mut self, row: usize, col: usize, closed: bool) {
        self.closed[row][col] = closed;
    }

    pub fn toggle(&mut self, row: usize, col: usize) {
        self.closed[row][col] = !self.closed[row][col];
    }

    fn reaches_low_strobe(&self, row: usize) -> bool {
        let mut rows = [false; MAX_ROWS];
        let mut cols = [false; MAX_COLS];
        rows[row] = true;
        let mut grew = true;
        while grew {
            grew = false;
            for r in 0..MAX_ROWS {
                for c in 0..MAX_COLS {
                    if self.closed[r][c] && rows[r] != cols[c] {
                        rows[r] = true;
                        cols[c] = true;
                        grew = true;
                    }
                }
            }
        }
        (0..MAX_COLS).any(|c| cols[c] && self.strobes[c] == Some(Level::Low))
    }
}

impl Gpio for SimBoard {
    type Pin = Pin;

    fn configure(&mut self, pin: Pin, _mode: PinMode) {
        if let Pin::Strobe(col) = pin {
            self.strobes[col] = None;
        }
    }

    fn drive(&mut self, pin: Pin, level: Level) {
        if let Pin::Strobe(col) = pin {
            self.strobes[col] = Some(level);
        }
    }

    fn read(&mut self, pin: Pin) -> bool {
        match pin {
            Pin::Sense(row) if self.diodes => (0..MAX_COLS)
                .any(|c| self.closed[row][c] && self.strobes[c] == Some(Level::High)),
            Pin::Sense(row) => !self.reaches_low_strobe(row),
            Pin::Strobe(col) => self.strobes[col].is_some_and(Level::is_high),
        }
    }
}

/// Simulated lines settle instantly.
pub struct SimDelay;

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Events of the most recent scan cycle.
#[derive(Default)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventSink for EventLog {
    fn on_key_state(&mut self, code: ScanCode, state: KeyPosition) {
        self.events.push(Event::Key { code, state });
    }

    fn on_activity_tick(&mut self, kind: ActivityKind) {
        self.events.push(Event::Activity(kind));
    }
}
