//! Capability interfaces the scanner consumes from the board.
//!
//! Register access lives with the board support code; the scanner only
//! sees these traits.

use crate::key::Timestamp;

/// Electrical mode of a matrix pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Internal pull-up.
    Pullup,
    /// Internal pull-down.
    Pulldown,
    /// Open-drain driver with an external pull resistor.
    Opendrain,
    /// No pull, plain high-impedance input.
    None,
}

/// Logic level on a pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

/// Which level means "strobe asserted" and "key closed".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    pub fn active(self) -> Level {
        match self {
            Polarity::ActiveHigh => Level::High,
            Polarity::ActiveLow => Level::Low,
        }
    }

    pub fn inactive(self) -> Level {
        match self {
            Polarity::ActiveHigh => Level::Low,
            Polarity::ActiveLow => Level::High,
        }
    }

    /// Translate a raw pin reading into "key closed".
    pub fn is_active(self, high: bool) -> bool {
        high == self.active().is_high()
    }
}

/// GPIO access for strobe and sense lines.
///
/// `configure` releases the pin to input with the given mode (or, for
/// `Opendrain`, selects the open-drain driver). `drive` switches the pin to
/// output at the given level. `read` samples the input.
pub trait Gpio {
    type Pin: Copy;

    fn configure(&mut self, pin: Self::Pin, mode: PinMode);
    fn drive(&mut self, pin: Self::Pin, level: Level);
    fn read(&mut self, pin: Self::Pin) -> bool;
}

/// Monotonic millisecond clock, advanced by a timer interrupt.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

impl<F: Fn() -> Timestamp> Clock for F {
    fn now(&self) -> Timestamp {
        self()
    }
}

/// Latency instrumentation bracketing one full scan cycle.
pub trait Latency {
    fn start(&mut self);
    fn end(&mut self);
}

/// Latency hook that records nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoLatency;

impl Latency for NoLatency {
    fn start(&mut self) {}
    fn end(&mut self) {}
}
