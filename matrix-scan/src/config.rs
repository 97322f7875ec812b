//! Build-time matrix description and its validation.

use core::fmt;

use crate::activity::ActivityConfig;
use crate::counter::Counter;
use crate::gpio::{PinMode, Polarity};
use crate::remap::ScanCodeMap;

/// Ghost handling for the matrix wiring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GhostMode {
    /// One diode per switch; every reading is trustworthy.
    Disabled,
    /// No diodes. Idle strobes float and ambiguous rectangles are masked.
    Diodeless,
}

/// Scan timing knobs. These can also be changed at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanTiming {
    /// Minimum time between committed Press/Release transitions.
    pub debounce_ms: u8,
    /// Settle time between asserting a strobe and sampling.
    pub strobe_delay_us: u8,
    /// Strobe columns scanned per `scan_step` call.
    pub strobes_per_step: u8,
    /// Drive every sense line inactive before each strobe to bleed off
    /// charge left by weak pull resistors.
    pub drain_senses: bool,
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self {
            debounce_ms: 5,
            strobe_delay_us: 0,
            strobes_per_step: 1,
            drain_senses: false,
        }
    }
}

/// Everything the engine needs to know about one keyboard matrix.
///
/// Strobes are columns, senses are rows. Linear key index is
/// `row * COLS + col`.
#[derive(Copy, Clone, Debug)]
pub struct MatrixConfig<'a, P, C, const ROWS: usize, const COLS: usize> {
    pub strobes: [P; COLS],
    pub senses: [P; ROWS],
    /// Sense pull resistor. `Opendrain` also selects the open-drain driver
    /// for the strobes.
    pub pin_mode: PinMode,
    pub polarity: Polarity,
    /// Saturation point of both debounce counters.
    pub threshold: C,
    pub timing: ScanTiming,
    pub ghost: GhostMode,
    pub scan_codes: ScanCodeMap<'a>,
    pub activity: ActivityConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Counters saturating at zero can never tell active from inactive.
    ZeroThreshold,
    ZeroStrobesPerStep,
    /// A matrix needs at least one strobe and one sense line.
    EmptyMatrix,
    /// More positions than a scan code can address.
    MatrixTooLarge,
    /// Activity windows must be between 1 and `max_ticks`.
    ActivityWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroThreshold => f.write_str("debounce threshold must be non-zero"),
            ConfigError::ZeroStrobesPerStep => f.write_str("strobes per step must be at least 1"),
            ConfigError::EmptyMatrix => f.write_str("matrix has no strobe or no sense lines"),
            ConfigError::MatrixTooLarge => {
                f.write_str("matrix has more positions than scan codes can address")
            }
            ConfigError::ActivityWindow => {
                f.write_str("activity windows must be between 1 and max_ticks")
            }
        }
    }
}

impl<'a, P, C: Counter, const ROWS: usize, const COLS: usize> MatrixConfig<'a, P, C, ROWS, COLS> {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if ROWS == 0 || COLS == 0 {
            return Err(ConfigError::EmptyMatrix);
        }
        if ROWS.saturating_mul(COLS) > usize::from(u16::MAX) {
            return Err(ConfigError::MatrixTooLarge);
        }
        if self.threshold == C::ZERO {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.timing.strobes_per_step == 0 {
            return Err(ConfigError::ZeroStrobesPerStep);
        }
        self.activity.validate()
    }
}
