//! Matrix wiring for the Teensy side of the ErgoDox.
//!
//! The PCB wires the 6 drive pins to physical columns (strobes) and the 7
//! read pins to physical rows (senses):
//!
//!   Strobes (active low):         PB0, PB1, PB2, PB3, PD2, PD3
//!   Senses (input with pull-up):  PF0, PF1, PF4, PF5, PF6, PF7, PB6
//!
//! Only 6 rows carry switches; the PB6 row has no keys behind it.

use matrix_scan::{
    ActivityConfig, GhostMode, MatrixConfig, PinMode, Polarity, ScanCode, ScanCodeMap, ScanTiming,
    NO_KEY,
};

use crate::gpio::{Pin, Port};

pub const ROWS: usize = 7;
pub const COLS: usize = 6;

/// Highest scan code the macro stage accepts.
pub const MAX_SCAN_CODE: ScanCode = 36;

const STROBES: [Pin; COLS] = [
    Pin::new(Port::B, 0),
    Pin::new(Port::B, 1),
    Pin::new(Port::B, 2),
    Pin::new(Port::B, 3),
    Pin::new(Port::D, 2),
    Pin::new(Port::D, 3),
];

const SENSES: [Pin; ROWS] = [
    Pin::new(Port::F, 0),
    Pin::new(Port::F, 1),
    Pin::new(Port::F, 4),
    Pin::new(Port::F, 5),
    Pin::new(Port::F, 6),
    Pin::new(Port::F, 7),
    Pin::new(Port::B, 6),
];

#[rustfmt::skip]
static SCAN_CODES: [ScanCode; ROWS * COLS] = [
     1,  2,  3,  4,  5,  6,
     7,  8,  9, 10, 11, 12,
    13, 14, 15, 16, 17, 18,
    19, 20, 21, 22, 23, 24,
    25, 26, 27, 28, 29, 30,
    31, 32, 33, 34, 35, 36,
    NO_KEY, NO_KEY, NO_KEY, NO_KEY, NO_KEY, NO_KEY,
];

pub fn matrix_config() -> MatrixConfig<'static, Pin, u8, ROWS, COLS> {
    MatrixConfig {
        strobes: STROBES,
        senses: SENSES,
        pin_mode: PinMode::Pullup,
        polarity: Polarity::ActiveLow,
        threshold: 0xFF,
        timing: ScanTiming {
            // ~5us for the sense lines to settle
            strobe_delay_us: 5,
            ..ScanTiming::default()
        },
        ghost: GhostMode::Disabled,
        scan_codes: ScanCodeMap::table(&SCAN_CODES, MAX_SCAN_CODE),
        activity: ActivityConfig::default(),
    }
}
