//! Keyboard matrix scanning and per-key debouncing.
//!
//! The scanner strobes one column at a time, samples the sense rows,
//! debounces every key with a pair of saturating counters and reports one
//! state per key per scan cycle to an [`EventSink`]. It is `no_std` and
//! allocation free; all board access goes through the traits in [`gpio`].
//!
//! ```ignore
//! let mut matrix = Matrix::new(gpio, delay, CONFIG)?;
//! loop {
//!     if matrix.scan_step(&clock, &mut queue) {
//!         for event in queue.drain() { /* macro engine */ }
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod activity;
pub mod config;
pub mod counter;
pub mod debounce;
pub mod debug;
pub mod ghost;
pub mod gpio;
pub mod key;
pub mod matrix;
pub mod remap;
pub mod sink;

pub use activity::{ActivityConfig, ActivityKind};
pub use config::{ConfigError, GhostMode, MatrixConfig, ScanTiming};
pub use counter::Counter;
pub use debounce::{Decision, KeyState, Outcome};
pub use debug::{DebugMode, Diagnostics, MatrixInfo};
pub use gpio::{Clock, Gpio, Latency, Level, NoLatency, PinMode, Polarity};
pub use key::{KeyPosition, ScanCode, Timestamp};
pub use matrix::Matrix;
pub use remap::{ScanCodeMap, NO_KEY};
pub use sink::{Event, EventQueue, EventSink};
