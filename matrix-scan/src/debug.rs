//! Diagnostics, debug output modes and the state table dump.

use core::fmt;

use crate::counter::Counter;
use crate::debounce::KeyState;
use crate::remap::ScanCodeMap;

/// What the scanner logs about key state changes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebugMode {
    #[default]
    Off,
    /// Scan code of every Press.
    Presses,
    /// Scan code and new state on every change.
    Transitions,
    /// Code, previous/current state, both counters and time since the
    /// last committed transition on every change.
    Verbose,
}

/// Counters for conditions that are reported but never stop scanning.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Completed scan cycles.
    pub cycles: u32,
    /// Times a key was found `Invalid` where a decided state was expected.
    pub invalid_states: u32,
    /// Events not emitted because the position has no valid scan code.
    pub unmapped_events: u32,
}

/// Static facts about the configured matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixInfo {
    pub rows: usize,
    pub columns: usize,
    pub max_keys: usize,
}

impl fmt::Display for MatrixInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Columns:  {}", self.columns)?;
        writeln!(f, "Rows:     {}", self.rows)?;
        write!(f, "Max Keys: {}", self.max_keys)
    }
}

/// Keys printed per line of the state table.
const KEYS_PER_LINE: usize = 4;

/// Every key's previous/current state and counters.
///
/// Keys are labelled with their scan code; positions without one are
/// left out.
pub struct StateTable<'m, C, const ROWS: usize, const COLS: usize> {
    pub(crate) keys: &'m [[KeyState<C>; COLS]; ROWS],
    pub(crate) scan_codes: ScanCodeMap<'m>,
}

impl<C: Counter, const ROWS: usize, const COLS: usize> fmt::Display for StateTable<'_, C, ROWS, COLS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<key>:<previous state><current state> <active count> <inactive count>")?;
        let width = C::HEX_WIDTH;
        let mut printed = 0;
        for (index, key) in self.keys.iter().flatten().enumerate() {
            let Some(code) = self.scan_codes.remap(index) else {
                continue;
            };
            if printed % KEYS_PER_LINE == 0 {
                writeln!(f)?;
            }
            printed += 1;
            write!(
                f,
                "0x{:02x}:{}{} 0x{:0width$x} 0x{:0width$x} ",
                code,
                key.prev_state().glyph(),
                key.cur_state().glyph(),
                key.active_count(),
                key.inactive_count(),
            )?;
        }
        Ok(())
    }
}
