//! Ghost key masking for diodeless matrices.
//!
//! Without diodes, three closed switches on the corners of a rectangle make
//! the fourth corner read closed as well. The hardware cannot tell that
//! ghost from a real fourth press, so any key on a row or column involved
//! in such a rectangle is frozen at the state it had before the rectangle
//! appeared. A crossing in the previous cycle also freezes, to cover the
//! frames where keys are still settling. Freezing never fabricates a
//! keystroke; the cost is that a real simultaneous fourth press is missed.

use crate::key::KeyPosition;

/// Reported state of one key under ghost masking.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GhostState {
    /// Value reported last cycle.
    pub prev: KeyPosition,
    /// Value reported this cycle.
    pub cur: KeyPosition,
    /// Last live value seen while the key was outside any crossing.
    pub saved: KeyPosition,
}

impl Default for GhostState {
    fn default() -> Self {
        Self {
            prev: KeyPosition::Off,
            cur: KeyPosition::Off,
            saved: KeyPosition::Off,
        }
    }
}

pub struct GhostCanceller<const ROWS: usize, const COLS: usize> {
    keys: [[GhostState; COLS]; ROWS],
    col_use: [u16; COLS],
    row_use: [u16; ROWS],
    col_ghost: [bool; COLS],
    row_ghost: [bool; ROWS],
    col_ghost_old: [bool; COLS],
    row_ghost_old: [bool; ROWS],
}

impl<const ROWS: usize, const COLS: usize> Default for GhostCanceller<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROWS: usize, const COLS: usize> GhostCanceller<ROWS, COLS> {
    pub fn new() -> Self {
        Self {
            keys: [[GhostState::default(); COLS]; ROWS],
            col_use: [0; COLS],
            row_use: [0; ROWS],
            col_ghost: [false; COLS],
            row_ghost: [false; ROWS],
            col_ghost_old: [false; COLS],
            row_ghost_old: [false; ROWS],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Run once per completed cycle over the live debounced states.
    pub fn cancel(&mut self, live: impl Fn(usize, usize) -> KeyPosition) {
        // Keys down per column and per row.
        for col in 0..COLS {
            self.col_use[col] = (0..ROWS).filter(|&row| live(row, col).is_on()).count() as u16;
        }
        for row in 0..ROWS {
            self.row_use[row] = (0..COLS).filter(|&col| live(row, col).is_on()).count() as u16;
        }

        self.col_ghost_old = self.col_ghost;
        self.row_ghost_old = self.row_ghost;
        self.col_ghost = [false; COLS];
        self.row_ghost = [false; ROWS];

        // A down key sharing its column and its row with other down keys
        // is a corner of a rectangle.
        for row in 0..ROWS {
            for col in 0..COLS {
                if live(row, col).is_on() && self.col_use[col] >= 2 && self.row_use[row] >= 2 {
                    self.col_ghost[col] = true;
                    self.row_ghost[row] = true;
                }
            }
        }

        for row in 0..ROWS {
            for col in 0..COLS {
                let crossed = self.is_crossed(row, col);
                let key = &mut self.keys[row][col];
                key.prev = key.cur;
                if !crossed {
                    key.saved = live(row, col);
                }
                key.cur = key.saved;
            }
        }
    }

    /// Whether the key's row or column is crossed now or was last cycle.
    pub fn is_crossed(&self, row: usize, col: usize) -> bool {
        self.col_ghost[col]
            || self.row_ghost[row]
            || self.col_ghost_old[col]
            || self.row_ghost_old[row]
    }

    pub fn state(&self, row: usize, col: usize) -> &GhostState {
        &self.keys[row][col]
    }

    /// The position to report for this cycle, derived from the masked
    /// previous and current values.
    pub fn reported(&self, row: usize, col: usize) -> KeyPosition {
        let key = &self.keys[row][col];
        KeyPosition::from_edges(key.prev.is_on(), key.cur.is_on())
    }
}
