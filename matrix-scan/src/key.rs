//! Logical key states and the identifiers they travel with.

/// Logical identifier for a key, independent of its matrix position.
pub type ScanCode = u16;

/// Millisecond timestamp read from the system clock.
///
/// The clock wraps after ~49 days; all elapsed-time arithmetic uses
/// `wrapping_sub` so the wrap is harmless.
pub type Timestamp = u32;

/// Debounced state of a single key for one scan cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum KeyPosition {
    /// Key is up and was up last cycle.
    #[default]
    Off = 0,
    /// Key went down this cycle.
    Press = 1,
    /// Key is down and was down last cycle.
    Hold = 2,
    /// Key went up this cycle.
    Release = 3,
    /// No decision yet this cycle. Never reported to a sink.
    Invalid = 4,
}

impl KeyPosition {
    /// Whether the key counts as down (Press or Hold).
    pub fn is_on(self) -> bool {
        matches!(self, KeyPosition::Press | KeyPosition::Hold)
    }

    /// Derive the reported position from whether the key was down in the
    /// previous and the current cycle.
    pub fn from_edges(was_on: bool, is_on: bool) -> Self {
        match (was_on, is_on) {
            (false, false) => KeyPosition::Off,
            (false, true) => KeyPosition::Press,
            (true, true) => KeyPosition::Hold,
            (true, false) => KeyPosition::Release,
        }
    }

    /// Single letter used in state tables and debug output.
    pub fn glyph(self) -> char {
        match self {
            KeyPosition::Off => 'O',
            KeyPosition::Press => 'P',
            KeyPosition::Hold => 'H',
            KeyPosition::Release => 'R',
            KeyPosition::Invalid => 'I',
        }
    }
}

impl core::fmt::Display for KeyPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            KeyPosition::Off => "Off",
            KeyPosition::Press => "Press",
            KeyPosition::Hold => "Hold",
            KeyPosition::Release => "Release",
            KeyPosition::Invalid => "Invalid",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        assert_eq!(KeyPosition::from_edges(false, false), KeyPosition::Off);
        assert_eq!(KeyPosition::from_edges(false, true), KeyPosition::Press);
        assert_eq!(KeyPosition::from_edges(true, true), KeyPosition::Hold);
        assert_eq!(KeyPosition::from_edges(true, false), KeyPosition::Release);
    }

    #[test]
    fn test_only_press_and_hold_are_on() {
        assert!(KeyPosition::Press.is_on());
        assert!(KeyPosition::Hold.is_on());
        assert!(!KeyPosition::Off.is_on());
        assert!(!KeyPosition::Release.is_on());
        assert!(!KeyPosition::Invalid.is_on());
    }
}
