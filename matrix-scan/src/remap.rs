//! Translation from matrix position to scan code.
//!
//! Every lookup is bounds checked: a position with no physical key, an
//! index past the end of the table, or a code above the configured maximum
//! all come back as `None`, and the caller must not emit anything for it.

use crate::key::ScanCode;

/// Table entry marking a matrix position with no key behind it.
pub const NO_KEY: ScanCode = 0;

#[derive(Copy, Clone, Debug)]
pub struct ScanCodeMap<'a> {
    table: Option<&'a [ScanCode]>,
    max_scan_code: ScanCode,
}

impl<'a> ScanCodeMap<'a> {
    /// 1-indexed linear codes: `row * cols + col + 1`.
    pub const fn linear(max_scan_code: ScanCode) -> Self {
        Self { table: None, max_scan_code }
    }

    /// Codes looked up from a table indexed by linear position.
    pub const fn table(table: &'a [ScanCode], max_scan_code: ScanCode) -> Self {
        Self { table: Some(table), max_scan_code }
    }

    pub fn max_scan_code(&self) -> ScanCode {
        self.max_scan_code
    }

    pub fn remap(&self, linear_index: usize) -> Option<ScanCode> {
        let code = match self.table {
            Some(table) => *table.get(linear_index)?,
            None => ScanCode::try_from(linear_index.checked_add(1)?).ok()?,
        };
        if code == NO_KEY || code > self.max_scan_code {
            return None;
        }
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_one_indexed() {
        let map = ScanCodeMap::linear(16);
        assert_eq!(map.remap(0), Some(1));
        assert_eq!(map.remap(15), Some(16));
        assert_eq!(map.remap(16), None);
    }

    #[test]
    fn test_linear_never_overflows() {
        let map = ScanCodeMap::linear(ScanCode::MAX);
        assert_eq!(map.remap(usize::from(u16::MAX) - 1), Some(u16::MAX));
        assert_eq!(map.remap(usize::from(u16::MAX)), None);
        assert_eq!(map.remap(usize::MAX), None);
    }

    #[test]
    fn test_table_skips_unused_and_out_of_range() {
        const TABLE: [ScanCode; 4] = [0x10, NO_KEY, 0x200, 0x11];
        let map = ScanCodeMap::table(&TABLE, 0xFF);
        assert_eq!(map.remap(0), Some(0x10));
        assert_eq!(map.remap(1), None);
        // Codomain wider than the configured maximum.
        assert_eq!(map.remap(2), None);
        assert_eq!(map.remap(3), Some(0x11));
        assert_eq!(map.remap(4), None);
    }
}
