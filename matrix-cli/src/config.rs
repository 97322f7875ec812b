use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use matrix_scan::{
    ActivityConfig, GhostMode, MatrixConfig, MatrixInfo, PinMode, Polarity, ScanCode,
    ScanCodeMap, ScanTiming, NO_KEY,
};
use serde::Deserialize;

use crate::sim::Pin;

/// Engine dimensions. Any described matrix up to this size is scanned by
/// an engine of exactly this shape; the extra positions have no scan code.
pub const MAX_ROWS: usize = 8;
pub const MAX_COLS: usize = 16;

/// How the switches are wired.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Wiring {
    /// One diode per switch: active-high strobes, pull-down senses.
    #[default]
    Diodes,
    /// No diodes: active-low strobes, pull-up senses, ghost masking.
    Diodeless,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingFile {
    pub debounce_ms: u8,
    pub strobe_delay_us: u8,
    pub strobes_per_step: u8,
    pub drain_senses: bool,
}

impl Default for TimingFile {
    fn default() -> Self {
        let t = ScanTiming::default();
        Self {
            debounce_ms: t.debounce_ms,
            strobe_delay_us: t.strobe_delay_us,
            strobes_per_step: t.strobes_per_step,
            drain_senses: t.drain_senses,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivityFile {
    pub tick_ms: u32,
    pub max_ticks: u16,
    pub active_ticks: u16,
    pub inactive_ticks: u16,
}

impl Default for ActivityFile {
    fn default() -> Self {
        let a = ActivityConfig::default();
        Self {
            tick_ms: a.tick_ms,
            max_ticks: a.max_ticks,
            active_ticks: a.active_ticks,
            inactive_ticks: a.inactive_ticks,
        }
    }
}

/// JSON description of a matrix.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixFile {
    pub rows: usize,
    pub cols: usize,
    #[serde(default = "default_threshold")]
    pub threshold: u16,
    #[serde(default)]
    pub wiring: Wiring,
    #[serde(default)]
    pub timing: TimingFile,
    #[serde(default = "default_max_scan_code")]
    pub max_scan_code: ScanCode,
    /// Row-major codes for the described matrix; linear when absent.
    #[serde(default)]
    pub scan_codes: Option<Vec<ScanCode>>,
    #[serde(default)]
    pub activity: ActivityFile,
}

fn default_threshold() -> u16 {
    0xFF
}

fn default_max_scan_code() -> ScanCode {
    0xFF
}

pub fn load(path: &Path) -> Result<MatrixFile> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(&text).with_context(|| format!("loading {}", path.display()))
}

pub fn parse(text: &str) -> Result<MatrixFile> {
    let file: MatrixFile = serde_json::from_str(text).context("parsing matrix description")?;

    if !(1..=MAX_ROWS).contains(&file.rows) {
        bail!("rows must be between 1 and {}, got {}", MAX_ROWS, file.rows);
    }
    if !(1..=MAX_COLS).contains(&file.cols) {
        bail!("cols must be between 1 and {}, got {}", MAX_COLS, file.cols);
    }
    if let Some(codes) = &file.scan_codes {
        let keys = file.rows * file.cols;
        if codes.len() != keys {
            bail!(
                "scan_codes has {} entries, expected {} ({}x{})",
                codes.len(),
                keys,
                file.rows,
                file.cols
            );
        }
    }
    Ok(file)
}

impl MatrixFile {
    pub fn info(&self) -> MatrixInfo {
        MatrixInfo {
            rows: self.rows,
            columns: self.cols,
            max_keys: self.rows * self.cols,
        }
    }

    /// Scan codes indexed by engine position. Positions outside the
    /// described matrix get `NO_KEY`.
    pub fn code_table(&self) -> Vec<ScanCode> {
        let mut table = vec![NO_KEY; MAX_ROWS * MAX_COLS];
        for row in 0..self.rows {
            for col in 0..self.cols {
                let key = row * self.cols + col;
                table[row * MAX_COLS + col] = match &self.scan_codes {
                    Some(codes) => codes[key],
                    None => (key + 1) as ScanCode,
                };
            }
        }
        table
    }

    pub fn matrix_config<'a>(
        &self,
        table: &'a [ScanCode],
    ) -> MatrixConfig<'a, Pin, u16, MAX_ROWS, MAX_COLS> {
        let (pin_mode, polarity, ghost) = match self.wiring {
            Wiring::Diodes => (PinMode::Pulldown, Polarity::ActiveHigh, GhostMode::Disabled),
            Wiring::Diodeless => (PinMode::Pullup, Polarity::ActiveLow, GhostMode::Diodeless),
        };
        MatrixConfig {
            strobes: core::array::from_fn(Pin::Strobe),
            senses: core::array::from_fn(Pin::Sense),
            pin_mode,
            polarity,
            threshold: self.threshold,
            timing: ScanTiming {
                debounce_ms: self.timing.debounce_ms,
                strobe_delay_us: self.timing.strobe_delay_us,
                strobes_per_step: self.timing.strobes_per_step,
                drain_senses: self.timing.drain_senses,
            },
            ghost,
            scan_codes: ScanCodeMap::table(table, self.max_scan_code),
            activity: ActivityConfig {
                tick_ms: self.activity.tick_ms,
                max_ticks: self.activity.max_ticks,
                active_ticks: self.activity.active_ticks,
                inactive_ticks: self.activity.inactive_ticks,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let file = parse(r#"{ "rows": 4, "cols": 6 }"#).unwrap();
        assert_eq!(file.threshold, 0xFF);
        assert_eq!(file.wiring, Wiring::Diodes);
        assert_eq!(file.timing.debounce_ms, 5);
        assert_eq!(file.timing.strobes_per_step, 1);
        assert_eq!(file.info().max_keys, 24);
    }

    #[test]
    fn test_parse_full() {
        let file = parse(
            r#"{
                "rows": 2, "cols": 2, "threshold": 16, "wiring": "diodeless",
                "timing": { "debounce_ms": 8, "drain_senses": true },
                "max_scan_code": 64,
                "scan_codes": [10, 11, 0, 13],
                "activity": { "tick_ms": 10, "inactive_ticks": 50 }
            }"#,
        )
        .unwrap();
        assert_eq!(file.wiring, Wiring::Diodeless);
        assert_eq!(file.timing.debounce_ms, 8);
        assert!(file.timing.drain_senses);
        assert_eq!(file.activity.tick_ms, 10);
        assert_eq!(file.activity.max_ticks, 600);
    }

    #[test]
    fn test_rejects_oversized_matrix() {
        let err = parse(r#"{ "rows": 9, "cols": 4 }"#).unwrap_err();
        assert!(err.to_string().contains("rows"));
        assert!(parse(r#"{ "rows": 4, "cols": 0 }"#).is_err());
    }

    #[test]
    fn test_rejects_wrong_table_length() {
        let err = parse(r#"{ "rows": 2, "cols": 2, "scan_codes": [1, 2, 3] }"#).unwrap_err();
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(parse(r#"{ "rows": 2, "cols": 2, "colums": 3 }"#).is_err());
    }

    #[test]
    fn test_code_table_places_keys() {
        let file = parse(r#"{ "rows": 2, "cols": 3 }"#).unwrap();
        let table = file.code_table();
        assert_eq!(table.len(), MAX_ROWS * MAX_COLS);
        assert_eq!(&table[..4], &[1, 2, 3, NO_KEY]);
        assert_eq!(&table[MAX_COLS..MAX_COLS + 4], &[4, 5, 6, NO_KEY]);
        assert!(table[2 * MAX_COLS..].iter().all(|&c| c == NO_KEY));
    }

    #[test]
    fn test_code_table_uses_explicit_codes() {
        let file = parse(r#"{ "rows": 1, "cols": 2, "scan_codes": [7, 9] }"#).unwrap();
        let table = file.code_table();
        let config = file.matrix_config(&table);
        assert_eq!(config.scan_codes.remap(0), Some(7));
        assert_eq!(config.scan_codes.remap(1), Some(9));
        assert_eq!(config.scan_codes.remap(2), None);
        assert_eq!(config.validate(), Ok(()));
    }
}
