//! Strobe scheduler and scan cycle driver.
//!
//! Each `scan_step` call strobes one column (or a small batch), samples
//! every sense line for it and feeds the samples to the per-key debouncer.
//! A full cycle is complete once the last column has been strobed; the
//! call that finishes it returns `true` so the main loop can move on to
//! macro processing. Scanning one column per call keeps the time spent in
//! here short enough for the other cooperative tasks (USB, LEDs, CLI).
//!
//! Strobes are columns and senses are rows:
//!
//! ```text
//!            strobe 0  strobe 1  strobe 2
//!   sense 0    k0        k1        k2
//!   sense 1    k3        k4        k5
//! ```
//!
//! Linear key index is `row * COLS + col`.

use embedded_hal::delay::DelayNs;

use crate::activity::ActivityTracker;
use crate::config::{ConfigError, GhostMode, MatrixConfig, ScanTiming};
use crate::counter::Counter;
use crate::debounce::{KeyState, Outcome};
use crate::debug::{DebugMode, Diagnostics, MatrixInfo, StateTable};
use crate::ghost::GhostCanceller;
use crate::gpio::{Clock, Gpio, Latency, NoLatency, PinMode};
use crate::key::{KeyPosition, Timestamp};
use crate::sink::EventSink;

/// Per-cycle counts of emitted states, fed to the activity tracker.
#[derive(Copy, Clone, Debug, Default)]
struct CycleTally {
    presses: usize,
    releases: usize,
    active: usize,
}

impl CycleTally {
    fn count(&mut self, position: KeyPosition) {
        match position {
            KeyPosition::Press => self.presses += 1,
            KeyPosition::Release => self.releases += 1,
            _ => {}
        }
        if position != KeyPosition::Off {
            self.active += 1;
        }
    }
}

/// Matrix scan and debounce engine. Owns every per-key record.
pub struct Matrix<'a, G: Gpio, D, C, const ROWS: usize, const COLS: usize, L> {
    gpio: G,
    delay: D,
    latency: L,
    config: MatrixConfig<'a, G::Pin, C, ROWS, COLS>,
    keys: [[KeyState<C>; COLS]; ROWS],
    ghost: Option<GhostCanceller<ROWS, COLS>>,
    activity: ActivityTracker,
    cursor: usize,
    tally: CycleTally,
    debug_mode: DebugMode,
    diagnostics: Diagnostics,
}

impl<'a, G, D, C, const ROWS: usize, const COLS: usize> Matrix<'a, G, D, C, ROWS, COLS, NoLatency>
where
    G: Gpio,
    D: DelayNs,
    C: Counter,
{
    /// Validate the configuration, set up every strobe and sense pin and
    /// put all keys in the Off steady state.
    pub fn new(
        gpio: G,
        delay: D,
        config: MatrixConfig<'a, G::Pin, C, ROWS, COLS>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut matrix = Self {
            gpio,
            delay,
            latency: NoLatency,
            keys: [[KeyState::new(config.threshold); COLS]; ROWS],
            ghost: match config.ghost {
                GhostMode::Disabled => None,
                GhostMode::Diodeless => Some(GhostCanceller::new()),
            },
            activity: ActivityTracker::new(config.activity),
            config,
            cursor: 0,
            tally: CycleTally::default(),
            debug_mode: DebugMode::Off,
            diagnostics: Diagnostics::default(),
        };
        matrix.setup_pins();
        Ok(matrix)
    }
}

impl<'a, G, D, C, const ROWS: usize, const COLS: usize, L> Matrix<'a, G, D, C, ROWS, COLS, L>
where
    G: Gpio,
    D: DelayNs,
    C: Counter,
    L: Latency,
{
    /// Attach latency instrumentation around each full cycle.
    pub fn with_latency<L2: Latency>(self, latency: L2) -> Matrix<'a, G, D, C, ROWS, COLS, L2> {
        Matrix {
            gpio: self.gpio,
            delay: self.delay,
            latency,
            config: self.config,
            keys: self.keys,
            ghost: self.ghost,
            activity: self.activity,
            cursor: self.cursor,
            tally: self.tally,
            debug_mode: self.debug_mode,
            diagnostics: self.diagnostics,
        }
    }

    /// Sense lines get the configured pull; with an open-drain matrix the
    /// pull is external.
    fn sense_mode(&self) -> PinMode {
        match self.config.pin_mode {
            PinMode::Opendrain => PinMode::None,
            mode => mode,
        }
    }

    fn diodeless(&self) -> bool {
        self.config.ghost == GhostMode::Diodeless
    }

    fn setup_pins(&mut self) {
        let inactive = self.config.polarity.inactive();
        let diodeless = self.diodeless();
        for &pin in &self.config.strobes {
            if diodeless {
                // Idle strobes float so they cannot feed ghost paths.
                self.gpio.configure(pin, PinMode::None);
            } else {
                if self.config.pin_mode == PinMode::Opendrain {
                    self.gpio.configure(pin, PinMode::Opendrain);
                }
                self.gpio.drive(pin, inactive);
            }
        }

        let sense_mode = self.sense_mode();
        for &pin in &self.config.senses {
            self.gpio.configure(pin, sense_mode);
        }
    }

    /// Strobe the next column (or batch of columns).
    ///
    /// Returns `true` when this call completed a full matrix cycle.
    pub fn scan_step<K, S>(&mut self, clock: &K, sink: &mut S) -> bool
    where
        K: Clock + ?Sized,
        S: EventSink + ?Sized,
    {
        let now = clock.now();

        if self.cursor == 0 {
            self.begin_cycle();
        }

        let batch = usize::from(self.config.timing.strobes_per_step.max(1));
        let end = self.cursor.saturating_add(batch).min(COLS);
        for col in self.cursor..end {
            self.scan_column(col, now, sink);
        }
        self.cursor = end;

        if self.cursor < COLS {
            return false;
        }
        self.cursor = 0;
        self.finish_cycle(now, sink);
        true
    }

    /// Run `scan_step` until a cycle completes.
    pub fn scan_cycle<K, S>(&mut self, clock: &K, sink: &mut S)
    where
        K: Clock + ?Sized,
        S: EventSink + ?Sized,
    {
        while !self.scan_step(clock, sink) {}
    }

    fn begin_cycle(&mut self) {
        self.latency.start();
        self.tally = CycleTally::default();

        for (row, keys) in self.keys.iter_mut().enumerate() {
            for (col, key) in keys.iter_mut().enumerate() {
                if !key.begin_cycle() {
                    self.diagnostics.invalid_states = self.diagnostics.invalid_states.saturating_add(1);
                    log::error!(
                        "matrix scan bug: key never decided last cycle, col {} row {}",
                        col,
                        row
                    );
                }
            }
        }
    }

    fn scan_column<S: EventSink + ?Sized>(&mut self, col: usize, now: Timestamp, sink: &mut S) {
        let polarity = self.config.polarity;
        let timing = self.config.timing;

        if timing.drain_senses {
            let sense_mode = self.sense_mode();
            for &pin in &self.config.senses {
                self.gpio.drive(pin, polarity.inactive());
                self.gpio.configure(pin, sense_mode);
            }
        }

        let strobe = self.config.strobes[col];
        self.gpio.drive(strobe, polarity.active());
        if timing.strobe_delay_us > 0 {
            self.delay.delay_us(u32::from(timing.strobe_delay_us));
        }

        for row in 0..ROWS {
            let raw_active = polarity.is_active(self.gpio.read(self.config.senses[row]));
            let key = &mut self.keys[row][col];
            let prev = key.prev_state();
            let Some(decision) =
                key.update(raw_active, now, self.config.threshold, timing.debounce_ms)
            else {
                continue;
            };

            if decision.outcome == Outcome::Defect {
                self.diagnostics.invalid_states = self.diagnostics.invalid_states.saturating_add(1);
                log::error!(
                    "matrix scan bug: invalid previous state, col {} row {} key {}",
                    col,
                    row,
                    row * COLS + col + 1
                );
            }

            // Diodeless matrices report from the ghost pass instead.
            if self.ghost.is_none() {
                self.emit(row, col, prev, decision.position, sink);
            }
        }

        self.gpio.drive(strobe, polarity.inactive());
        if self.diodeless() {
            self.gpio.configure(strobe, PinMode::None);
        }
    }

    fn finish_cycle<S: EventSink + ?Sized>(&mut self, now: Timestamp, sink: &mut S) {
        if let Some(ghost) = self.ghost.as_mut() {
            let keys = &self.keys;
            ghost.cancel(|row, col| keys[row][col].cur_state());

            for row in 0..ROWS {
                for col in 0..COLS {
                    let (prev, position) = match &self.ghost {
                        Some(ghost) => {
                            let was_on = ghost.state(row, col).prev.is_on();
                            let prev = if was_on { KeyPosition::Hold } else { KeyPosition::Off };
                            (prev, ghost.reported(row, col))
                        }
                        None => continue,
                    };
                    self.emit(row, col, prev, position, sink);
                }
            }
        }

        let tally = self.tally;
        if let Some(kind) =
            self.activity
                .on_cycle_complete(tally.presses, tally.releases, tally.active, now)
        {
            log::debug!("activity tick: {:?}", kind);
            sink.on_activity_tick(kind);
        }

        self.diagnostics.cycles = self.diagnostics.cycles.wrapping_add(1);
        self.latency.end();
    }

    /// Hand one key state to the sink, if the position has a scan code.
    fn emit<S: EventSink + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        prev: KeyPosition,
        position: KeyPosition,
        sink: &mut S,
    ) {
        let index = row * COLS + col;
        let Some(code) = self.config.scan_codes.remap(index) else {
            self.diagnostics.unmapped_events = self.diagnostics.unmapped_events.saturating_add(1);
            log::trace!("no scan code for key index {}, event dropped", index);
            return;
        };

        sink.on_key_state(code, position);
        self.tally.count(position);

        if position == prev {
            return;
        }
        let key = &self.keys[row][col];
        match self.debug_mode {
            DebugMode::Off => {}
            DebugMode::Presses => {
                if position == KeyPosition::Press {
                    log::info!("{}:{:#04x}", code, code);
                }
            }
            DebugMode::Transitions => log::info!("{:#04x}{}", code, position.glyph()),
            DebugMode::Verbose => log::info!(
                "{}:{}{} {:#x} {:#x} {}",
                code,
                prev.glyph(),
                position.glyph(),
                key.active_count(),
                key.inactive_count(),
                key.elapsed(),
            ),
        }
    }

    /// Return every key to the Off steady state and rewind the cursor.
    pub fn reset(&mut self) {
        self.keys = [[KeyState::new(self.config.threshold); COLS]; ROWS];
        if let Some(ghost) = self.ghost.as_mut() {
            ghost.reset();
        }
        self.activity.reset();
        self.cursor = 0;
        self.tally = CycleTally::default();
    }

    pub fn set_debounce_ms(&mut self, ms: u8) {
        self.config.timing.debounce_ms = ms;
    }

    pub fn set_strobe_delay_us(&mut self, us: u8) {
        self.config.timing.strobe_delay_us = us;
    }

    pub fn set_strobes_per_step(&mut self, strobes: u8) {
        self.config.timing.strobes_per_step = strobes.max(1);
    }

    pub fn set_debug_mode(&mut self, mode: DebugMode) {
        self.debug_mode = mode;
    }

    pub fn debug_mode(&self) -> DebugMode {
        self.debug_mode
    }

    pub fn timing(&self) -> &ScanTiming {
        &self.config.timing
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn info(&self) -> MatrixInfo {
        MatrixInfo {
            rows: ROWS,
            columns: COLS,
            max_keys: ROWS * COLS,
        }
    }

    /// Next column to be strobed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn key_state(&self, row: usize, col: usize) -> &KeyState<C> {
        &self.keys[row][col]
    }

    /// Live debounced position, before ghost masking.
    pub fn key_position(&self, row: usize, col: usize) -> KeyPosition {
        self.keys[row][col].cur_state()
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn state_table(&self) -> StateTable<'_, C, ROWS, COLS> {
        StateTable {
            keys: &self.keys,
            scan_codes: self.config.scan_codes,
        }
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::activity::{ActivityConfig, ActivityKind};
    use crate::gpio::{Level, Polarity};
    use crate::key::ScanCode;
    use crate::remap::ScanCodeMap;

    const SENSE: u8 = 0x80;

    /// Diode matrix: a sense reads high when any strobe driven high has a
    /// closed switch on that row.
    #[derive(Default)]
    struct Board {
        pressed: [[bool; 4]; 4],
        level: [Option<Level>; 4],
        drives: usize,
    }

    impl Gpio for Board {
        type Pin = u8;

        fn configure(&mut self, pin: u8, _mode: PinMode) {
            if pin < SENSE {
                self.level[usize::from(pin)] = None;
            }
        }

        fn drive(&mut self, pin: u8, level: Level) {
            self.drives += 1;
            if pin < SENSE {
                self.level[usize::from(pin)] = Some(level);
            }
        }

        fn read(&mut self, pin: u8) -> bool {
            let row = usize::from(pin & !SENSE);
            (0..4).any(|col| self.pressed[row][col] && self.level[col] == Some(Level::High))
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        calls: usize,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, _ns: u32) {
            self.calls += 1;
        }
    }

    #[derive(Default)]
    struct Recorder {
        keys: Vec<(ScanCode, KeyPosition)>,
        activity: Vec<ActivityKind>,
    }

    impl EventSink for Recorder {
        fn on_key_state(&mut self, code: ScanCode, state: KeyPosition) {
            self.keys.push((code, state));
        }

        fn on_activity_tick(&mut self, kind: ActivityKind) {
            self.activity.push(kind);
        }
    }

    fn config() -> MatrixConfig<'static, u8, u8, 4, 4> {
        MatrixConfig {
            strobes: [0, 1, 2, 3],
            senses: [SENSE, SENSE | 1, SENSE | 2, SENSE | 3],
            pin_mode: PinMode::Pulldown,
            polarity: Polarity::ActiveHigh,
            threshold: 16,
            timing: ScanTiming::default(),
            ghost: GhostMode::Disabled,
            scan_codes: ScanCodeMap::linear(0xFF),
            activity: ActivityConfig::default(),
        }
    }

    type TestMatrix = Matrix<'static, Board, CountingDelay, u8, 4, 4, NoLatency>;

    fn matrix() -> TestMatrix {
        Matrix::new(Board::default(), CountingDelay::default(), config()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut cfg = config();
        cfg.threshold = 0;
        let result = Matrix::new(Board::default(), CountingDelay::default(), cfg);
        assert!(matches!(result, Err(ConfigError::ZeroThreshold)));
    }

    #[test]
    fn test_cycle_completes_after_last_strobe() {
        let mut m = matrix();
        let clock = || 0u32;
        let mut sink = Recorder::default();
        assert!(!m.scan_step(&clock, &mut sink));
        assert_eq!(m.cursor(), 1);
        assert!(!m.scan_step(&clock, &mut sink));
        assert!(!m.scan_step(&clock, &mut sink));
        assert!(m.scan_step(&clock, &mut sink));
        assert_eq!(m.cursor(), 0);
        assert_eq!(m.diagnostics().cycles, 1);
    }

    #[test]
    fn test_every_key_reported_each_cycle() {
        let mut m = matrix();
        let mut sink = Recorder::default();
        for now in 0..3u32 {
            m.scan_cycle(&move || now, &mut sink);
        }
        assert_eq!(sink.keys.len(), 3 * 16);
        let mut codes: Vec<_> = sink.keys[..16].iter().map(|&(code, _)| code).collect();
        codes.sort_unstable();
        assert_eq!(codes, (1..=16).collect::<Vec<_>>());
        assert!(sink.keys.iter().all(|&(_, state)| state == KeyPosition::Off));
    }

    #[test]
    fn test_press_reported_after_dwell() {
        let mut m = matrix();
        m.gpio_mut().pressed[1][2] = true;
        let t = Cell::new(0u32);
        let clock = || t.get();
        let mut sink = Recorder::default();

        let mut states = Vec::new();
        for now in 0..8 {
            t.set(now);
            sink.keys.clear();
            m.scan_cycle(&clock, &mut sink);
            let (_, state) = sink.keys.iter().find(|&&(code, _)| code == 7).copied().unwrap();
            states.push(state);
        }
        assert_eq!(states[4], KeyPosition::Off);
        assert_eq!(states[5], KeyPosition::Press);
        assert_eq!(states[6], KeyPosition::Hold);
        assert_eq!(m.key_position(1, 2), KeyPosition::Hold);
        assert_eq!(m.key_state(1, 2).elapsed(), 2);
        assert_eq!(sink.activity, [ActivityKind::Active]);
    }

    #[test]
    fn test_invalid_state_counted_and_scanning_continues() {
        let mut m = matrix();
        let mut sink = Recorder::default();
        m.keys[0][0].corrupt();

        m.scan_cycle(&|| 0u32, &mut sink);
        // Once at roll over, once more at the decision.
        assert_eq!(m.diagnostics().invalid_states, 2);
        assert_eq!(m.diagnostics().cycles, 1);
        assert_eq!(sink.keys.len(), 16);
        assert!(sink.keys.contains(&(1, KeyPosition::Off)));

        m.gpio_mut().pressed[0][0] = true;
        let mut pressed_at = None;
        for now in 1..10u32 {
            sink.keys.clear();
            m.scan_cycle(&move || now, &mut sink);
            if sink.keys.contains(&(1, KeyPosition::Press)) {
                pressed_at = Some(now);
            }
        }
        assert_eq!(pressed_at, Some(5));
        assert_eq!(m.diagnostics().invalid_states, 2);
        assert_eq!(m.diagnostics().cycles, 10);
    }

    #[test]
    fn test_batch_does_not_wrap() {
        let mut m = matrix();
        m.set_strobes_per_step(3);
        let clock = || 0u32;
        let mut sink = Recorder::default();
        assert!(!m.scan_step(&clock, &mut sink));
        assert_eq!(m.cursor(), 3);
        assert!(m.scan_step(&clock, &mut sink));
        assert_eq!(sink.keys.len(), 16);
        // Next call starts a new cycle at column 0.
        assert!(!m.scan_step(&clock, &mut sink));
        assert_eq!(m.cursor(), 3);
    }

    #[test]
    fn test_runtime_setters() {
        let mut m = matrix();
        m.set_strobes_per_step(0);
        assert_eq!(m.timing().strobes_per_step, 1);
        m.set_debounce_ms(10);
        assert_eq!(m.timing().debounce_ms, 10);
        m.set_debug_mode(DebugMode::Verbose);
        assert_eq!(m.debug_mode(), DebugMode::Verbose);
    }

    #[test]
    fn test_strobe_delay_waits_once_per_strobe() {
        let mut m = matrix();
        let mut sink = Recorder::default();
        m.scan_cycle(&|| 0u32, &mut sink);
        assert_eq!(m.delay.calls, 0);

        m.set_strobe_delay_us(2);
        m.scan_cycle(&|| 1u32, &mut sink);
        assert!(m.delay.calls >= 4);
    }

    #[test]
    fn test_drain_drives_every_sense() {
        let mut cfg = config();
        cfg.timing.drain_senses = true;
        let mut m = Matrix::new(Board::default(), CountingDelay::default(), cfg).unwrap();
        let before = m.gpio().drives;
        m.scan_cycle(&|| 0u32, &mut Recorder::default());
        // Per strobe: 4 sense drains, strobe on, strobe off.
        assert_eq!(m.gpio().drives - before, 4 * 6);
    }

    #[test]
    fn test_reset_returns_keys_to_off() {
        let mut m = matrix();
        m.gpio_mut().pressed[0][0] = true;
        let mut sink = Recorder::default();
        for now in 0..10u32 {
            m.scan_cycle(&move || now, &mut sink);
        }
        assert_eq!(m.key_position(0, 0), KeyPosition::Hold);
        m.scan_step(&|| 10u32, &mut sink);
        m.reset();
        assert_eq!(m.cursor(), 0);
        assert_eq!(m.key_position(0, 0), KeyPosition::Off);
        assert_eq!(m.key_state(0, 0).inactive_count(), 16);
    }

    #[test]
    fn test_info() {
        let info = matrix().info();
        assert_eq!((info.rows, info.columns, info.max_keys), (4, 4, 16));
    }
}
