//! Matrix pin access over the ATmega32U4 port registers.
//!
//! Every pin is addressed by port and bit mask. The AVR has no internal
//! pull-downs, so anything but `Pullup` leaves the input floating.

use avr_device::atmega32u4::{PORTB, PORTD, PORTF};
use matrix_scan::{Gpio, Level, PinMode};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Port {
    B,
    D,
    F,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    port: Port,
    mask: u8,
}

impl Pin {
    pub const fn new(port: Port, bit: u8) -> Self {
        Self {
            port,
            mask: 1 << bit,
        }
    }
}

/// Teensy 2.0 on-board LED.
pub const LED: Pin = Pin::new(Port::D, 6);

pub struct AvrGpio {
    portb: PORTB,
    portd: PORTD,
    portf: PORTF,
}

#[inline(always)]
fn with_bit(bits: u8, mask: u8, set: bool) -> u8 {
    if set {
        bits | mask
    } else {
        bits & !mask
    }
}

impl AvrGpio {
    pub fn new(portb: PORTB, portd: PORTD, portf: PORTF) -> Self {
        Self { portb, portd, portf }
    }

    /// DDR bit: output when set.
    fn set_output(&self, pin: Pin, output: bool) {
        let m = pin.mask;
        match pin.port {
            Port::B => self
                .portb
                .ddrb
                .modify(|r, w| unsafe { w.bits(with_bit(r.bits(), m, output)) }),
            Port::D => self
                .portd
                .ddrd
                .modify(|r, w| unsafe { w.bits(with_bit(r.bits(), m, output)) }),
            Port::F => self
                .portf
                .ddrf
                .modify(|r, w| unsafe { w.bits(with_bit(r.bits(), m, output)) }),
        }
    }

    /// PORT bit: output level, or pull-up enable for an input.
    fn set_port(&self, pin: Pin, high: bool) {
        let m = pin.mask;
        match pin.port {
            Port::B => self
                .portb
                .portb
                .modify(|r, w| unsafe { w.bits(with_bit(r.bits(), m, high)) }),
            Port::D => self
                .portd
                .portd
                .modify(|r, w| unsafe { w.bits(with_bit(r.bits(), m, high)) }),
            Port::F => self
                .portf
                .portf
                .modify(|r, w| unsafe { w.bits(with_bit(r.bits(), m, high)) }),
        }
    }
}

impl Gpio for AvrGpio {
    type Pin = Pin;

    fn configure(&mut self, pin: Pin, mode: PinMode) {
        self.set_output(pin, false);
        self.set_port(pin, mode == PinMode::Pullup);
    }

    fn drive(&mut self, pin: Pin, level: Level) {
        self.set_port(pin, level.is_high());
        self.set_output(pin, true);
    }

    fn read(&mut self, pin: Pin) -> bool {
        let bits = match pin.port {
            Port::B => self.portb.pinb.read().bits(),
            Port::D => self.portd.pind.read().bits(),
            Port::F => self.portf.pinf.read().bits(),
        };
        bits & pin.mask != 0
    }
}
