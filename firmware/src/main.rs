//! ErgoDox matrix scanner firmware for ATmega32U4 (Teensy 2.0).
//!
//! Scans the Teensy half of the matrix with the `matrix-scan` engine:
//! - One strobe per main loop pass, settle delay via a NOP busy-wait
//! - Millisecond clock from a Timer0 compare interrupt
//! - Events queued per cycle and drained by the main loop
//! - On-board LED (PD6) lit while any key is held

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod delay;
mod gpio;
mod layout;

use core::cell::Cell;

use avr_device::atmega32u4::Peripherals;
use avr_device::interrupt::Mutex;
use matrix_scan::{ActivityKind, Event, EventQueue, Gpio, Level, Matrix};

use delay::BusyDelay;
use gpio::{AvrGpio, LED};

/// One full cycle of key events plus an activity event.
const QUEUE_LEN: usize = layout::ROWS * layout::COLS + 1;

static MILLIS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[avr_device::interrupt(atmega32u4)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let millis = MILLIS.borrow(cs);
        millis.set(millis.get().wrapping_add(1));
    });
}

/// Milliseconds since boot. A 32-bit read is four loads on AVR, so it
/// must not race the timer interrupt.
fn millis() -> u32 {
    avr_device::interrupt::free(|cs| MILLIS.borrow(cs).get())
}

/// Timer0 in CTC mode: 16MHz / 64 / 250 = 1kHz.
fn init_clock(dp: &Peripherals) {
    let tc0 = &dp.TC0;
    tc0.tccr0a.write(|w| w.wgm0().ctc());
    tc0.ocr0a.write(|w| unsafe { w.bits(249) });
    tc0.tccr0b.write(|w| w.cs0().prescale_64());
    tc0.timsk0.write(|w| w.ocie0a().set_bit());
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler (CLKPR)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) }); // Prescaler = 1

    init_clock(&dp);
    unsafe { avr_device::interrupt::enable() };

    let mut gpio = AvrGpio::new(dp.PORTB, dp.PORTD, dp.PORTF);
    // LED stays lit if the matrix cannot be set up.
    gpio.drive(LED, Level::High);

    let Ok(mut matrix) = Matrix::new(gpio, BusyDelay, layout::matrix_config()) else {
        loop {}
    };
    matrix.gpio_mut().drive(LED, Level::Low);

    let mut queue: EventQueue<QUEUE_LEN> = EventQueue::new();

    loop {
        if !matrix.scan_step(&millis, &mut queue) {
            continue;
        }

        let mut any_held = false;
        for event in queue.drain() {
            match event {
                Event::Key { state, .. } => any_held |= state.is_on(),
                Event::Activity(ActivityKind::Inactive) => any_held = false,
                Event::Activity(ActivityKind::Active) => {}
            }
        }

        let level = if any_held { Level::High } else { Level::Low };
        matrix.gpio_mut().drive(LED, level);
    }
}
