use embedded_hal::delay::DelayNs;

/// Busy-wait delay for the strobe settle time (approximate, at 16MHz).
pub struct BusyDelay;

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        // ~4 cycles per iteration, 250ns at 16MHz
        for _ in 0..ns.div_ceil(250) {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
