use alloc::boxed::Box;

use log::error;

use xmv_core::XmvError;
use xmv_hal::{Indicator, Platform};

/// Escalation policy: emit the diagnostic, hold the error indicator, halt.
/// Fail-stop — no retry, no partial-success continuation. A transient bus
/// error and a permanent hardware fault get the same treatment.
///
/// Owns the indicator and the platform so the failure signal has exactly
/// one writer.
pub struct FailSafe {
    indicator: Box<dyn Indicator>,
    platform: Box<dyn Platform>,
}

impl FailSafe {
    pub fn new(indicator: Box<dyn Indicator>, platform: Box<dyn Platform>) -> Self {
        Self { indicator, platform }
    }

    /// Never returns. Safe to reach more than once in principle; in
    /// practice the first trip is the last thing that runs.
    pub fn trip(&mut self, fault: XmvError) -> ! {
        error!("FAIL: {} (code 0x{:08X})", fault.label(), fault.code());
        self.indicator.set_error();
        self.platform.halt()
    }

    /// One alive beat for the steady loop.
    pub(crate) fn alive_tick(&mut self, period_ms: u32) {
        self.indicator.toggle_alive();
        self.platform.delay_ms(period_ms);
    }
}
