//! The hardware timer the scheduler runs on.

/// A free-running counter with an overflow interrupt.
///
/// Implement this over the HAL's timer peripheral and hand it to
/// [`ServoMux::set_timer`](crate::ServoMux::set_timer). The prescaler must give
/// [`MuxConfig::ticks_per_us`](crate::MuxConfig::ticks_per_us) counter ticks
/// per microsecond, and the counter must wrap after
/// [`MuxConfig::period_ticks`](crate::MuxConfig::period_ticks) ticks.
///
/// Every method is called with the multiplexer's critical section held,
/// including from the overflow interrupt, so implementations must not block.
pub trait FrameTimer {
    /// Program the prescaler, zero the counter and clear any pending overflow.
    fn start(&mut self);

    /// Load the live counter register. The next overflow fires after
    /// `period_ticks - value` ticks.
    fn set_counter(&mut self, value: u16);

    /// Unmask the overflow interrupt.
    fn enable_overflow_interrupt(&mut self);

    /// Mask the overflow interrupt. The counter may keep running.
    fn disable_overflow_interrupt(&mut self);
}
