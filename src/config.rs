//! Compile-time configuration for the servo multiplexer.
//!
//! The free constants describe the stock setup (an 8-bit counter ticking every
//! 0.5 µs, eight channels, 20 ms frames). [`MuxConfig::DEFAULT`] gathers them;
//! the `with_*` builders derive other configurations in `const` context.
//!
//! ```rust
//! use servo_mux::MuxConfig;
//!
//! // 1 µs ticks and a conventional 1–2 ms servo range.
//! const CONFIG: MuxConfig = MuxConfig::DEFAULT
//!     .with_ticks_per_us(1)
//!     .with_pulse_range(1_000, 2_000)
//!     .validate();
//!
//! assert_eq!(CONFIG.default_pw(), 1_500);
//! assert_eq!(CONFIG.period_ticks(), 256);
//! ```

/// Pulse width (µs) at [`MIN_POS`].
pub const MIN_PW: u16 = 1_000;

/// Pulse width (µs) at [`MAX_POS`].
pub const MAX_PW: u16 = 5_500;

/// Pulse width (µs) every channel is reset to when the scheduler starts.
pub const DEFAULT_PW: u16 = (MAX_PW - MIN_PW) / 2 + MIN_PW;

/// Smallest position accepted by [`Servo::write`](crate::Servo::write).
pub const MIN_POS: u16 = 0;

/// Largest position accepted by [`Servo::write`](crate::Servo::write). Larger
/// values are taken as pulse widths.
pub const MAX_POS: u16 = 180;

/// Total frame duration (µs).
pub const FRAME_PERIOD_US: u16 = 20_000;

/// Number of servo channels, not counting the frame-sync slot.
pub const MAX_CHANNELS: usize = 8;

/// Time (µs) spent raising and lowering a pin, subtracted from every pulse.
pub const OVERHEAD_US: u16 = 8;

/// Timer ticks per microsecond (2 => 0.5 µs ticks).
pub const TICKS_PER_US: u16 = 2;

/// Width of the hardware counter in bits.
pub const COUNTER_BITS: u8 = 8;

/// Timing parameters shared by the codec and the scheduler.
///
/// Build one in a `const` and finish with [`validate`](Self::validate) so a bad
/// combination fails the build rather than producing garbage pulses.
/// [`ServoMux::new`](crate::ServoMux::new) validates again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MuxConfig {
    min_pw: u16,
    max_pw: u16,
    default_pw: u16,
    min_pos: u16,
    max_pos: u16,
    frame_period_us: u16,
    overhead_us: u16,
    ticks_per_us: u16,
    counter_bits: u8,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl MuxConfig {
    /// The stock configuration built from this module's constants.
    pub const DEFAULT: Self = Self {
        min_pw: MIN_PW,
        max_pw: MAX_PW,
        default_pw: DEFAULT_PW,
        min_pos: MIN_POS,
        max_pos: MAX_POS,
        frame_period_us: FRAME_PERIOD_US,
        overhead_us: OVERHEAD_US,
        ticks_per_us: TICKS_PER_US,
        counter_bits: COUNTER_BITS,
    };

    /// Set the pulse-width range. The default width moves to the new midpoint.
    #[must_use]
    pub const fn with_pulse_range(mut self, min_pw: u16, max_pw: u16) -> Self {
        self.min_pw = min_pw;
        self.max_pw = max_pw;
        self.default_pw = min_pw.saturating_add(max_pw.saturating_sub(min_pw) / 2);
        self
    }

    /// Set the width applied to every channel when the scheduler starts.
    #[must_use]
    pub const fn with_default_pw(mut self, default_pw: u16) -> Self {
        self.default_pw = default_pw;
        self
    }

    /// Set the position range mapped onto the pulse-width range.
    #[must_use]
    pub const fn with_position_range(mut self, min_pos: u16, max_pos: u16) -> Self {
        self.min_pos = min_pos;
        self.max_pos = max_pos;
        self
    }

    /// Set the frame period (µs) every channel is refreshed at.
    #[must_use]
    pub const fn with_frame_period_us(mut self, frame_period_us: u16) -> Self {
        self.frame_period_us = frame_period_us;
        self
    }

    /// Set the time (µs) subtracted from each pulse for pin switching.
    #[must_use]
    pub const fn with_overhead_us(mut self, overhead_us: u16) -> Self {
        self.overhead_us = overhead_us;
        self
    }

    /// Set the timer resolution. Must match the prescaler the
    /// [`FrameTimer`](crate::FrameTimer) programs.
    #[must_use]
    pub const fn with_ticks_per_us(mut self, ticks_per_us: u16) -> Self {
        self.ticks_per_us = ticks_per_us;
        self
    }

    /// Set the hardware counter width; one period is `2^counter_bits` ticks.
    #[must_use]
    pub const fn with_counter_bits(mut self, counter_bits: u8) -> Self {
        self.counter_bits = counter_bits;
        self
    }

    /// Check the configuration, panicking (at compile time in `const` context)
    /// when it cannot be scheduled.
    ///
    /// # Panics
    ///
    /// If the ranges are empty or inverted, the default width is out of range,
    /// the overhead swallows the shortest pulse, the shortest pulse does not
    /// outlast one counter period, or the frame does not fit the counters.
    #[must_use]
    pub const fn validate(self) -> Self {
        assert!(self.min_pw < self.max_pw, "min_pw must be less than max_pw");
        assert!(
            self.min_pw <= self.default_pw && self.default_pw <= self.max_pw,
            "default_pw must lie within [min_pw, max_pw]"
        );
        assert!(self.min_pos < self.max_pos, "min_pos must be less than max_pos");
        assert!(self.overhead_us < self.min_pw, "overhead_us must be less than min_pw");
        assert!(self.ticks_per_us > 0, "ticks_per_us must be positive");
        assert!(
            self.counter_bits > 0 && self.counter_bits <= 16,
            "counter_bits must be within 1..=16"
        );
        // A pulse must span at least one full period plus a partial one, or
        // the final counter reload never happens.
        assert!(
            self.pulse_ticks(self.min_pw) > self.period_ticks(),
            "min_pw must outlast one timer period"
        );
        assert!(
            div_or_zero(self.pulse_ticks(self.max_pw), self.period_ticks()) <= u16::MAX as u32,
            "max_pw needs more periods than the overflow counter holds"
        );
        assert!(
            self.frame_ticks() > self.min_sync_ticks(),
            "frame period must outlast the frame-sync minimum"
        );
        assert!(
            self.frame_budget_periods() <= u16::MAX as u32,
            "frame needs more periods than the overflow counter holds"
        );
        self
    }

    /// Shortest pulse width (µs).
    #[must_use]
    pub const fn min_pw(&self) -> u16 {
        self.min_pw
    }

    /// Longest pulse width (µs).
    #[must_use]
    pub const fn max_pw(&self) -> u16 {
        self.max_pw
    }

    /// Width (µs) every channel starts at.
    #[must_use]
    pub const fn default_pw(&self) -> u16 {
        self.default_pw
    }

    /// Position mapped to `min_pw`.
    #[must_use]
    pub const fn min_pos(&self) -> u16 {
        self.min_pos
    }

    /// Position mapped to `max_pw`.
    #[must_use]
    pub const fn max_pos(&self) -> u16 {
        self.max_pos
    }

    /// Frame period (µs).
    #[must_use]
    pub const fn frame_period_us(&self) -> u16 {
        self.frame_period_us
    }

    /// Pin switching compensation (µs).
    #[must_use]
    pub const fn overhead_us(&self) -> u16 {
        self.overhead_us
    }

    /// Counter ticks per microsecond.
    #[must_use]
    pub const fn ticks_per_us(&self) -> u16 {
        self.ticks_per_us
    }

    /// Counter width in bits.
    #[must_use]
    pub const fn counter_bits(&self) -> u8 {
        self.counter_bits
    }

    /// Ticks in one full counter period (`2^counter_bits`).
    #[must_use]
    pub const fn period_ticks(&self) -> u32 {
        match 1_u32.checked_shl(self.counter_bits as u32) {
            Some(period) => period,
            None => u32::MAX,
        }
    }

    /// Ticks in one frame.
    #[must_use]
    pub const fn frame_ticks(&self) -> u32 {
        (self.frame_period_us as u32).saturating_mul(self.ticks_per_us as u32)
    }

    /// Whole counter periods in one frame.
    #[must_use]
    pub const fn frame_budget_periods(&self) -> u32 {
        div_or_zero(self.frame_ticks(), self.period_ticks())
    }

    /// Shortest frame-sync slot: one full period plus one tick.
    #[must_use]
    pub const fn min_sync_ticks(&self) -> u32 {
        self.period_ticks().saturating_add(1)
    }

    /// True when `channels` servos at `max_pw` still leave room for the
    /// shortest frame-sync slot.
    #[must_use]
    pub const fn frame_fits(&self, channels: usize) -> bool {
        let worst = (self.pulse_ticks(self.max_pw) as u64).saturating_mul(channels as u64);
        worst.saturating_add(self.min_sync_ticks() as u64) <= self.frame_ticks() as u64
    }

    /// Clamp a pulse width into `[min_pw, max_pw]`.
    #[must_use]
    pub const fn clamp_pw(&self, pulse_width_us: u16) -> u16 {
        if pulse_width_us < self.min_pw {
            self.min_pw
        } else if pulse_width_us > self.max_pw {
            self.max_pw
        } else {
            pulse_width_us
        }
    }

    /// Timer ticks the pin stays high for a width, after clamping and overhead
    /// compensation.
    #[must_use]
    pub const fn pulse_ticks(&self, pulse_width_us: u16) -> u32 {
        let adjusted = self.clamp_pw(pulse_width_us).saturating_sub(self.overhead_us);
        (adjusted as u32).saturating_mul(self.ticks_per_us as u32)
    }
}

/// `numerator / denominator`, or `0` for a zero denominator.
pub(crate) const fn div_or_zero(numerator: u32, denominator: u32) -> u32 {
    match numerator.checked_div(denominator) {
        Some(quotient) => quotient,
        None => 0,
    }
}

/// Narrow to `u16`, saturating at `u16::MAX`.
#[allow(clippy::cast_possible_truncation, reason = "checked against u16::MAX first")]
pub(crate) const fn saturate_u16(value: u32) -> u16 {
    if value > u16::MAX as u32 { u16::MAX } else { value as u16 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_constants() {
        let config = MuxConfig::default().validate();
        assert_eq!(config.default_pw(), 3_250);
        assert_eq!(config.period_ticks(), 256);
        assert_eq!(config.frame_ticks(), 40_000);
        assert_eq!(config.frame_budget_periods(), 156);
    }

    #[test]
    fn stock_config_cannot_fit_eight_servos_at_max() {
        assert!(!MuxConfig::DEFAULT.frame_fits(MAX_CHANNELS));
        assert!(MuxConfig::DEFAULT.frame_fits(3));
        assert!(
            MuxConfig::DEFAULT
                .with_pulse_range(1_000, 2_000)
                .frame_fits(MAX_CHANNELS)
        );
    }

    #[test]
    fn pulse_range_moves_default_to_midpoint() {
        let config = MuxConfig::DEFAULT.with_pulse_range(500, 2_500).validate();
        assert_eq!(config.default_pw(), 1_500);
    }

    #[test]
    #[should_panic(expected = "min_pw must be less than max_pw")]
    fn inverted_range_is_rejected() {
        let _ = MuxConfig::DEFAULT.with_pulse_range(2_000, 1_000).validate();
    }

    #[test]
    #[should_panic(expected = "min_pw must outlast one timer period")]
    fn pulse_shorter_than_a_period_is_rejected() {
        // 16-bit counter at 2 ticks/µs: one period is 32 768 µs.
        let _ = MuxConfig::DEFAULT.with_counter_bits(16).validate();
    }
}
