//! Pulse width codec.
//!
//! A narrow counter cannot time a 1–5 ms pulse in one go, so every duration is
//! stored as a [`PulseTiming`]: a number of whole counter periods
//! (`coarse`) plus the value to load into the counter at the start of the last
//! period (`fine`). With `P` ticks per period the pin then stays high for
//! exactly `coarse * P + (P - fine)` ticks.
//!
//! ```rust
//! use servo_mux::MuxConfig;
//!
//! let config = MuxConfig::DEFAULT;
//! // 1000 µs - 8 µs overhead = 992 µs = 1984 ticks = 7 * 256 + (256 - 64)
//! let timing = config.encode(1_000);
//! assert_eq!((timing.coarse(), timing.fine()), (7, 64));
//! assert_eq!(config.decode(timing), 1_000);
//! ```

use crate::config::{MuxConfig, div_or_zero, saturate_u16};

/// One channel's timing: whole counter periods plus the final counter reload.
///
/// The two halves are always produced together by [`MuxConfig::encode`] or
/// [`MuxConfig::encode_ticks`] and stored as one value, so a reader never sees
/// a coarse count from one width paired with a remainder from another.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseTiming {
    coarse: u16,
    fine: u16,
}

impl PulseTiming {
    pub(crate) const ZERO: Self = Self { coarse: 0, fine: 0 };

    /// Whole counter periods the pulse spans before the final reload.
    #[must_use]
    pub const fn coarse(self) -> u16 {
        self.coarse
    }

    /// Counter value loaded at the start of the final period.
    #[must_use]
    pub const fn fine(self) -> u16 {
        self.fine
    }
}

impl MuxConfig {
    /// Encode a pulse width (µs) for the scheduler.
    ///
    /// The width is clamped to `[min_pw, max_pw]` and reduced by the overhead
    /// compensation first; out-of-range input saturates.
    #[must_use]
    pub const fn encode(&self, pulse_width_us: u16) -> PulseTiming {
        self.encode_ticks(self.pulse_ticks(pulse_width_us))
    }

    /// Recover the pulse width (µs) an [`encode`](Self::encode) call stored.
    #[must_use]
    pub const fn decode(&self, timing: PulseTiming) -> u16 {
        let us = div_or_zero(self.decode_ticks(timing), self.ticks_per_us() as u32);
        saturate_u16(us.saturating_add(self.overhead_us() as u32))
    }

    /// Encode a raw tick count.
    ///
    /// Counts that do not outlast one full period are raised to one period plus
    /// one tick, the shortest duration the overflow scheme can time.
    #[must_use]
    pub const fn encode_ticks(&self, ticks: u32) -> PulseTiming {
        let period = self.period_ticks();
        let ticks = if ticks > period { ticks } else { period.saturating_add(1) };
        let coarse = div_or_zero(ticks.saturating_sub(1), period);
        let tail = ticks.saturating_sub(coarse.saturating_mul(period)); // 1..=period
        PulseTiming {
            coarse: saturate_u16(coarse),
            fine: saturate_u16(period.saturating_sub(tail)),
        }
    }

    /// Ticks a timing keeps the scheduler in its slot.
    #[must_use]
    pub const fn decode_ticks(&self, timing: PulseTiming) -> u32 {
        let period = self.period_ticks();
        (timing.coarse as u32)
            .saturating_mul(period)
            .saturating_add(period.saturating_sub(timing.fine as u32))
    }

    /// Map a position in `[min_pos, max_pos]` linearly onto `[min_pw, max_pw]`.
    ///
    /// Positions outside the range are clamped to it first. An empty position
    /// range maps everything to `min_pw`; an inverted pulse range yields
    /// `min_pw` rather than wrapping.
    #[must_use]
    pub const fn map_position(&self, position: u16) -> u16 {
        let position = if position < self.min_pos() {
            self.min_pos()
        } else if position > self.max_pos() {
            self.max_pos()
        } else {
            position
        };
        let span_pw = self.max_pw().saturating_sub(self.min_pw()) as u32;
        let span_pos = self.max_pos().saturating_sub(self.min_pos()) as u32;
        let steps = position.saturating_sub(self.min_pos()) as u32;
        let offset = div_or_zero(steps.saturating_mul(span_pw), span_pos);
        // offset <= span_pw, so the sum stays within max_pw
        self.min_pw().saturating_add(saturate_u16(offset))
    }

    /// Interpret a `write` value: a position when it lies inside
    /// `[min_pos, max_pos]`, otherwise a pulse width in µs.
    #[must_use]
    pub const fn resolve(&self, value: u16) -> u16 {
        if value >= self.min_pos() && value <= self.max_pos() {
            self.map_position(value)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_width_splits_into_periods_and_reload() {
        let config = MuxConfig::DEFAULT;
        // 5492 µs = 10984 ticks = 42 * 256 + (256 - 24)
        let timing = config.encode(5_500);
        assert_eq!((timing.coarse(), timing.fine()), (42, 24));
    }

    #[test]
    fn exact_multiple_of_a_period_uses_full_final_period() {
        let config = MuxConfig::DEFAULT;
        let timing = config.encode_ticks(8 * 256);
        assert_eq!((timing.coarse(), timing.fine()), (7, 0));
        assert_eq!(config.decode_ticks(timing), 8 * 256);
    }

    #[test]
    fn short_tick_counts_are_raised_to_the_minimum() {
        let config = MuxConfig::DEFAULT;
        let shortest = config.encode_ticks(config.min_sync_ticks());
        assert_eq!(config.encode_ticks(0), shortest);
        assert_eq!(config.encode_ticks(256), shortest);
        assert_eq!((shortest.coarse(), shortest.fine()), (1, 255));
    }
}
