//! The channel table shared by the lifecycle API and the overflow interrupt.
//!
//! Slot 0 is the frame-sync slot: it has timing but never a pin. Servo
//! channels occupy indices `1..=N`.

use core::fmt;

use embedded_hal::digital::OutputPin;

use crate::codec::PulseTiming;

/// Index of a servo channel. `0` is the sentinel handed out once every channel
/// is taken; operations on it do nothing.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    /// The reserved "no channel" index (also the frame-sync slot).
    pub const SENTINEL: Self = Self(0);

    pub(crate) const fn new(index: u8) -> Self {
        Self(index)
    }

    /// The raw index: `1..=N` for a servo channel, `0` for the sentinel.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// True for the "no channel" index.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ChannelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ChannelIndex> for u8 {
    fn from(index: ChannelIndex) -> Self {
        index.0
    }
}

/// One servo slot: an optional output pin, whether it is pulsed, and its timing.
pub(crate) struct Channel<P> {
    pin: Option<P>,
    active: bool,
    timing: PulseTiming,
}

impl<P> Channel<P> {
    const UNBOUND: Self = Self {
        pin: None,
        active: false,
        timing: PulseTiming::ZERO,
    };

    pub(crate) const fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) const fn timing(&self) -> PulseTiming {
        self.timing
    }

    pub(crate) const fn set_timing(&mut self, timing: PulseTiming) {
        self.timing = timing;
    }
}

impl<P: OutputPin> Channel<P> {
    /// Take ownership of `pin`, drive it low and start pulsing it.
    ///
    /// A previously bound pin is driven low and dropped.
    pub(crate) fn bind(&mut self, mut pin: P) {
        self.release();
        pin.set_low().ok();
        self.pin = Some(pin);
        self.active = true;
    }

    /// Drive the pin low and stop pulsing it. The pin stays bound.
    pub(crate) fn release(&mut self) {
        if let Some(pin) = self.pin.as_mut() {
            pin.set_low().ok();
        }
        self.active = false;
    }

    /// Set the pin level if the channel is bound and active.
    ///
    /// Pin errors are dropped: the interrupt has nowhere to report them.
    pub(crate) fn drive(&mut self, high: bool) {
        if !self.active {
            return;
        }
        if let Some(pin) = self.pin.as_mut() {
            if high {
                pin.set_high().ok();
            } else {
                pin.set_low().ok();
            }
        }
    }
}

/// Frame-sync timing plus `N` servo channels.
pub(crate) struct ChannelTable<P, const N: usize> {
    sync: PulseTiming,
    channels: [Channel<P>; N],
}

impl<P, const N: usize> ChannelTable<P, N> {
    /// Every servo channel unbound at `timing`.
    #[allow(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "slot stays below N"
    )]
    pub(crate) const fn new(timing: PulseTiming, sync: PulseTiming) -> Self {
        let mut channels = [const { Channel::<P>::UNBOUND }; N];
        let mut slot = 0;
        while slot < N {
            channels[slot].timing = timing;
            slot += 1;
        }
        Self { sync, channels }
    }

    /// Timing for a scheduler slot; `0` is frame sync. Unknown slots read as
    /// the frame-sync timing.
    pub(crate) fn slot_timing(&self, slot: u8) -> PulseTiming {
        self.channel(ChannelIndex(slot))
            .map_or(self.sync, Channel::timing)
    }

    pub(crate) const fn sync(&self) -> PulseTiming {
        self.sync
    }

    pub(crate) const fn set_sync(&mut self, sync: PulseTiming) {
        self.sync = sync;
    }

    /// The servo channel at `index`, or `None` for the sentinel and for
    /// indices past `N`.
    pub(crate) fn channel(&self, index: ChannelIndex) -> Option<&Channel<P>> {
        usize::from(index.0)
            .checked_sub(1)
            .and_then(|slot| self.channels.get(slot))
    }

    pub(crate) fn channel_mut(&mut self, index: ChannelIndex) -> Option<&mut Channel<P>> {
        usize::from(index.0)
            .checked_sub(1)
            .and_then(|slot| self.channels.get_mut(slot))
    }

    /// Reset every servo channel's timing, leaving pins untouched.
    pub(crate) fn reset_timings(&mut self, timing: PulseTiming) {
        for channel in &mut self.channels {
            channel.timing = timing;
        }
    }
}

impl<P: OutputPin, const N: usize> ChannelTable<P, N> {
    /// Set the pin of scheduler slot `slot`, if it is a bound, active channel.
    pub(crate) fn drive(&mut self, slot: u8, high: bool) {
        if let Some(channel) = self.channel_mut(ChannelIndex(slot)) {
            channel.drive(high);
        }
    }

    /// Drive every bound pin low without changing the active flags.
    pub(crate) fn all_low(&mut self) {
        for channel in &mut self.channels {
            if let Some(pin) = channel.pin.as_mut() {
                pin.set_low().ok();
            }
        }
    }
}
