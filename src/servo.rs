//! A handle for one hobby servo driven by a [`ServoMux`].
//!
//! See [`Servo`] for usage.

use embedded_hal::digital::OutputPin;

use crate::channel::ChannelIndex;
use crate::config::MAX_CHANNELS;
use crate::servo_mux::ServoMux;
use crate::timer::FrameTimer;
use crate::{Error, Result};

/// One servo on a [`ServoMux`] channel.
///
/// Creating a handle reserves the next free channel for good. Once the
/// multiplexer's channels run out, new handles get
/// [`ChannelIndex::SENTINEL`] and every operation on them is a no-op
/// ([`read`](Self::read) returns `0`, [`attached`](Self::attached) returns
/// `false`).
///
/// # Example
///
/// ```rust
/// # use core::convert::Infallible;
/// # use embedded_hal::digital::{ErrorType, OutputPin};
/// # use servo_mux::{FrameTimer, MuxConfig, Servo, ServoMux};
/// # struct Tc1;
/// # impl FrameTimer for Tc1 {
/// #     fn start(&mut self) {}
/// #     fn set_counter(&mut self, _value: u16) {}
/// #     fn enable_overflow_interrupt(&mut self) {}
/// #     fn disable_overflow_interrupt(&mut self) {}
/// # }
/// # struct Gpio;
/// # impl ErrorType for Gpio { type Error = Infallible; }
/// # impl OutputPin for Gpio {
/// #     fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
/// #     fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
/// # }
/// static SERVO_MUX: ServoMux<Tc1, Gpio> = ServoMux::new(MuxConfig::DEFAULT);
///
/// SERVO_MUX.set_timer(Tc1);
/// let mut tilt = Servo::new(&SERVO_MUX);
/// tilt.attach(Gpio);
///
/// tilt.write(0); // positions 0..=180 map onto the pulse-width range
/// assert_eq!(tilt.read(), 1_000);
/// tilt.write(2_000); // anything above 180 is a width in µs
/// assert_eq!(tilt.read(), 2_000);
///
/// tilt.detach(); // pin goes low, the servo relaxes
/// assert!(!tilt.attached());
/// ```
pub struct Servo<'a, T, P, const N: usize = MAX_CHANNELS> {
    mux: &'a ServoMux<T, P, N>,
    channel: ChannelIndex,
}

impl<'a, T: FrameTimer, P: OutputPin, const N: usize> Servo<'a, T, P, N> {
    /// Reserve the next free channel on `mux`.
    ///
    /// See the [struct-level example](Self) for usage.
    pub fn new(mux: &'a ServoMux<T, P, N>) -> Self {
        Self {
            mux,
            channel: mux.acquire_channel(),
        }
    }

    /// The channel this handle drives, or the sentinel.
    #[must_use]
    pub const fn channel(&self) -> ChannelIndex {
        self.channel
    }

    /// Bind the servo's signal pin and start pulsing it at the stored width.
    ///
    /// Returns the channel index, or [`ChannelIndex::SENTINEL`] if this handle
    /// has no channel (the pin is dropped).
    pub fn attach(&mut self, pin: P) -> ChannelIndex {
        self.mux.attach(self.channel, pin)
    }

    /// Like [`attach`](Self::attach), but reports why the servo would not be
    /// pulsed.
    ///
    /// # Errors
    ///
    /// [`Error::NoChannel`] for a sentinel handle and [`Error::TimerMissing`]
    /// when [`ServoMux::set_timer`] has not been called. The pin is dropped in
    /// both cases.
    pub fn try_attach(&mut self, pin: P) -> Result<ChannelIndex> {
        if self.channel.is_sentinel() {
            return Err(Error::NoChannel);
        }
        if !self.mux.has_timer() {
            return Err(Error::TimerMissing);
        }
        Ok(self.attach(pin))
    }

    /// Drive the pin low now and stop pulsing. The stored width is kept.
    pub fn detach(&mut self) {
        self.mux.detach(self.channel);
    }

    /// Set a position (`value` within the position range, 0..=180 by default)
    /// or, for larger values, a pulse width in µs.
    pub fn write(&mut self, value: u16) {
        self.mux.write(self.channel, value);
    }

    /// Set a pulse width in µs, whatever its value. Saturates at the
    /// configured bounds.
    pub fn set_pulse_us(&mut self, pulse_width_us: u16) {
        self.mux.write_pulse_us(self.channel, pulse_width_us);
    }

    /// Set a position, clamped to the configured position range.
    pub fn set_position(&mut self, position: u16) {
        self.mux.write_position(self.channel, position);
    }

    /// Move to the configured default width.
    pub fn center(&mut self) {
        let default_pw = self.mux.config().default_pw();
        self.mux.write_pulse_us(self.channel, default_pw);
    }

    /// The stored pulse width in µs; `0` without a channel.
    #[must_use]
    pub fn read(&self) -> u16 {
        self.mux.read(self.channel)
    }

    /// True while the servo is bound to a pin and being pulsed.
    #[must_use]
    pub fn attached(&self) -> bool {
        self.mux.is_attached(self.channel)
    }
}
