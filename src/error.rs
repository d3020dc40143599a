//! Error and result types for the opt-in fallible servo operations.
//!
//! The multiplexer itself never fails: bad widths saturate and an exhausted
//! channel pool hands out the sentinel index. These errors only surface from
//! wrappers such as [`Servo::try_attach`](crate::Servo::try_attach).

use derive_more::{Display, Error};

/// Errors reported by the fallible servo wrappers.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The handle holds the sentinel index because every channel was taken.
    #[display("every servo channel is already taken")]
    NoChannel,

    /// No [`FrameTimer`](crate::FrameTimer) has been handed to the multiplexer,
    /// so attached servos would never be pulsed.
    #[display("no frame timer installed")]
    TimerMissing,
}

/// Result alias using the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;
