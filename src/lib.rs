//! Drive up to eight hobby servos from a single hardware timer.
//!
//! All channels are time-multiplexed onto one timer overflow interrupt: the
//! interrupt handler walks the channels in turn, raises each channel's pin,
//! counts whole timer periods, reloads the counter for the final partial
//! period, and drops the pin again. A reserved frame-sync slot pads every
//! cycle so each servo sees a steady 20 ms refresh.
//!
//! See [`ServoMux`] for wiring the interrupt and [`Servo`] for the per-servo
//! handle.
//!
//! # Glossary
//!
//! - **Tick:** one step of the hardware timer counter (0.5 µs with the default
//!   [`MuxConfig`]).
//! - **Period:** one full run of the counter from its start value to overflow
//!   (256 ticks for an 8-bit counter).
//! - **Frame:** one pass over every channel plus the frame-sync slot.
//! - **Frame sync:** channel index 0. Never bound to a pin; its duration is
//!   whatever is left of the frame after the servo channels.
#![cfg_attr(not(any(test, feature = "host")), no_std)]

// Must come first so the logging macros are visible in every module below.
#[macro_use]
mod fmt;

pub mod channel;
pub mod codec;
pub mod config;
mod error;
mod scheduler;
pub mod servo;
pub mod servo_mux;
pub mod timer;

pub use crate::channel::ChannelIndex;
pub use crate::codec::PulseTiming;
pub use crate::config::MuxConfig;
// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
pub use crate::servo::Servo;
pub use crate::servo_mux::ServoMux;
pub use crate::timer::FrameTimer;
