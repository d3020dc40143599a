//! One hardware timer, up to eight servos.
//!
//! See [`ServoMux`] for wiring and usage.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::OutputPin;
use portable_atomic::{AtomicU8, Ordering};

use crate::channel::{ChannelIndex, ChannelTable};
use crate::codec::PulseTiming;
use crate::config::{MAX_CHANNELS, MuxConfig};
use crate::scheduler::FrameScheduler;
use crate::servo::Servo;
use crate::timer::FrameTimer;

/// Everything the overflow interrupt touches, kept behind one critical section.
struct MuxState<T, P, const N: usize> {
    timer: Option<T>,
    table: ChannelTable<P, N>,
    scheduler: FrameScheduler,
    started: bool,
    running: bool,
}

/// Time-multiplexes up to `N` servo pulse trains onto one timer overflow
/// interrupt.
///
/// Lives in a `static` so the interrupt handler can reach it. Call
/// [`set_timer`](Self::set_timer) once at boot, forward the timer's overflow
/// interrupt to [`on_timer_overflow`](Self::on_timer_overflow), then create
/// [`Servo`] handles. The first [`attach`](Self::attach) anywhere resets every
/// channel to the default width and starts the timer.
///
/// Channel timings, pin bindings and the scheduler cursor sit behind a single
/// critical-section mutex, so a `write` racing the interrupt is seen either
/// completely or not at all.
///
/// # Example
///
/// ```rust
/// use core::convert::Infallible;
/// use embedded_hal::digital::{ErrorType, OutputPin};
/// use servo_mux::{FrameTimer, MuxConfig, ServoMux};
///
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
/// // In the timer overflow interrupt handler:
/// fn timer1_overflow() {
///     SERVO_MUX.on_timer_overflow();
/// }
///
/// SERVO_MUX.set_timer(Tc1);
/// let mut pan = SERVO_MUX.servo();
/// assert_eq!(pan.attach(Gpio).get(), 1);
/// pan.write(90); // position, mapped into the pulse-width range
/// assert_eq!(pan.read(), 3_250);
/// # timer1_overflow();
/// ```
pub struct ServoMux<T, P, const N: usize = MAX_CHANNELS> {
    config: MuxConfig,
    state: Mutex<CriticalSectionRawMutex, RefCell<MuxState<T, P, N>>>,
    channels_taken: AtomicU8,
}

impl<T, P, const N: usize> ServoMux<T, P, N> {
    /// Create the multiplexer. Use in a `static` initializer.
    ///
    /// # Panics
    ///
    /// If `config` fails [`MuxConfig::validate`] or `N` is not within
    /// `1..=254`. In `const` context both are build errors.
    #[must_use]
    pub const fn new(config: MuxConfig) -> Self {
        assert!(N > 0 && N < u8::MAX as usize, "channel count must be within 1..=254");
        let config = config.validate();
        let table = ChannelTable::new(
            config.encode(config.default_pw()),
            config.encode_ticks(config.frame_ticks()),
        );
        Self {
            config,
            state: Mutex::new(RefCell::new(MuxState {
                timer: None,
                table,
                scheduler: FrameScheduler::new(),
                started: false,
                running: false,
            })),
            channels_taken: AtomicU8::new(0),
        }
    }

    /// The validated configuration the multiplexer runs with.
    #[must_use]
    pub const fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Number of channels handed out so far (never more than `N`).
    #[must_use]
    pub fn channels_taken(&self) -> u8 {
        self.channels_taken.load(Ordering::SeqCst)
    }

    /// Reserve the next unused channel, or return
    /// [`ChannelIndex::SENTINEL`] once all `N` are taken. Channels are never
    /// given back.
    pub fn acquire_channel(&self) -> ChannelIndex {
        let taken = self
            .channels_taken
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |taken| {
                (usize::from(taken) < N).then(|| taken.saturating_add(1))
            });
        match taken {
            Ok(previous) => ChannelIndex::new(previous.saturating_add(1)),
            Err(_) => {
                warn!("servo mux: all {} channels taken", N);
                ChannelIndex::SENTINEL
            }
        }
    }

    /// The slot the scheduler is timing right now (`0` is frame sync).
    #[must_use]
    pub fn current_channel(&self) -> u8 {
        self.with_state(|state| state.scheduler.cursor())
    }

    /// True once the first [`attach`](Self::attach) has initialized the
    /// channel table.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.with_state(|state| state.started)
    }

    /// Stored timing of a servo channel, `None` for the sentinel.
    #[must_use]
    pub fn timing(&self, index: ChannelIndex) -> Option<PulseTiming> {
        self.with_state(|state| state.table.channel(index).map(|channel| channel.timing()))
    }

    /// Timing of the frame-sync slot as last recomputed by the scheduler.
    #[must_use]
    pub fn frame_sync_timing(&self) -> PulseTiming {
        self.with_state(|state| state.table.sync())
    }

    /// Pulse width (µs) currently stored for a channel; `0` for the sentinel.
    #[must_use]
    pub fn read(&self, index: ChannelIndex) -> u16 {
        self.timing(index)
            .map_or(0, |timing| self.config.decode(timing))
    }

    /// True while the channel is bound to a pin and being pulsed.
    #[must_use]
    pub fn is_attached(&self, index: ChannelIndex) -> bool {
        self.with_state(|state| {
            state
                .table
                .channel(index)
                .is_some_and(|channel| channel.is_active())
        })
    }

    /// Store a new width for a channel. `value` inside the position range is
    /// mapped onto the pulse-width range; anything else is a width in µs.
    /// Widths saturate at the configured bounds.
    pub fn write(&self, index: ChannelIndex, value: u16) {
        self.write_pulse_us(index, self.config.resolve(value));
    }

    /// Store a new position for a channel, clamped to the position range.
    pub fn write_position(&self, index: ChannelIndex, position: u16) {
        self.write_pulse_us(index, self.config.map_position(position));
    }

    /// Store a new pulse width (µs) for a channel without position mapping.
    pub fn write_pulse_us(&self, index: ChannelIndex, pulse_width_us: u16) {
        if index.is_sentinel() {
            return;
        }
        let timing = self.config.encode(pulse_width_us);
        let stored = self.with_state(|state| {
            let Some(channel) = state.table.channel_mut(index) else {
                return false;
            };
            channel.set_timing(timing);
            true
        });
        if stored {
            debug!(
                "servo channel {} -> {}us ({} periods, reload {})",
                index.get(),
                self.config.clamp_pw(pulse_width_us),
                timing.coarse(),
                timing.fine()
            );
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MuxState<T, P, N>) -> R) -> R {
        self.state.lock(|state| {
            let mut state_ref = state.borrow_mut();
            f(&mut *state_ref)
        })
    }
}

impl<T: FrameTimer, P: OutputPin, const N: usize> ServoMux<T, P, N> {
    /// Create a [`Servo`] handle on the next free channel.
    pub fn servo(&self) -> Servo<'_, T, P, N> {
        Servo::new(self)
    }

    /// Hand over the hardware timer. If a servo is already attached the timer
    /// starts immediately; otherwise it waits for the first attach.
    ///
    /// A replaced timer has its overflow interrupt disabled and any pulse in
    /// flight is cut off; the new timer begins with a frame-sync slot. While
    /// the multiplexer is [disabled](Self::disable) the new timer stays idle.
    pub fn set_timer(&self, timer: T) {
        self.with_state(|state| {
            let mut timer = timer;
            let previous = state.timer.take();
            let waiting = previous.is_none() || state.running;
            if let Some(mut previous) = previous {
                previous.disable_overflow_interrupt();
            }
            if state.started && waiting {
                state.table.all_low();
                state.scheduler.restart(state.table.sync());
                arm(&mut timer);
                state.running = true;
            }
            state.timer = Some(timer);
        });
    }

    /// True once a timer has been handed over with [`set_timer`](Self::set_timer).
    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.with_state(|state| state.timer.is_some())
    }

    /// Bind `pin` to a channel and start pulsing it. The first attach
    /// initializes the scheduler.
    ///
    /// Returns `index`, or [`ChannelIndex::SENTINEL`] (dropping `pin`) when
    /// `index` is the sentinel.
    pub fn attach(&self, index: ChannelIndex, pin: P) -> ChannelIndex {
        if index.is_sentinel() {
            return ChannelIndex::SENTINEL;
        }
        let (bound, armed) = self.with_state(|state| {
            let armed = (!state.started).then(|| self.start(state));
            let Some(channel) = state.table.channel_mut(index) else {
                return (false, armed);
            };
            channel.bind(pin);
            (true, armed)
        });
        if let Some(armed) = armed {
            self.log_start(armed);
        }
        if !bound {
            return ChannelIndex::SENTINEL;
        }
        info!("servo channel {} attached", index.get());
        index
    }

    /// Drive the channel's pin low now and stop pulsing it. The channel keeps
    /// its slot in the frame and its stored width.
    pub fn detach(&self, index: ChannelIndex) {
        if index.is_sentinel() {
            return;
        }
        let detached = self.with_state(|state| {
            let Some(channel) = state.table.channel_mut(index) else {
                return false;
            };
            channel.release();
            true
        });
        if detached {
            info!("servo channel {} detached", index.get());
        }
    }

    /// Stop the overflow interrupt and drive every bound pin low. Stored
    /// widths and attachments are kept for [`enable`](Self::enable).
    pub fn disable(&self) {
        self.with_state(|state| {
            if let Some(timer) = state.timer.as_mut() {
                timer.disable_overflow_interrupt();
            }
            state.table.all_low();
            state.running = false;
        });
        info!("servo mux disabled");
    }

    /// Restart pulse generation after [`disable`](Self::disable), beginning
    /// with a frame-sync slot. Does nothing before the first attach.
    pub fn enable(&self) {
        let resumed = self.with_state(|state| {
            if !state.started || state.running {
                return false;
            }
            let Some(timer) = state.timer.as_mut() else {
                return false;
            };
            state.scheduler.restart(state.table.sync());
            arm(timer);
            state.running = true;
            true
        });
        if resumed {
            info!("servo mux enabled");
        }
    }

    /// Advance the scheduler by one counter overflow. Call this, and only
    /// this, from the timer's overflow interrupt handler.
    pub fn on_timer_overflow(&self) {
        self.with_state(|state| {
            let MuxState {
                timer,
                table,
                scheduler,
                running,
                ..
            } = state;
            if !*running {
                return;
            }
            if let Some(timer) = timer.as_mut() {
                scheduler.on_overflow(&self.config, table, timer);
            }
        });
    }

    /// One-time scheduler start: default width everywhere, frame sync first,
    /// timer armed if there is one. Returns whether the timer was armed.
    fn start(&self, state: &mut MuxState<T, P, N>) -> bool {
        let config = &self.config;
        let default_timing = config.encode(config.default_pw());
        state.table.reset_timings(default_timing);

        let channel_ticks = config
            .decode_ticks(default_timing)
            .saturating_mul(u32::try_from(N).unwrap_or(u32::MAX));
        let sync_ticks = config.frame_ticks().saturating_sub(channel_ticks);
        state.table.set_sync(config.encode_ticks(sync_ticks));
        state.scheduler.restart(state.table.sync());
        state.started = true;

        let Some(timer) = state.timer.as_mut() else {
            return false;
        };
        arm(timer);
        state.running = true;
        true
    }

    /// Report a start. Called with the critical section released.
    fn log_start(&self, armed: bool) {
        let config = &self.config;
        info!(
            "servo mux started: {} channels, frame {} ticks, period {} ticks",
            N,
            config.frame_ticks(),
            config.period_ticks()
        );
        if !config.frame_fits(N) {
            warn!(
                "servo mux: {} channels at {}us overrun the {}us frame",
                N,
                config.max_pw(),
                config.frame_period_us()
            );
        }
        if !armed {
            warn!("servo mux: no frame timer yet, pulses start on set_timer");
        }
    }
}

fn arm<T: FrameTimer>(timer: &mut T) {
    timer.start();
    timer.enable_overflow_interrupt();
}
