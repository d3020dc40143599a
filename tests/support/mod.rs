//! Mock timer and pins plus a tick-accurate simulation of the overflow timer.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use servo_mux::{FrameTimer, MuxConfig, ServoMux};

/// A pin level change observed by the simulation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Edge {
    pub pin: u8,
    pub high: bool,
    pub at: u64,
}

/// State shared between the test, the mock timer and the mock pins.
#[derive(Debug, Default)]
pub struct Bench {
    /// Simulated time in timer ticks.
    pub now: Cell<u64>,
    /// Value the counter was last loaded with (0 after each overflow).
    pub counter: Cell<u16>,
    pub starts: Cell<u32>,
    pub interrupt_enabled: Cell<bool>,
    pub edges: RefCell<Vec<Edge>>,
    pub levels: RefCell<[bool; 32]>,
}

impl Bench {
    pub fn level(&self, pin: u8) -> bool {
        self.levels.borrow()[usize::from(pin)]
    }

    pub fn edges_for(&self, pin: u8) -> Vec<Edge> {
        self.edges
            .borrow()
            .iter()
            .copied()
            .filter(|edge| edge.pin == pin)
            .collect()
    }

    /// `(rise, fall)` tick pairs for every complete pulse on `pin`.
    pub fn pulses(&self, pin: u8) -> Vec<(u64, u64)> {
        let mut pulses = Vec::new();
        let mut rise = None;
        for edge in self.edges_for(pin) {
            match (edge.high, rise) {
                (true, None) => rise = Some(edge.at),
                (false, Some(start)) => {
                    pulses.push((start, edge.at));
                    rise = None;
                }
                _ => {}
            }
        }
        pulses
    }
}

pub struct MockTimer {
    bench: Rc<Bench>,
}

impl FrameTimer for MockTimer {
    fn start(&mut self) {
        self.bench.starts.set(self.bench.starts.get() + 1);
        self.bench.counter.set(0);
    }

    fn set_counter(&mut self, value: u16) {
        self.bench.counter.set(value);
    }

    fn enable_overflow_interrupt(&mut self) {
        self.bench.interrupt_enabled.set(true);
    }

    fn disable_overflow_interrupt(&mut self) {
        self.bench.interrupt_enabled.set(false);
    }
}

pub struct MockPin {
    id: u8,
    bench: Rc<Bench>,
}

impl MockPin {
    fn record(&self, high: bool) {
        let mut levels = self.bench.levels.borrow_mut();
        let level = &mut levels[usize::from(self.id)];
        if *level != high {
            *level = high;
            self.bench.edges.borrow_mut().push(Edge {
                pin: self.id,
                high,
                at: self.bench.now.get(),
            });
        }
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true);
        Ok(())
    }
}

pub type TestMux<const N: usize> = ServoMux<MockTimer, MockPin, N>;

/// A multiplexer wired to a simulated timer.
pub struct Rig<const N: usize> {
    pub mux: TestMux<N>,
    pub bench: Rc<Bench>,
}

impl<const N: usize> Rig<N> {
    /// A multiplexer without a timer installed yet.
    pub fn bare(config: MuxConfig) -> Self {
        Self {
            mux: ServoMux::new(config),
            bench: Rc::new(Bench::default()),
        }
    }

    /// A multiplexer with its timer installed.
    pub fn new(config: MuxConfig) -> Self {
        let rig = Self::bare(config);
        rig.mux.set_timer(rig.timer());
        rig
    }

    pub fn timer(&self) -> MockTimer {
        MockTimer {
            bench: Rc::clone(&self.bench),
        }
    }

    pub fn pin(&self, id: u8) -> MockPin {
        MockPin {
            id,
            bench: Rc::clone(&self.bench),
        }
    }

    /// Let the counter run to its next overflow and invoke the handler.
    pub fn overflow(&self) {
        let period = self.mux.config().period_ticks();
        let elapsed = period - u32::from(self.bench.counter.get());
        self.bench.now.set(self.bench.now.get() + u64::from(elapsed));
        self.bench.counter.set(0);
        self.mux.on_timer_overflow();
    }

    /// Run until the scheduler lands on `slot` `times` times.
    pub fn run_until_slot(&self, slot: u8, times: usize) {
        let mut seen = 0;
        let mut last = self.mux.current_channel();
        while seen < times {
            self.overflow();
            let cursor = self.mux.current_channel();
            if cursor != last && cursor == slot {
                seen += 1;
            }
            last = cursor;
        }
    }

    /// Run whole frames, ending as frame sync begins.
    pub fn run_frames(&self, frames: usize) {
        self.run_until_slot(0, frames);
    }

    /// Every slot the cursor moves to, over `overflows` overflows.
    pub fn cursor_trace(&self, overflows: usize) -> Vec<u8> {
        let mut trace = Vec::new();
        let mut last = self.mux.current_channel();
        for _ in 0..overflows {
            self.overflow();
            let cursor = self.mux.current_channel();
            if cursor != last {
                trace.push(cursor);
            }
            last = cursor;
        }
        trace
    }
}
