#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

//! Four servos on GPIO 2..=5, all timed by the wrap interrupt of PWM slice 0.
//!
//! The slice runs free (no output pin) at 1 MHz with `top = 255`, so it wraps
//! every 256 µs and behaves like an 8-bit overflow timer.

use core::convert::Infallible;

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_rp::interrupt::InterruptExt;
use embassy_rp::pac;
use embassy_rp::pwm::{Config, Pwm};
use embassy_time::Timer;
use servo_mux::{FrameTimer, MuxConfig, Result, ServoMux};
use {defmt::info, defmt_rtt as _, panic_probe as _};

const SLICE_BIT: u32 = 1 << 0;

const CONFIG: MuxConfig = MuxConfig::DEFAULT
    .with_ticks_per_us(1)
    .with_pulse_range(544, 2_400);

static SERVO_MUX: ServoMux<SliceTimer, Output<'static>, 4> = ServoMux::new(CONFIG);

/// PWM slice used purely as a wrapping counter.
struct SliceTimer {
    pwm: Pwm<'static>,
    config: Config,
}

impl FrameTimer for SliceTimer {
    fn start(&mut self) {
        self.pwm.set_counter(0);
        self.config.enable = true;
        self.pwm.set_config(&self.config);
    }

    fn set_counter(&mut self, value: u16) {
        self.pwm.set_counter(value);
    }

    fn enable_overflow_interrupt(&mut self) {
        pac::PWM.intr().write_value(pac::pwm::regs::Intr(SLICE_BIT));
        pac::PWM.inte().modify(|w| w.0 |= SLICE_BIT);
    }

    fn disable_overflow_interrupt(&mut self) {
        pac::PWM.inte().modify(|w| w.0 &= !SLICE_BIT);
    }
}

#[interrupt]
fn PWM_IRQ_WRAP() {
    pac::PWM.intr().write_value(pac::pwm::regs::Intr(SLICE_BIT));
    SERVO_MUX.on_timer_overflow();
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(_spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // 125 MHz / 125 = 1 tick per µs.
    let mut config = Config::default();
    config.top = 255;
    config.divider = 125_u8.into();
    config.phase_correct = false;
    config.enable = false;
    let pwm = Pwm::new_free(p.PWM_SLICE0, config.clone());
    SERVO_MUX.set_timer(SliceTimer { pwm, config });

    interrupt::PWM_IRQ_WRAP.set_priority(interrupt::Priority::P1);
    #[expect(unsafe_code, reason = "no critical section depends on this IRQ being masked")]
    unsafe {
        interrupt::PWM_IRQ_WRAP.enable();
    }

    let mut pan = SERVO_MUX.servo();
    let mut tilt = SERVO_MUX.servo();
    let mut grip = SERVO_MUX.servo();
    let mut wrist = SERVO_MUX.servo();
    pan.try_attach(Output::new(p.PIN_2, Level::Low))?;
    tilt.try_attach(Output::new(p.PIN_3, Level::Low))?;
    grip.try_attach(Output::new(p.PIN_4, Level::Low))?;
    wrist.try_attach(Output::new(p.PIN_5, Level::Low))?;
    info!("servo mux demo: {} channels attached", SERVO_MUX.channels_taken());

    // Sweep in 10 degree steps; the other servos mirror or trail the pan.
    loop {
        for degrees in (0..=180).step_by(10).chain((0..180).step_by(10).rev()) {
            pan.write(degrees);
            tilt.write(180 - degrees);
            grip.set_position(degrees / 2);
            wrist.set_pulse_us(1_000 + degrees * 5);
            info!("sweep {} deg -> pan {}us", degrees, pan.read());
            Timer::after_millis(60).await;
        }
    }
}
