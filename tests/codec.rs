#![allow(missing_docs)]
//! Host-level tests for the pulse width codec.

use servo_mux::MuxConfig;
use servo_mux::config::{MAX_PW, MIN_PW, OVERHEAD_US, TICKS_PER_US};

const CONFIG: MuxConfig = MuxConfig::DEFAULT;

#[test]
fn every_width_in_range_decodes_to_itself() {
    for width in MIN_PW..=MAX_PW {
        assert_eq!(CONFIG.decode(CONFIG.encode(width)), width, "width {width}");
    }
}

#[test]
fn every_width_holds_the_pin_for_its_adjusted_tick_count() {
    for width in MIN_PW..=MAX_PW {
        let expected = u32::from(width - OVERHEAD_US) * u32::from(TICKS_PER_US);
        assert_eq!(CONFIG.decode_ticks(CONFIG.encode(width)), expected, "width {width}");
    }
}

#[test]
fn widths_below_the_range_saturate_to_min() {
    let min = CONFIG.encode(MIN_PW);
    for width in [0, 1, 181, 500, MIN_PW - 1] {
        assert_eq!(CONFIG.encode(width), min, "width {width}");
    }
}

#[test]
fn widths_above_the_range_saturate_to_max() {
    let max = CONFIG.encode(MAX_PW);
    for width in [MAX_PW + 1, 6_000, 20_000, u16::MAX] {
        assert_eq!(CONFIG.encode(width), max, "width {width}");
    }
}

#[test]
fn every_encoded_width_spans_at_least_one_full_period() {
    for width in [MIN_PW, 1_500, 3_250, MAX_PW] {
        let timing = CONFIG.encode(width);
        assert!(timing.coarse() >= 1, "width {width}");
        assert!(u32::from(timing.fine()) < CONFIG.period_ticks(), "width {width}");
    }
}

#[test]
fn position_midpoint_matches_width_midpoint() {
    assert_eq!(CONFIG.resolve(90), 3_250);
    assert_eq!(CONFIG.resolve(3_250), 3_250);
    assert_eq!(CONFIG.encode(CONFIG.resolve(90)), CONFIG.encode(CONFIG.resolve(3_250)));
}

#[test]
fn position_range_ends_map_to_width_range_ends() {
    assert_eq!(CONFIG.map_position(0), MIN_PW);
    assert_eq!(CONFIG.map_position(180), MAX_PW);
    assert_eq!(CONFIG.map_position(400), MAX_PW);
}

#[test]
fn values_past_the_position_range_are_widths() {
    assert_eq!(CONFIG.resolve(180), MAX_PW);
    assert_eq!(CONFIG.resolve(181), 181);
    assert_eq!(CONFIG.resolve(1_500), 1_500);
}

#[test]
fn offset_position_range_maps_linearly() {
    let config = MuxConfig::DEFAULT
        .with_position_range(10, 100)
        .with_pulse_range(1_000, 2_800)
        .validate();
    assert_eq!(config.resolve(10), 1_000);
    assert_eq!(config.resolve(55), 1_900);
    assert_eq!(config.resolve(100), 2_800);
    // Below the position range: a (saturating) width, not a position.
    assert_eq!(config.resolve(5), 5);
    assert_eq!(config.decode(config.encode(config.resolve(5))), 1_000);
}

#[test]
fn microsecond_ticks_round_trip() {
    let config = MuxConfig::DEFAULT
        .with_ticks_per_us(1)
        .with_pulse_range(544, 2_400)
        .validate();
    for width in config.min_pw()..=config.max_pw() {
        assert_eq!(config.decode(config.encode(width)), width, "width {width}");
    }
    // 544 - 8 = 536 ticks = 2 * 256 + (256 - 232)
    let timing = config.encode(544);
    assert_eq!((timing.coarse(), timing.fine()), (2, 232));
}

#[test]
fn wide_counter_round_trip() {
    // 10-bit counter at 8 ticks/µs: one period is 128 µs.
    let config = MuxConfig::DEFAULT
        .with_counter_bits(10)
        .with_ticks_per_us(8)
        .validate();
    assert_eq!(config.period_ticks(), 1_024);
    for width in [MIN_PW, 1_234, 3_250, MAX_PW] {
        assert_eq!(config.decode(config.encode(width)), width, "width {width}");
    }
}

#[test]
fn degenerate_ranges_saturate_instead_of_panicking() {
    // Never validated: an empty position range and an inverted pulse range.
    let empty = MuxConfig::DEFAULT.with_position_range(5, 5);
    assert_eq!(empty.map_position(5), MIN_PW);
    assert_eq!(empty.map_position(180), MIN_PW);

    let inverted = MuxConfig::DEFAULT.with_pulse_range(2_000, 1_000);
    assert_eq!(inverted.map_position(0), 2_000);
    assert_eq!(inverted.map_position(90), 2_000);
    assert_eq!(inverted.map_position(180), 2_000);
}
