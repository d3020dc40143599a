//! The overflow interrupt state machine.
//!
//! Each slot (frame sync, then channels `1..=N`) is timed as `coarse` full
//! counter periods followed by one shortened period:
//!
//! ```text
//!   overflow:   1      2     ...   coarse        coarse + 1
//!               |------|----- ... ---|  reload fine  |
//!   pin:  ______/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾\______
//!            slot start                            slot end, next pin high
//! ```

use core::cmp::Ordering;

use embedded_hal::digital::OutputPin;

use crate::channel::ChannelTable;
use crate::codec::PulseTiming;
use crate::config::MuxConfig;
use crate::timer::FrameTimer;

/// Scheduler slot of the frame-sync padding.
pub(crate) const FRAME_SYNC: u8 = 0;

pub(crate) struct FrameScheduler {
    cursor: u8,
    tick_count: u16,
    // Ticks used by the channels visited so far in this frame.
    frame_elapsed: u32,
    // Timing of the current slot, latched when the slot began. A write lands
    // on the channel's next pulse, never halfway through one.
    slot: PulseTiming,
}

impl FrameScheduler {
    pub(crate) const fn new() -> Self {
        Self {
            cursor: FRAME_SYNC,
            tick_count: 0,
            frame_elapsed: 0,
            slot: PulseTiming::ZERO,
        }
    }

    /// Park on the frame-sync slot with nothing counted, timing it as `sync`.
    pub(crate) const fn restart(&mut self, sync: PulseTiming) {
        *self = Self::new();
        self.slot = sync;
    }

    pub(crate) const fn cursor(&self) -> u8 {
        self.cursor
    }

    /// Handle one counter overflow. Bounded: no loops over the table, no
    /// allocation, no blocking.
    pub(crate) fn on_overflow<T, P, const N: usize>(
        &mut self,
        config: &MuxConfig,
        table: &mut ChannelTable<P, N>,
        timer: &mut T,
    ) where
        T: FrameTimer,
        P: OutputPin,
    {
        self.tick_count = self.tick_count.saturating_add(1);
        let timing = self.slot;

        match self.tick_count.cmp(&timing.coarse()) {
            Ordering::Less => {}
            Ordering::Equal => {
                // Last full period: shorten the next one to land the edge.
                timer.set_counter(timing.fine());
                if self.cursor != FRAME_SYNC {
                    self.frame_elapsed = self
                        .frame_elapsed
                        .saturating_add(config.decode_ticks(timing));
                    let remaining = config.frame_ticks().saturating_sub(self.frame_elapsed);
                    table.set_sync(config.encode_ticks(remaining));
                }
            }
            Ordering::Greater => {
                table.drive(self.cursor, false);

                self.cursor = next_slot(self.cursor, N);
                self.slot = table.slot_timing(self.cursor);
                self.tick_count = 0;
                timer.set_counter(0);

                if self.cursor == 1 {
                    self.frame_elapsed = 0;
                }
                table.drive(self.cursor, true);
            }
        }
    }
}

/// Slot after `slot`, wrapping past the last channel back to frame sync.
pub(crate) fn next_slot(slot: u8, channel_count: usize) -> u8 {
    if usize::from(slot) >= channel_count {
        FRAME_SYNC
    } else {
        slot.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_visits_every_channel_then_frame_sync() {
        let mut slot = FRAME_SYNC;
        let mut visited = [0_u8; 12];
        for entry in &mut visited {
            slot = next_slot(slot, 3);
            *entry = slot;
        }
        assert_eq!(visited, [1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn out_of_range_cursor_wraps_to_frame_sync() {
        assert_eq!(next_slot(9, 8), FRAME_SYNC);
        assert_eq!(next_slot(8, 8), FRAME_SYNC);
        assert_eq!(next_slot(7, 8), 8);
    }
}
