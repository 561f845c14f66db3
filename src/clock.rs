// Two countdown clocks, one per force. Each clock ticks once per real second while its force is
// on move. Only the side to move loses time; the other clock keeps its schedule paused.

use std::time::Duration;

use enum_map::EnumMap;
use instant::Instant;

use crate::force::Force;


const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, Default)]
struct ForceClock {
    remaining_secs: i64,
    // Next moment this clock should lose a second. Reset whenever the clock is (re)started.
    next_tick: Option<Instant>,
}

#[derive(Clone, Debug, Default)]
pub struct GameClocks {
    clocks: EnumMap<Force, ForceClock>,
    // Cleared by `stop`. A tick arriving after that is a no-op.
    live: bool,
}

impl GameClocks {
    pub fn new() -> Self { Self::default() }

    pub fn start(&mut self, white_secs: i64, black_secs: i64, now: Instant) {
        self.clocks[Force::White] = ForceClock { remaining_secs: white_secs, next_tick: Some(now + TICK) };
        self.clocks[Force::Black] = ForceClock { remaining_secs: black_secs, next_tick: Some(now + TICK) };
        self.live = true;
    }

    // Server time is authoritative: overwrite the local countdown and restart the tick schedule.
    pub fn set_remaining(&mut self, white_secs: i64, black_secs: i64, now: Instant) {
        if !self.live {
            return;
        }
        self.start(white_secs, black_secs, now);
    }

    pub fn stop(&mut self) {
        self.live = false;
        for clock in self.clocks.values_mut() {
            clock.next_tick = None;
        }
    }

    pub fn is_running(&self) -> bool { self.live }

    pub fn remaining(&self, force: Force) -> i64 { self.clocks[force].remaining_secs }

    pub fn is_low_time(&self, force: Force, threshold_secs: i64) -> bool {
        self.remaining(force) < threshold_secs
    }

    // Processes every tick due by `now`. The clock of the inactive force is re-armed without
    // losing time, so a force switch never charges the new side for the old side's second.
    pub fn tick(&mut self, now: Instant, active: Force) {
        if !self.live {
            return;
        }
        for (force, clock) in self.clocks.iter_mut() {
            let Some(mut next_tick) = clock.next_tick else {
                continue;
            };
            while next_tick <= now {
                if force == active {
                    clock.remaining_secs -= 1;
                }
                next_tick += TICK;
            }
            clock.next_tick = Some(next_tick);
        }
    }
}

// Formats seconds as "MM:SS", or "HH:MM:SS" from one hour on. Negative values get a leading "-".
pub fn format_hhmmss(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{minutes:02}:{seconds:02}")
    }
}
