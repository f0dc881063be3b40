//! Bounded one-shot effect state machines.
//!
//! Each one-shot is singular: retriggering while a run is in flight restarts
//! it from the beginning. They terminate on an explicit condition in their
//! own phase logic, never on a wall-clock duration, and while active they
//! own the whole strand as a solid fill at their current duty. Once a
//! machine finishes, the background effect shows through again on its next
//! repaint.

use crate::render::{fill, RenderSink};
use crate::time::{reached, Millis};
use smart_leds::RGB8;

pub const PULSE_INTERVAL_MS: Millis = 4;
pub const SAW_INTERVAL_MS: Millis = 4;
pub const DBL_ON_MS: Millis = 80;
pub const DBL_OFF_MS: Millis = 80;
pub const DBL_PAUSE_MS: Millis = 400;

const PULSE_STEP: u8 = 8;
const SAW_STEP: u16 = 4;
const MAX_DUTY: u8 = 255;

/// Pulse: duty ramps 0 to max, then max back to 0, once.
#[derive(Debug, Clone, Default)]
pub struct Pulse {
    active: bool,
    rising: bool,
    duty: u8,
    next_due: Millis,
}

impl Pulse {
    pub fn trigger(&mut self, now: Millis) {
        self.active = true;
        self.rising = true;
        self.duty = 0;
        self.next_due = now;
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.duty = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn advance(&mut self, now: Millis) -> bool {
        if !self.active || !reached(now, self.next_due) {
            return false;
        }
        self.next_due = now.wrapping_add(PULSE_INTERVAL_MS);

        if self.rising {
            self.duty = self.duty.saturating_add(PULSE_STEP);
            if self.duty == MAX_DUTY {
                self.rising = false;
            }
        } else {
            self.duty = self.duty.saturating_sub(PULSE_STEP);
            if self.duty == 0 {
                self.active = false;
            }
        }
        true
    }
}

/// Sawtooth: duty ramps 0 to max, then snaps straight back to 0 and finishes.
#[derive(Debug, Clone, Default)]
pub struct Sawtooth {
    active: bool,
    duty: u8,
    next_due: Millis,
}

impl Sawtooth {
    pub fn trigger(&mut self, now: Millis) {
        self.active = true;
        self.duty = 0;
        self.next_due = now;
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.duty = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn advance(&mut self, now: Millis) -> bool {
        if !self.active || !reached(now, self.next_due) {
            return false;
        }
        self.next_due = now.wrapping_add(SAW_INTERVAL_MS);

        let next = self.duty as u16 + SAW_STEP;
        if next >= MAX_DUTY as u16 {
            self.duty = 0;
            self.active = false;
        } else {
            self.duty = next as u8;
        }
        true
    }
}

/// Double-blink: on, short off, on, long pause, done.
#[derive(Debug, Clone, Default)]
pub struct DoubleBlink {
    active: bool,
    step: u8,
    duty: u8,
    next_due: Millis,
}

impl DoubleBlink {
    pub fn trigger(&mut self, now: Millis) {
        self.active = true;
        self.step = 0;
        self.duty = 0;
        self.next_due = now;
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.duty = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn advance(&mut self, now: Millis) -> bool {
        if !self.active || !reached(now, self.next_due) {
            return false;
        }
        match self.step {
            0 => {
                self.duty = MAX_DUTY;
                self.next_due = now.wrapping_add(DBL_ON_MS);
                self.step = 1;
            }
            1 => {
                self.duty = 0;
                self.next_due = now.wrapping_add(DBL_OFF_MS);
                self.step = 2;
            }
            2 => {
                self.duty = MAX_DUTY;
                self.next_due = now.wrapping_add(DBL_ON_MS);
                self.step = 3;
            }
            3 => {
                self.duty = 0;
                self.next_due = now.wrapping_add(DBL_PAUSE_MS);
                self.step = 4;
            }
            _ => {
                self.duty = 0;
                self.active = false;
            }
        }
        true
    }
}

/// Solid-fill overlay for a duty-based one-shot.
pub fn paint_duty(sink: &mut dyn RenderSink, duty: u8) {
    let color = RGB8::new(duty, duty, duty);
    for s in 0..sink.strand_count() {
        fill(sink.strand_mut(s), color);
    }
}
