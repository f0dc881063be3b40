//! Capacitive touch input: calibration, debounce, and gesture
//! disambiguation for the two control pads.
//!
//! A pad reads lower when touched. Each channel is compared against a
//! baseline sampled once at boot; the recognizer then turns raw per-tick
//! readings into at most one gesture event, with combo rules taking
//! precedence over single taps.

use crate::time::{since, Millis};
use log::info;

/// Samples averaged per channel during boot calibration.
pub const TOUCH_SAMPLES: usize = 64;

/// Reading drop below baseline that counts as a press.
pub const TOUCH_DELTA: u16 = 10;

/// Continuous press time after which a pad counts as held.
pub const HOLD_THRESHOLD_MS: Millis = 300;

/// Continuous co-press time for the both-hold gesture.
pub const BOTH_HOLD_THRESHOLD_MS: Millis = 400;

/// Raw capacitive reading source. Hardware seam; the host tests feed
/// synthetic readings through it.
pub trait TouchProbe {
    fn read(&mut self, channel: usize) -> u16;
}

/// The two control pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pad {
    A,
    B,
}

impl Pad {
    fn from_index(i: usize) -> Self {
        if i == 0 {
            Pad::A
        } else {
            Pad::B
        }
    }
}

/// Disambiguated gesture, at most one per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Press and release shorter than the hold threshold, other pad idle
    /// for the whole interval.
    Tap(Pad),
    /// `tapped` released while `held` was past its hold threshold.
    HoldTap { held: Pad, tapped: Pad },
    /// Both pads co-pressed past the both-hold threshold. Fires once per
    /// full release/re-press cycle.
    BothHold,
}

#[derive(Debug, Clone, Copy)]
struct TouchChannel {
    baseline: u16,
    delta: u16,
    pressed: bool,
    press_start: Millis,
    held: bool,
    /// The other pad was pressed at some point during this press.
    overlapped: bool,
}

impl TouchChannel {
    fn new(baseline: u16) -> Self {
        // Clamp the sensitivity delta so a degenerate baseline can never
        // underflow the threshold; a floor of 1 keeps a zero baseline from
        // reading as permanently pressed.
        let delta = TOUCH_DELTA.min(baseline.saturating_sub(1)).max(1);
        Self {
            baseline,
            delta,
            pressed: false,
            press_start: 0,
            held: false,
            overlapped: false,
        }
    }

    fn is_pressed(&self, raw: u16) -> bool {
        let drop = self.baseline.saturating_sub(raw);
        drop >= self.delta
    }
}

pub struct GestureRecognizer {
    chans: [TouchChannel; 2],
    both_start: Millis,
    both_armed: bool,
}

impl GestureRecognizer {
    /// Bounded boot-time calibration: average a fixed number of raw
    /// readings per channel, no wall-clock dependency.
    pub fn calibrate(probe: &mut dyn TouchProbe) -> Self {
        info!("calibrating capacitive touch baselines");
        let mut baselines = [0u16; 2];
        for (chan, baseline) in baselines.iter_mut().enumerate() {
            let mut acc: u32 = 0;
            for _ in 0..TOUCH_SAMPLES {
                acc += probe.read(chan) as u32;
            }
            *baseline = (acc / TOUCH_SAMPLES as u32) as u16;
        }
        let chans = [
            TouchChannel::new(baselines[0]),
            TouchChannel::new(baselines[1]),
        ];
        for (i, c) in chans.iter().enumerate() {
            info!(
                "touch pad {}: baseline={}, delta={}",
                i, c.baseline, c.delta
            );
        }
        Self {
            chans,
            both_start: 0,
            both_armed: true,
        }
    }

    pub fn baseline(&self, chan: usize) -> u16 {
        self.chans[chan].baseline
    }

    pub fn delta(&self, chan: usize) -> u16 {
        self.chans[chan].delta
    }

    /// Feed one tick of raw readings; returns at most one gesture.
    pub fn update(&mut self, now: Millis, raw: [u16; 2]) -> Option<GestureEvent> {
        let pressed = [
            self.chans[0].is_pressed(raw[0]),
            self.chans[1].is_pressed(raw[1]),
        ];
        let was = [self.chans[0].pressed, self.chans[1].pressed];
        let both = pressed[0] && pressed[1];
        let was_both = was[0] && was[1];

        // Press edges
        for i in 0..2 {
            if pressed[i] && !was[i] {
                self.chans[i].press_start = now;
                self.chans[i].held = false;
                self.chans[i].overlapped = pressed[1 - i] || was[1 - i];
            }
        }
        if both {
            self.chans[0].overlapped = true;
            self.chans[1].overlapped = true;
            if !was_both {
                self.both_start = now;
            }
        }

        // Hold detection while still pressed
        for i in 0..2 {
            if pressed[i]
                && !self.chans[i].held
                && since(now, self.chans[i].press_start) >= HOLD_THRESHOLD_MS
            {
                self.chans[i].held = true;
            }
        }

        let mut event = None;

        // 1. Both-hold, latched until both pads fully release
        if both && self.both_armed && since(now, self.both_start) >= BOTH_HOLD_THRESHOLD_MS {
            self.both_armed = false;
            event = Some(GestureEvent::BothHold);
        }

        // 2. Hold+tap: a short press releases while the other pad is held
        if event.is_none() {
            for i in 0..2 {
                let o = 1 - i;
                if !pressed[i]
                    && was[i]
                    && !self.chans[i].held
                    && pressed[o]
                    && self.chans[o].held
                {
                    event = Some(GestureEvent::HoldTap {
                        held: Pad::from_index(o),
                        tapped: Pad::from_index(i),
                    });
                    break;
                }
            }
        }

        // 3. Single tap: release below the hold threshold with the other pad
        //    untouched for the whole press
        if event.is_none() && !both {
            for i in 0..2 {
                if !pressed[i]
                    && was[i]
                    && !self.chans[i].held
                    && !self.chans[i].overlapped
                    && !pressed[1 - i]
                {
                    event = Some(GestureEvent::Tap(Pad::from_index(i)));
                    break;
                }
            }
        }

        // Re-arm the both-hold latch only after a full release
        if !pressed[0] && !pressed[1] {
            self.both_armed = true;
        }

        for i in 0..2 {
            self.chans[i].pressed = pressed[i];
        }

        event
    }
}
