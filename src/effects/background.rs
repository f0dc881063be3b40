//! Continuous background effect state machines.
//!
//! Each machine splits per-tick work into `advance` (time-gated phase
//! update, returns whether anything changed) and `paint` (write the current
//! phase into the sink). The split lets overlays repaint the frame without
//! double-stepping phase counters.

use crate::modulators::Modulators;
use crate::render::{fill, hsv, RenderSink};
use crate::time::{reached, Millis};
use smart_leds::RGB8;

pub const RAINBOW_INTERVAL_MS: Millis = 20;
pub const BREATH_INTERVAL_MS: Millis = 15;
pub const STROBE_ON_MS: Millis = 60;
pub const STROBE_OFF_MS: Millis = 140;

const BREATH_STEP: i16 = 4;

/// Rainbow: hue cursor advances by one each tick, spread across the strand.
#[derive(Debug, Clone)]
pub struct Rainbow {
    hue: u8,
    primed: bool,
    next_due: Millis,
}

impl Rainbow {
    pub fn new() -> Self {
        Self {
            hue: 0,
            primed: false,
            next_due: 0,
        }
    }

    pub fn reset(&mut self, now: Millis) {
        self.hue = 0;
        self.primed = false;
        self.next_due = now;
    }

    pub fn hue(&self) -> u8 {
        self.hue
    }

    pub fn advance(&mut self, now: Millis, mods: &Modulators) -> bool {
        if !reached(now, self.next_due) {
            return false;
        }
        self.next_due = now.wrapping_add(mods.scale(RAINBOW_INTERVAL_MS));
        // The first frame after a reset paints with the cursor still at 0
        if self.primed {
            self.hue = self.hue.wrapping_add(1);
        } else {
            self.primed = true;
        }
        true
    }

    pub fn paint(&self, sink: &mut dyn RenderSink, brightness: u8) {
        paint_rainbow(sink, self.hue, brightness);
    }
}

/// Breathing: the rainbow hues again, but with brightness riding a bounded
/// triangle wave between brightness/10 and full brightness.
#[derive(Debug, Clone)]
pub struct Breathing {
    level: u8,
    step: i16,
    hue: u8,
    next_due: Millis,
}

impl Breathing {
    pub fn new() -> Self {
        Self {
            level: 0,
            step: BREATH_STEP,
            hue: 0,
            next_due: 0,
        }
    }

    pub fn reset(&mut self, now: Millis, mods: &Modulators) {
        self.level = mods.brightness() / 10;
        self.step = BREATH_STEP;
        self.hue = 0;
        self.next_due = now;
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn advance(&mut self, now: Millis, mods: &Modulators) -> bool {
        if !reached(now, self.next_due) {
            return false;
        }
        self.next_due = now.wrapping_add(mods.scale(BREATH_INTERVAL_MS));

        let max = mods.brightness() as i16;
        let min = (mods.brightness() / 10) as i16;

        let mut level = self.level as i16 + self.step;
        if level >= max {
            level = max;
            self.step = -self.step;
        } else if level <= min {
            level = min;
            self.step = self.step.abs();
        }
        self.level = level as u8;

        // Hue drifts slowly underneath the breathing for variation
        self.hue = self.hue.wrapping_add(1);
        true
    }

    pub fn paint(&self, sink: &mut dyn RenderSink, _brightness: u8) {
        paint_rainbow(sink, self.hue, self.level);
    }
}

/// Strobe: hard on/off toggle with a shorter on phase than off phase.
#[derive(Debug, Clone)]
pub struct Strobe {
    on: bool,
    next_due: Millis,
}

impl Strobe {
    pub fn new() -> Self {
        Self {
            on: false,
            next_due: 0,
        }
    }

    /// Starts in the on phase so the switch is visible immediately.
    pub fn reset(&mut self, now: Millis, mods: &Modulators) {
        self.on = true;
        self.next_due = now.wrapping_add(mods.scale(STROBE_ON_MS));
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn advance(&mut self, now: Millis, mods: &Modulators) -> bool {
        if !reached(now, self.next_due) {
            return false;
        }
        self.on = !self.on;
        let phase = if self.on { STROBE_ON_MS } else { STROBE_OFF_MS };
        self.next_due = now.wrapping_add(mods.scale(phase));
        true
    }

    pub fn paint(&self, sink: &mut dyn RenderSink, brightness: u8) {
        let color = if self.on {
            RGB8::new(brightness, brightness, brightness)
        } else {
            RGB8::default()
        };
        for s in 0..sink.strand_count() {
            fill(sink.strand_mut(s), color);
        }
    }
}

fn paint_rainbow(sink: &mut dyn RenderSink, base_hue: u8, value: u8) {
    for s in 0..sink.strand_count() {
        let len = sink.strand_len(s);
        let strand = sink.strand_mut(s);
        for (i, px) in strand.iter_mut().enumerate() {
            let hue = base_hue.wrapping_add((i * 256 / len) as u8);
            *px = hsv(hue, 255, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameBuffer;

    #[test]
    fn rainbow_advances_one_hue_per_interval() {
        let mods = Modulators::default();
        let mut rainbow = Rainbow::new();
        rainbow.reset(0);

        // First frame paints with the cursor at 0
        assert!(rainbow.advance(0, &mods));
        assert_eq!(rainbow.hue(), 0);

        // Not due yet
        assert!(!rainbow.advance(10, &mods));
        assert_eq!(rainbow.hue(), 0);

        assert!(rainbow.advance(20, &mods));
        assert_eq!(rainbow.hue(), 1);

        assert!(rainbow.advance(40, &mods));
        assert_eq!(rainbow.hue(), 2);
    }

    #[test]
    fn rainbow_interval_scales_with_tempo() {
        let mut mods = Modulators::default();
        mods.toggle_fast(); // 2x
        let mut rainbow = Rainbow::new();
        rainbow.reset(0);

        assert!(rainbow.advance(0, &mods));
        // At 2x tempo the 20 ms interval shrinks to 10 ms
        assert!(rainbow.advance(10, &mods));
        assert!(rainbow.advance(20, &mods));
        assert_eq!(rainbow.hue(), 2);
    }

    #[test]
    fn rainbow_spreads_hue_across_strand() {
        let mods = Modulators::default();
        let mut fb = FrameBuffer::new(&[4], 128);
        let rainbow = Rainbow::new();
        rainbow.paint(&mut fb, mods.brightness());

        // Pixel 0 at hue 0, pixel 2 half-way around the wheel
        assert_eq!(fb.pixel(0, 0), hsv(0, 255, 128));
        assert_eq!(fb.pixel(0, 2), hsv(128, 255, 128));
    }

    #[test]
    fn breathing_bounces_between_bounds() {
        let mods = Modulators::new(100);
        let mut breathing = Breathing::new();
        breathing.reset(0, &mods);
        assert_eq!(breathing.level(), 10);

        let mut now = 0;
        let mut seen_max = false;
        let mut seen_min_again = false;
        for _ in 0..200 {
            breathing.advance(now, &mods);
            now += BREATH_INTERVAL_MS;
            assert!(breathing.level() >= 10 && breathing.level() <= 100);
            if breathing.level() == 100 {
                seen_max = true;
            }
            if seen_max && breathing.level() == 10 {
                seen_min_again = true;
            }
        }
        assert!(seen_max && seen_min_again);
    }

    #[test]
    fn strobe_on_shorter_than_off() {
        let mods = Modulators::default();
        let mut strobe = Strobe::new();
        strobe.reset(0, &mods);
        assert!(strobe.is_on());

        // Still on just before the on phase elapses
        assert!(!strobe.advance(STROBE_ON_MS - 1, &mods));
        assert!(strobe.advance(STROBE_ON_MS, &mods));
        assert!(!strobe.is_on());

        // Off phase lasts longer
        let off_start = STROBE_ON_MS;
        assert!(!strobe.advance(off_start + STROBE_OFF_MS - 1, &mods));
        assert!(strobe.advance(off_start + STROBE_OFF_MS, &mods));
        assert!(strobe.is_on());
    }
}
