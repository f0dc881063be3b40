//! Effect scheduler: the background and one-shot state machines behind a
//! single tick/paint surface.
//!
//! All machines are strictly non-blocking. `tick` advances whatever is due
//! at the given timestamp and reports whether the frame contents changed;
//! `paint` rebuilds the frame from current phase state. The split keeps
//! phase counters honest when overlays force extra repaints.

pub mod background;
pub mod chase;
pub mod oneshot;

pub use self::background::{Breathing, Rainbow, Strobe};
pub use self::chase::{ChasePool, CHASE_INTERVAL_MS, MAX_CHASERS};
pub use self::oneshot::{DoubleBlink, Pulse, Sawtooth};

use self::oneshot::paint_duty;
use crate::modulators::Modulators;
use crate::protocol::{Background, OneShotKind};
use crate::render::RenderSink;
use crate::time::Millis;

pub struct EffectEngine {
    requested: Background,
    applied: Option<Background>,
    strand_max: usize,

    rainbow: Rainbow,
    breathing: Breathing,
    strobe: Strobe,

    pulse: Pulse,
    sawtooth: Sawtooth,
    double_blink: DoubleBlink,
    chase: ChasePool,
}

impl EffectEngine {
    pub fn new(initial: Background, strand_max: usize) -> Self {
        Self {
            requested: initial,
            applied: None,
            strand_max,
            rainbow: Rainbow::new(),
            breathing: Breathing::new(),
            strobe: Strobe::new(),
            pulse: Pulse::default(),
            sawtooth: Sawtooth::default(),
            double_blink: DoubleBlink::default(),
            chase: ChasePool::new(),
        }
    }

    /// Ask for a background switch. Applied on the next tick; requesting the
    /// already-active effect is a no-op and does not reset phase state.
    pub fn request_background(&mut self, background: Background) {
        self.requested = background;
    }

    pub fn background(&self) -> Background {
        self.applied.unwrap_or(self.requested)
    }

    pub fn trigger(&mut self, kind: OneShotKind, now: Millis) {
        match kind {
            OneShotKind::Pulse => self.pulse.trigger(now),
            OneShotKind::Sawtooth => self.sawtooth.trigger(now),
            OneShotKind::DoubleBlink => self.double_blink.trigger(now),
            OneShotKind::Chase => {
                if !self.chase.trigger(now) {
                    log::debug!("chase pool full, trigger dropped");
                }
            }
        }
    }

    pub fn active_chasers(&self) -> usize {
        self.chase.active()
    }

    pub fn any_one_shot_active(&self) -> bool {
        self.pulse.is_active()
            || self.sawtooth.is_active()
            || self.double_blink.is_active()
            || self.chase.active() > 0
    }

    /// Advance every due machine. Returns true when the frame needs a
    /// repaint.
    pub fn tick(&mut self, now: Millis, mods: &Modulators) -> bool {
        let mut dirty = false;

        if self.applied != Some(self.requested) {
            self.switch_background(now, mods);
            dirty = true;
        }

        dirty |= match self.background() {
            Background::Off => false,
            Background::Rainbow => self.rainbow.advance(now, mods),
            Background::Breathing => self.breathing.advance(now, mods),
            Background::Strobe => self.strobe.advance(now, mods),
        };

        dirty |= self.pulse.advance(now);
        dirty |= self.sawtooth.advance(now);
        dirty |= self.double_blink.advance(now);
        dirty |= self.chase.advance(now, self.strand_max);

        dirty
    }

    /// Rebuild the frame: background first, then any live one-shot overlay,
    /// then the chasers on top.
    pub fn paint(&self, sink: &mut dyn RenderSink, mods: &Modulators) {
        sink.clear();

        let brightness = mods.brightness();
        match self.background() {
            Background::Off => {}
            Background::Rainbow => self.rainbow.paint(sink, brightness),
            Background::Breathing => self.breathing.paint(sink, brightness),
            Background::Strobe => self.strobe.paint(sink, brightness),
        }

        if self.pulse.is_active() {
            paint_duty(sink, self.pulse.duty());
        }
        if self.sawtooth.is_active() {
            paint_duty(sink, self.sawtooth.duty());
        }
        if self.double_blink.is_active() {
            paint_duty(sink, self.double_blink.duty());
        }
        self.chase.paint(sink, brightness);
    }

    /// A real switch resets the incoming effect's phase state and clears
    /// every in-flight one-shot from the previous effect.
    fn switch_background(&mut self, now: Millis, mods: &Modulators) {
        self.applied = Some(self.requested);

        self.pulse.cancel();
        self.sawtooth.cancel();
        self.double_blink.cancel();
        self.chase.clear();

        match self.requested {
            Background::Off => {}
            Background::Rainbow => self.rainbow.reset(now),
            Background::Breathing => self.breathing.reset(now, mods),
            Background::Strobe => self.strobe.reset(now, mods),
        }
    }
}
