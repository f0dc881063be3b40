//! Global tempo and brightness scalars.
//!
//! Both values live for the whole process, are mutated only from the main
//! loop (by spell or gesture handlers), and are read by every timing and
//! render computation.

use crate::protocol::Direction;
use crate::time::Millis;

pub const TEMPO_MIN: f32 = 0.25;
pub const TEMPO_MAX: f32 = 4.0;
pub const BRIGHTNESS_STEP: u8 = 16;

const TEMPO_DOWN_FACTOR: f32 = 0.85;
const TEMPO_UP_FACTOR: f32 = 1.15;
const TEMPO_FAST: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct Modulators {
    tempo_factor: f32,
    brightness: u8,
    fast: bool,
}

impl Modulators {
    pub fn new(brightness: u8) -> Self {
        Self {
            tempo_factor: 1.0,
            brightness: brightness.max(1),
            fast: false,
        }
    }

    pub fn tempo_factor(&self) -> f32 {
        self.tempo_factor
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Scale a base interval by the tempo factor, clamped to at least 1 ms so
    /// a maxed-out tempo can never produce a zero interval.
    pub fn scale(&self, base: Millis) -> Millis {
        let scaled = base as f32 / self.tempo_factor;
        if scaled < 1.0 {
            1
        } else {
            scaled as Millis
        }
    }

    /// Slow down about 15%.
    pub fn tempo_down(&mut self) {
        self.tempo_factor = (self.tempo_factor * TEMPO_DOWN_FACTOR).max(TEMPO_MIN);
    }

    /// Speed up about 15%.
    pub fn tempo_up(&mut self) {
        self.tempo_factor = (self.tempo_factor * TEMPO_UP_FACTOR).min(TEMPO_MAX);
    }

    pub fn tempo_delta(&mut self, direction: Direction) {
        match direction {
            Direction::Down => self.tempo_down(),
            Direction::Up => self.tempo_up(),
        }
    }

    /// Flip between normal and fast tempo (the tap gesture). Returns the
    /// direction to broadcast so receivers trend the same way.
    pub fn toggle_fast(&mut self) -> Direction {
        if self.fast {
            self.fast = false;
            self.tempo_factor = 1.0;
            Direction::Down
        } else {
            self.fast = true;
            self.tempo_factor = TEMPO_FAST;
            Direction::Up
        }
    }

    /// Step brightness down, never reaching 0: a fully dark strip is
    /// indistinguishable from "no effect".
    pub fn brightness_down(&mut self) {
        self.brightness = if self.brightness > BRIGHTNESS_STEP {
            self.brightness - BRIGHTNESS_STEP
        } else {
            1
        };
    }

    pub fn brightness_up(&mut self) {
        self.brightness = self.brightness.saturating_add(BRIGHTNESS_STEP);
    }

    pub fn brightness_delta(&mut self, direction: Direction) {
        match direction {
            Direction::Down => self.brightness_down(),
            Direction::Up => self.brightness_up(),
        }
    }
}

impl Default for Modulators {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_stays_in_bounds() {
        let mut mods = Modulators::default();
        for _ in 0..100 {
            mods.tempo_up();
        }
        assert!(mods.tempo_factor() <= TEMPO_MAX);
        for _ in 0..200 {
            mods.tempo_down();
        }
        assert!(mods.tempo_factor() >= TEMPO_MIN);
    }

    #[test]
    fn brightness_stays_in_bounds() {
        let mut mods = Modulators::default();
        for _ in 0..100 {
            mods.brightness_up();
        }
        assert_eq!(mods.brightness(), 255);
        // Clamped at the top: one more up is a no-op
        mods.brightness_up();
        assert_eq!(mods.brightness(), 255);

        for _ in 0..100 {
            mods.brightness_down();
        }
        assert_eq!(mods.brightness(), 1);
    }

    #[test]
    fn scale_never_hits_zero() {
        let mut mods = Modulators::default();
        for _ in 0..100 {
            mods.tempo_up();
        }
        assert_eq!(mods.scale(1), 1);
        assert_eq!(mods.scale(20), 5);
    }

    #[test]
    fn toggle_alternates() {
        let mut mods = Modulators::default();
        assert_eq!(mods.toggle_fast(), Direction::Up);
        assert_eq!(mods.tempo_factor(), 2.0);
        assert_eq!(mods.toggle_fast(), Direction::Down);
        assert_eq!(mods.tempo_factor(), 1.0);
    }
}
