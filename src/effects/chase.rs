//! Chase one-shot: independently-animating sparks racing down the strands.
//!
//! Every trigger spawns one chaser into a fixed pool. When the pool is full
//! the trigger is dropped on the floor, no error, matching the wire
//! protocol's best-effort spirit. Chase mode itself never times out: with no
//! chasers alive it simply paints nothing until the next trigger.

use crate::render::{hsv, RenderSink};
use crate::time::{reached, Millis};
use heapless::Vec;

/// Upper bound on concurrently-animating chasers.
pub const MAX_CHASERS: usize = 10;

pub const CHASE_INTERVAL_MS: Millis = 8;

/// Hue distance between consecutively spawned chasers.
const SPAWN_HUE_STEP: u8 = 32;

#[derive(Debug, Clone, Copy)]
struct Chaser {
    position: usize,
    hue: u8,
}

#[derive(Debug)]
pub struct ChasePool {
    chasers: Vec<Chaser, MAX_CHASERS>,
    spawn_hue: u8,
    next_due: Millis,
}

impl ChasePool {
    pub fn new() -> Self {
        Self {
            chasers: Vec::new(),
            spawn_hue: 0,
            next_due: 0,
        }
    }

    /// Spawn a chaser at the strand head. Returns false when every slot is
    /// occupied and the trigger was dropped.
    pub fn trigger(&mut self, now: Millis) -> bool {
        let hue = self.spawn_hue;
        let accepted = self
            .chasers
            .push(Chaser { position: 0, hue })
            .is_ok();
        if accepted {
            self.spawn_hue = self.spawn_hue.wrapping_add(SPAWN_HUE_STEP);
            if self.chasers.len() == 1 {
                // First spark after an idle stretch renders at the strand
                // head once before it starts moving
                self.next_due = now.wrapping_add(CHASE_INTERVAL_MS);
            }
        }
        accepted
    }

    pub fn active(&self) -> usize {
        self.chasers.len()
    }

    pub fn clear(&mut self) {
        self.chasers.clear();
    }

    /// Step every live chaser one pixel and retire those that ran off the
    /// end of the longest strand.
    pub fn advance(&mut self, now: Millis, strand_max: usize) -> bool {
        if self.chasers.is_empty() || !reached(now, self.next_due) {
            return false;
        }
        self.next_due = now.wrapping_add(CHASE_INTERVAL_MS);

        for chaser in self.chasers.iter_mut() {
            chaser.position += 1;
        }
        let mut i = 0;
        while i < self.chasers.len() {
            if self.chasers[i].position >= strand_max {
                self.chasers.swap_remove(i);
            } else {
                i += 1;
            }
        }
        true
    }

    pub fn paint(&self, sink: &mut dyn RenderSink, brightness: u8) {
        for chaser in self.chasers.iter() {
            let color = hsv(chaser.hue, 255, brightness);
            for s in 0..sink.strand_count() {
                if chaser.position < sink.strand_len(s) {
                    sink.strand_mut(s)[chaser.position] = color;
                }
            }
        }
    }
}

impl Default for ChasePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameBuffer;
    use smart_leds::RGB8;

    #[test]
    fn capacity_is_enforced() {
        let mut pool = ChasePool::new();
        for _ in 0..MAX_CHASERS {
            assert!(pool.trigger(0));
        }
        assert_eq!(pool.active(), MAX_CHASERS);

        // One past capacity is silently dropped
        assert!(!pool.trigger(0));
        assert_eq!(pool.active(), MAX_CHASERS);
    }

    #[test]
    fn min_of_triggers_and_capacity() {
        let mut pool = ChasePool::new();
        for _ in 0..3 {
            pool.trigger(0);
        }
        assert_eq!(pool.active(), 3);
    }

    #[test]
    fn chaser_retires_at_strand_end() {
        let mut pool = ChasePool::new();
        pool.trigger(0);

        // Not due until one interval after the trigger
        assert!(!pool.advance(0, 5));

        // A 5-pixel strand takes 5 steps to walk off
        for step in 1..=5 {
            assert_eq!(pool.active(), 1);
            assert!(pool.advance(step * CHASE_INTERVAL_MS, 5));
        }
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn slot_frees_after_retirement() {
        let mut pool = ChasePool::new();
        for _ in 0..MAX_CHASERS {
            pool.trigger(0);
        }
        let mut now = 0;
        for _ in 0..3 {
            pool.advance(now, 2);
            now += CHASE_INTERVAL_MS;
        }
        assert_eq!(pool.active(), 0);
        assert!(pool.trigger(now));
    }

    #[test]
    fn paints_only_within_strand_bounds() {
        let mut pool = ChasePool::new();
        pool.trigger(0);
        pool.advance(CHASE_INTERVAL_MS, 10);
        pool.advance(2 * CHASE_INTERVAL_MS, 10);
        pool.advance(3 * CHASE_INTERVAL_MS, 10);

        // Position 3 now; short strand 0 (len 2) stays untouched
        let mut fb = FrameBuffer::new(&[2, 10], 128);
        pool.paint(&mut fb, 128);
        assert_eq!(fb.pixel(0, 0), RGB8::default());
        assert_eq!(fb.pixel(0, 1), RGB8::default());
        assert_ne!(fb.pixel(1, 3), RGB8::default());
    }
}
