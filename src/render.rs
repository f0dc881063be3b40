//! Rendering sink abstraction and the host-side frame buffer.
//!
//! The engine never talks to LED hardware directly; it writes per-strand
//! color buffers through [`RenderSink`] and asks the sink to flush. Hardware
//! ports implement the trait on top of their strip driver, the way the
//! addressable-LED controller wraps its RMT driver on the ESP32 builds.

use anyhow::Result;
use smart_leds::hsv::{hsv2rgb, Hsv};
use smart_leds::RGB8;

/// Per-strand color buffers with a global brightness scale and a flush call.
pub trait RenderSink {
    fn strand_count(&self) -> usize;

    fn strand_len(&self, strand: usize) -> usize;

    fn strand_mut(&mut self, strand: usize) -> &mut [RGB8];

    /// Global output scale applied by the sink at flush time.
    fn set_brightness(&mut self, brightness: u8);

    /// Black out every strand buffer (does not flush).
    fn clear(&mut self);

    /// Push the current buffers out to the strips.
    fn show(&mut self) -> Result<()>;
}

/// Convert an HSV triple to RGB, FastLED-style rainbow hue wheel.
pub fn hsv(hue: u8, sat: u8, val: u8) -> RGB8 {
    hsv2rgb(Hsv { hue, sat, val })
}

/// Fill a whole strand with one color.
pub fn fill(strand: &mut [RGB8], color: RGB8) {
    for px in strand.iter_mut() {
        *px = color;
    }
}

/// In-memory render sink used by the host binaries and every engine test.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    strands: Vec<Vec<RGB8>>,
    brightness: u8,
    /// Number of completed flushes, handy for asserting render cadence.
    pub shows: u64,
}

impl FrameBuffer {
    pub fn new(strand_lens: &[usize], brightness: u8) -> Self {
        Self {
            strands: strand_lens
                .iter()
                .map(|&len| vec![RGB8::default(); len])
                .collect(),
            brightness,
            shows: 0,
        }
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn pixel(&self, strand: usize, index: usize) -> RGB8 {
        self.strands[strand][index]
    }

    /// True when every pixel of every strand is black.
    pub fn is_dark(&self) -> bool {
        self.strands
            .iter()
            .all(|s| s.iter().all(|px| *px == RGB8::default()))
    }
}

impl RenderSink for FrameBuffer {
    fn strand_count(&self) -> usize {
        self.strands.len()
    }

    fn strand_len(&self, strand: usize) -> usize {
        self.strands[strand].len()
    }

    fn strand_mut(&mut self, strand: usize) -> &mut [RGB8] {
        &mut self.strands[strand]
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    fn clear(&mut self) {
        for strand in &mut self.strands {
            for px in strand.iter_mut() {
                *px = RGB8::default();
            }
        }
    }

    fn show(&mut self) -> Result<()> {
        self.shows += 1;
        Ok(())
    }
}
