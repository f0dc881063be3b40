//! Firmware-update admission window.
//!
//! For a short stretch after boot the node accepts a firmware transfer and
//! nothing else: while the window is open it owns rendering and the main
//! loop returns right after this controller runs. A transfer that is in
//! progress holds the window open past its nominal deadline; otherwise the
//! deadline closes it and normal operation resumes.

use crate::render::{fill, hsv, RenderSink};
use crate::time::{reached, Millis};
use anyhow::Result;
use log::{error, info};
use smart_leds::RGB8;

/// Default window length after boot.
pub const ADMISSION_WINDOW_MS: Millis = 25_000;

/// Refresh interval of the comet indicator.
pub const COMET_INTERVAL_MS: Millis = 30;

const SUCCESS_FLASH_MS: Millis = 200;
const ERROR_FLASH_MS: Millis = 1_000;

/// Blue-ish hue for the transfer progress bar and the comet.
const INDICATOR_HUE: u8 = 160;

/// Transfer lifecycle notifications from the update transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    Started,
    Progress { current: u32, total: u32 },
    Completed,
    Failed,
}

/// The update transport seam. `poll` both drives the transport and drains
/// one lifecycle event at a time.
pub trait UpdateService {
    fn poll(&mut self) -> Option<UpdateEvent>;
}

/// Update service for nodes without network connectivity.
pub struct NullUpdateService;

impl UpdateService for NullUpdateService {
    fn poll(&mut self) -> Option<UpdateEvent> {
        None
    }
}

/// Whether the window still owns the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visual {
    Comet,
    Success { until: Millis },
    Failure { until: Millis },
}

pub struct AdmissionWindow {
    deadline: Millis,
    transfer_active: bool,
    visual: Visual,
    next_comet: Millis,
    comet_pos: usize,
    comet_hue: u8,
    /// Per-strand hue spread of the comet heads.
    hue_offset_step: u8,
}

impl AdmissionWindow {
    pub fn new(now: Millis, duration: Millis, hue_offset_step: u8) -> Self {
        info!("admission window open for {} ms", duration);
        Self {
            deadline: now.wrapping_add(duration),
            transfer_active: false,
            visual: Visual::Comet,
            next_comet: now,
            comet_pos: 0,
            comet_hue: INDICATOR_HUE,
            hue_offset_step,
        }
    }

    pub fn transfer_active(&self) -> bool {
        self.transfer_active
    }

    /// One cooperative tick: drive the transport, render the indicator, and
    /// decide whether the window stays open.
    pub fn tick(
        &mut self,
        now: Millis,
        update: &mut dyn UpdateService,
        sink: &mut dyn RenderSink,
        brightness: u8,
    ) -> Result<WindowStatus> {
        while let Some(event) = update.poll() {
            self.handle_event(event, now, sink, brightness)?;
        }

        match self.visual {
            Visual::Success { until } | Visual::Failure { until } => {
                if reached(now, until) {
                    sink.clear();
                    sink.show()?;
                    self.visual = Visual::Comet;
                }
            }
            Visual::Comet => {
                if !self.transfer_active && reached(now, self.next_comet) {
                    self.next_comet = now.wrapping_add(COMET_INTERVAL_MS);
                    self.render_comet(sink, brightness);
                    sink.show()?;
                }
            }
        }

        if reached(now, self.deadline) && !self.transfer_active {
            Ok(WindowStatus::Closed)
        } else {
            Ok(WindowStatus::Open)
        }
    }

    fn handle_event(
        &mut self,
        event: UpdateEvent,
        now: Millis,
        sink: &mut dyn RenderSink,
        brightness: u8,
    ) -> Result<()> {
        match event {
            UpdateEvent::Started => {
                info!("firmware transfer started");
                self.transfer_active = true;
                sink.clear();
                sink.show()?;
            }
            UpdateEvent::Progress { current, total } => {
                if total > 0 {
                    self.render_progress(sink, current, total, brightness);
                    sink.show()?;
                }
            }
            UpdateEvent::Completed => {
                info!("firmware transfer complete");
                self.transfer_active = false;
                self.visual = Visual::Success {
                    until: now.wrapping_add(SUCCESS_FLASH_MS),
                };
                fill_all(sink, RGB8::new(0, 255, 0));
                sink.show()?;
            }
            UpdateEvent::Failed => {
                error!("firmware transfer failed, returning to idle");
                self.transfer_active = false;
                self.visual = Visual::Failure {
                    until: now.wrapping_add(ERROR_FLASH_MS),
                };
                fill_all(sink, RGB8::new(255, 0, 0));
                sink.show()?;
            }
        }
        Ok(())
    }

    /// Bar fill: transfer progress mapped linearly onto the total pixel
    /// count, filling strand after strand.
    fn render_progress(
        &self,
        sink: &mut dyn RenderSink,
        current: u32,
        total: u32,
        brightness: u8,
    ) {
        let total_pixels: usize = (0..sink.strand_count()).map(|s| sink.strand_len(s)).sum();
        let lit = ((current as u64 * total_pixels as u64) / total as u64) as usize;
        let color = hsv(INDICATOR_HUE, 255, brightness);

        sink.clear();
        let mut remaining = lit;
        for s in 0..sink.strand_count() {
            if remaining == 0 {
                break;
            }
            let count = remaining.min(sink.strand_len(s));
            fill(&mut sink.strand_mut(s)[..count], color);
            remaining -= count;
        }
    }

    /// Moving comet: bright head, dim trailing pixel, hue creeping upward,
    /// each strand offset around the wheel.
    fn render_comet(&mut self, sink: &mut dyn RenderSink, brightness: u8) {
        sink.clear();
        for s in 0..sink.strand_count() {
            let len = sink.strand_len(s);
            if len == 0 {
                continue;
            }
            let hue = self
                .comet_hue
                .wrapping_add(self.hue_offset_step.wrapping_mul(s as u8));
            let head = self.comet_pos % len;
            let strand = sink.strand_mut(s);
            strand[head] = hsv(hue, 220, brightness);
            if len > 1 {
                let tail = (head + len - 1) % len;
                strand[tail] = hsv(hue, 220, brightness / 4);
            }
        }
        self.comet_pos = self.comet_pos.wrapping_add(1);
        self.comet_hue = self.comet_hue.wrapping_add(1);
    }
}

fn fill_all(sink: &mut dyn RenderSink, color: RGB8) {
    for s in 0..sink.strand_count() {
        fill(sink.strand_mut(s), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameBuffer;
    use std::collections::VecDeque;

    struct ScriptedUpdate {
        events: VecDeque<UpdateEvent>,
    }

    impl ScriptedUpdate {
        fn new(events: &[UpdateEvent]) -> Self {
            Self {
                events: events.iter().copied().collect(),
            }
        }
    }

    impl UpdateService for ScriptedUpdate {
        fn poll(&mut self) -> Option<UpdateEvent> {
            self.events.pop_front()
        }
    }

    #[test]
    fn window_closes_at_deadline_without_transfer() {
        let mut window = AdmissionWindow::new(0, 1_000, 64);
        let mut update = NullUpdateService;
        let mut fb = FrameBuffer::new(&[4], 128);

        assert_eq!(
            window.tick(999, &mut update, &mut fb, 128).unwrap(),
            WindowStatus::Open
        );
        assert_eq!(
            window.tick(1_000, &mut update, &mut fb, 128).unwrap(),
            WindowStatus::Closed
        );
    }

    #[test]
    fn in_progress_transfer_holds_window_open() {
        let mut window = AdmissionWindow::new(0, 1_000, 64);
        let mut update = ScriptedUpdate::new(&[UpdateEvent::Started]);
        let mut fb = FrameBuffer::new(&[4], 128);

        window.tick(10, &mut update, &mut fb, 128).unwrap();
        assert!(window.transfer_active());

        // Well past the deadline, still open
        let mut idle = NullUpdateService;
        assert_eq!(
            window.tick(5_000, &mut idle, &mut fb, 128).unwrap(),
            WindowStatus::Open
        );

        // Transfer completes; the window may now close
        let mut done = ScriptedUpdate::new(&[UpdateEvent::Completed]);
        window.tick(5_100, &mut done, &mut fb, 128).unwrap();
        assert_eq!(
            window.tick(6_500, &mut idle, &mut fb, 128).unwrap(),
            WindowStatus::Closed
        );
    }

    #[test]
    fn progress_maps_to_pixel_bar() {
        let mut window = AdmissionWindow::new(0, 10_000, 64);
        let mut update = ScriptedUpdate::new(&[
            UpdateEvent::Started,
            UpdateEvent::Progress {
                current: 50,
                total: 100,
            },
        ]);
        let mut fb = FrameBuffer::new(&[10, 10], 128);

        window.tick(10, &mut update, &mut fb, 128).unwrap();

        // Half of 20 pixels lit: strand 0 full, strand 1 dark
        let lit = hsv(160, 255, 128);
        for i in 0..10 {
            assert_eq!(fb.pixel(0, i), lit);
            assert_eq!(fb.pixel(1, i), RGB8::default());
        }
    }

    #[test]
    fn failure_flashes_red_then_returns_to_comet() {
        let mut window = AdmissionWindow::new(0, 60_000, 64);
        let mut update = ScriptedUpdate::new(&[UpdateEvent::Started, UpdateEvent::Failed]);
        let mut fb = FrameBuffer::new(&[4], 128);

        window.tick(10, &mut update, &mut fb, 128).unwrap();
        assert_eq!(fb.pixel(0, 0), RGB8::new(255, 0, 0));
        assert!(!window.transfer_active());

        // After the error hold the display clears and the comet resumes
        let mut idle = NullUpdateService;
        window.tick(1_100, &mut idle, &mut fb, 128).unwrap();
        window.tick(1_200, &mut idle, &mut fb, 128).unwrap();
        assert!(!fb.is_dark());
        assert_ne!(fb.pixel(0, 0), RGB8::new(255, 0, 0));
    }

    #[test]
    fn comet_renders_moving_head() {
        let mut window = AdmissionWindow::new(0, 60_000, 64);
        let mut idle = NullUpdateService;
        let mut fb = FrameBuffer::new(&[8], 128);

        window.tick(0, &mut idle, &mut fb, 128).unwrap();
        assert_ne!(fb.pixel(0, 0), RGB8::default());

        window
            .tick(COMET_INTERVAL_MS, &mut idle, &mut fb, 128)
            .unwrap();
        assert_ne!(fb.pixel(0, 1), RGB8::default());
        assert_eq!(fb.pixel(0, 3), RGB8::default());
    }
}
