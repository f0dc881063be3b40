//! Node orchestration: one cooperative tick over every subsystem.
//!
//! The tick order is fixed: admission window first (it preempts everything
//! while open), then the wireless mailbox drain, then touch gestures, then
//! the effect machines, and finally one flush if anything changed. No step
//! blocks; anything slow lives behind the transport traits.

use anyhow::Result;
use log::{debug, info, warn};
use smart_leds::RGB8;

use crate::config::NodeDescriptor;
use crate::diag::{NetConsole, DIAG_PORT};
use crate::effects::EffectEngine;
use crate::ingress::IngressHandle;
use crate::modulators::Modulators;
use crate::protocol::{Direction, OneShotKind, Spell, SpellPack};
use crate::render::RenderSink;
use crate::time::{reached, Millis};
use crate::touch::{GestureEvent, GestureRecognizer, Pad, TouchProbe};
use crate::transport::SpellTransport;
use crate::update::{AdmissionWindow, UpdateService, WindowStatus};

/// Length of the green transmit/receive pulse on pixel 0.
const FLASH_MS: Millis = 120;

const FLASH_COLOR: RGB8 = RGB8 {
    r: 0,
    g: 255,
    b: 0,
};

pub struct Node {
    descriptor: NodeDescriptor,
    mods: Modulators,
    engine: EffectEngine,
    mailbox: IngressHandle,
    gestures: Option<GestureRecognizer>,
    window: Option<AdmissionWindow>,
    diag: NetConsole,
    flash_until: Option<Millis>,
    needs_repaint: bool,
    cycle_index: usize,
}

impl Node {
    pub fn new(descriptor: NodeDescriptor, mailbox: IngressHandle) -> Self {
        let engine = EffectEngine::new(
            descriptor.initial_background,
            descriptor.max_strand_len(),
        );
        Self {
            descriptor,
            mods: Modulators::default(),
            engine,
            mailbox,
            gestures: None,
            window: None,
            diag: NetConsole::new(),
            flash_until: None,
            needs_repaint: false,
            cycle_index: 0,
        }
    }

    /// Open the post-boot admission window. Called once the update transport
    /// turned out to be reachable; nodes without the capability skip it.
    pub fn open_admission_window(&mut self, now: Millis) {
        if let Some(params) = &self.descriptor.admission_window {
            self.window = Some(AdmissionWindow::new(
                now,
                params.duration_ms,
                params.hue_offset_step,
            ));
        } else {
            debug!("node {} has no admission window", self.descriptor.name);
        }
    }

    /// Run boot calibration against the touch hardware.
    pub fn calibrate_touch(&mut self, probe: &mut dyn TouchProbe) {
        if self.descriptor.touch.is_some() {
            self.gestures = Some(GestureRecognizer::calibrate(probe));
        }
    }

    pub fn window_open(&self) -> bool {
        self.window.is_some()
    }

    pub fn background(&self) -> crate::protocol::Background {
        self.engine.background()
    }

    pub fn modulators(&self) -> &Modulators {
        &self.mods
    }

    pub fn active_chasers(&self) -> usize {
        self.engine.active_chasers()
    }

    /// One pass of the cooperative main loop.
    pub fn run_tick(
        &mut self,
        now: Millis,
        sink: &mut dyn RenderSink,
        transport: &mut dyn SpellTransport,
        update: &mut dyn UpdateService,
        touch: Option<&mut dyn TouchProbe>,
    ) -> Result<()> {
        self.diag.poll_accept();

        // While the admission window is open it owns the node outright.
        if let Some(window) = &mut self.window {
            let brightness = self.mods.brightness();
            match window.tick(now, update, sink, brightness)? {
                WindowStatus::Open => return Ok(()),
                WindowStatus::Closed => {
                    self.window = None;
                    sink.clear();
                    sink.show()?;
                    if let Err(e) = transport.rebind(self.descriptor.channel) {
                        warn!(
                            "channel re-pin failed ({e}); falling back to configured channel {}",
                            self.descriptor.channel
                        );
                    }
                    self.diag.start(DIAG_PORT);
                    self.diag.line(&format!(
                        "admission window closed; operating on channel {}",
                        self.descriptor.channel
                    ));
                    self.needs_repaint = true;
                }
            }
        }

        // Deferred work from the radio callback context
        if let Some(id) = self.mailbox.take() {
            let spell = self.descriptor.spell_map.decode(id);
            self.diag.line(&format!("received spell {id}: {spell:?}"));
            self.apply_spell(spell, now);
        }
        if self.mailbox.take_flash() && self.descriptor.flash_on_receive {
            self.flash_until = Some(now.wrapping_add(FLASH_MS));
            self.needs_repaint = true;
        }

        // Touch gestures
        let mut gesture = None;
        if let (Some(recognizer), Some(probe)) = (&mut self.gestures, touch) {
            let raw = [probe.read(0), probe.read(1)];
            gesture = recognizer.update(now, raw);
        }
        if let Some(event) = gesture {
            self.handle_gesture(event, now, transport);
        }

        // Effect machines
        let mut dirty = self.engine.tick(now, &self.mods);
        dirty |= std::mem::take(&mut self.needs_repaint);

        if let Some(until) = self.flash_until {
            if reached(now, until) {
                self.flash_until = None;
                dirty = true;
            }
        }

        if dirty {
            sink.set_brightness(self.mods.brightness());
            self.engine.paint(sink, &self.mods);
            if self.flash_until.is_some() {
                for s in 0..sink.strand_count() {
                    if sink.strand_len(s) > 0 {
                        sink.strand_mut(s)[0] = FLASH_COLOR;
                    }
                }
            }
            sink.show()?;
        }

        Ok(())
    }

    /// Console digit override: behaves exactly like receiving that spell id,
    /// and broadcasts it as well.
    pub fn handle_digit(
        &mut self,
        digit: u8,
        now: Millis,
        transport: &mut dyn SpellTransport,
    ) {
        let id = digit as u32;
        let spell = self.descriptor.spell_map.decode(id);
        self.apply_spell(spell, now);
        self.cast_id(id, now, transport);
    }

    fn apply_spell(&mut self, spell: Spell, now: Millis) {
        match spell {
            Spell::Background(bg) => self.engine.request_background(bg),
            Spell::TempoDelta(direction) => {
                self.mods.tempo_delta(direction);
                info!("tempo factor now {:.2}", self.mods.tempo_factor());
            }
            Spell::BrightnessDelta(direction) => {
                self.mods.brightness_delta(direction);
                info!("brightness now {}/255", self.mods.brightness());
            }
            Spell::OneShot(kind) => self.engine.trigger(kind, now),
        }
        self.needs_repaint = true;
    }

    fn handle_gesture(
        &mut self,
        event: GestureEvent,
        now: Millis,
        transport: &mut dyn SpellTransport,
    ) {
        match event {
            GestureEvent::Tap(Pad::A) => {
                let cycle = self
                    .descriptor
                    .touch
                    .as_ref()
                    .map(|t| t.cycle.clone())
                    .unwrap_or_default();
                if !cycle.is_empty() {
                    self.cycle_index = (self.cycle_index + 1) % cycle.len();
                    let background = cycle[self.cycle_index];
                    info!("tap: next background {background:?}");
                    self.apply_spell(Spell::Background(background), now);
                    self.cast(Spell::Background(background), now, transport);
                }
            }
            GestureEvent::Tap(Pad::B) => {
                let direction = self.mods.toggle_fast();
                info!("tap: tempo toggled to {:.2}x", self.mods.tempo_factor());
                self.needs_repaint = true;
                self.cast(Spell::TempoDelta(direction), now, transport);
            }
            GestureEvent::HoldTap { held: Pad::A, .. } => {
                self.apply_spell(Spell::BrightnessDelta(Direction::Down), now);
                self.cast(Spell::BrightnessDelta(Direction::Down), now, transport);
            }
            GestureEvent::HoldTap { held: Pad::B, .. } => {
                self.apply_spell(Spell::BrightnessDelta(Direction::Up), now);
                self.cast(Spell::BrightnessDelta(Direction::Up), now, transport);
            }
            GestureEvent::BothHold => {
                // The shoot animation, on us and on everyone listening
                self.apply_spell(Spell::OneShot(OneShotKind::Chase), now);
                self.cast(Spell::OneShot(OneShotKind::Chase), now, transport);
            }
        }
    }

    /// Dispatcher: typed spell out to the air, plus the transmit-ack flash.
    fn cast(&mut self, spell: Spell, now: Millis, transport: &mut dyn SpellTransport) {
        match self.descriptor.spell_map.encode(spell) {
            Some(id) => self.cast_id(id, now, transport),
            None => debug!("spell {spell:?} has no wire id on this node"),
        }
    }

    fn cast_id(&mut self, id: u32, now: Millis, transport: &mut dyn SpellTransport) {
        match (SpellPack { spell_id: id }).pack_spell() {
            Ok(packet) => {
                if let Err(e) = transport.send(&packet) {
                    warn!("spell {id} broadcast failed: {e}");
                } else {
                    info!("cast spell {id}");
                }
            }
            Err(e) => warn!("spell {id} failed to pack: {e}"),
        }
        self.flash_until = Some(now.wrapping_add(FLASH_MS));
        self.needs_repaint = true;
    }
}
