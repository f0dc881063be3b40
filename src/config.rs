//! Per-node descriptors.
//!
//! One engine serves every node in the costume set; the differences between
//! the historical firmware flavors (strand counts, capability sets, spell
//! mappings, touch input, admission window) live entirely in the descriptor.
//! A descriptor comes from a RON file or from one of the role presets.

use anyhow::Error;
use serde::{Deserialize, Serialize};

use crate::protocol::{Background, SpellMap};
use crate::update::ADMISSION_WINDOW_MS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDescriptor {
    pub name: String,
    /// Pixels per strand.
    pub strands: Vec<usize>,
    pub spell_map: SpellMap,
    pub initial_background: Background,
    /// Flash pixel 0 green on any packet reception.
    pub flash_on_receive: bool,
    pub touch: Option<TouchParams>,
    pub admission_window: Option<WindowParams>,
    /// Radio operating channel, re-pinned when the admission window closes.
    pub channel: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TouchParams {
    /// Backgrounds the effect-cycle tap walks through, in order.
    pub cycle: Vec<Background>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowParams {
    pub duration_ms: u32,
    /// Hue spread between strands in the window's comet indicator.
    pub hue_offset_step: u8,
}

impl NodeDescriptor {
    /// The caster wand: one strand, touch pads, broadcasts what it renders.
    pub fn staff() -> Self {
        Self {
            name: "staff".into(),
            strands: vec![225],
            spell_map: SpellMap::wearable(false),
            initial_background: Background::Rainbow,
            flash_on_receive: false,
            touch: Some(TouchParams {
                cycle: vec![Background::Rainbow, Background::Breathing, Background::Off],
            }),
            admission_window: Some(WindowParams {
                duration_ms: ADMISSION_WINDOW_MS,
                hue_offset_step: 64,
            }),
            channel: 1,
        }
    }

    /// Four body strips plus the stole strand.
    pub fn cape() -> Self {
        Self {
            name: "cape".into(),
            strands: vec![250, 250, 250, 250, 250],
            spell_map: SpellMap::wearable(false),
            initial_background: Background::Rainbow,
            flash_on_receive: true,
            touch: None,
            admission_window: Some(WindowParams {
                duration_ms: ADMISSION_WINDOW_MS,
                hue_offset_step: 42,
            }),
            channel: 1,
        }
    }

    /// Two long strands around the brim.
    pub fn hat() -> Self {
        Self {
            name: "hat".into(),
            strands: vec![750, 750],
            spell_map: SpellMap::wearable(false),
            initial_background: Background::Rainbow,
            flash_on_receive: true,
            touch: None,
            admission_window: Some(WindowParams {
                duration_ms: ADMISSION_WINDOW_MS,
                hue_offset_step: 64,
            }),
            channel: 1,
        }
    }

    /// Single-lamp receiver with the compact spell mapping and the full
    /// one-shot repertoire.
    pub fn beacon() -> Self {
        Self {
            name: "beacon".into(),
            strands: vec![1],
            spell_map: SpellMap::beacon(),
            initial_background: Background::Off,
            flash_on_receive: false,
            touch: None,
            admission_window: None,
            channel: 1,
        }
    }

    pub fn preset(role: &str) -> Option<Self> {
        match role {
            "staff" => Some(Self::staff()),
            "cape" => Some(Self::cape()),
            "hat" => Some(Self::hat()),
            "beacon" => Some(Self::beacon()),
            _ => None,
        }
    }

    pub fn load(path: &str) -> Result<Self, Error> {
        let descriptor = std::fs::read_to_string(path)?;
        let descriptor: NodeDescriptor = ron::from_str(&descriptor)?;
        Ok(descriptor)
    }

    pub fn total_pixels(&self) -> usize {
        self.strands.iter().sum()
    }

    pub fn max_strand_len(&self) -> usize {
        self.strands.iter().copied().max().unwrap_or(0)
    }
}
